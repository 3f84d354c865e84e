// Core modules
pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod models;
pub mod regime;
pub mod strategy;
pub mod synthetic;

// Re-export commonly used types
pub use crate::config::{AppConfig, DataConfig, StrategyConfig};
pub use engine::SignalEngine;
pub use models::*;
pub use strategy::AllocationStrategy;

// Error handling
pub use error::{Result, SignalError};
