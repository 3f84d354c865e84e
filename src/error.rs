use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalError>;

/// Failures that abort a signal run. None of them are retried.
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Insufficient history for {asset}: {available} sessions, need {required}")]
    InsufficientHistory {
        asset: String,
        available: usize,
        required: usize,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl SignalError {
    pub fn insufficient(asset: impl Into<String>, available: usize, required: usize) -> Self {
        Self::InsufficientHistory {
            asset: asset.into(),
            available,
            required,
        }
    }

    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, Self::InsufficientHistory { .. })
    }

    /// The price data cannot support an allocation (too short or malformed)
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::InsufficientHistory { .. } | Self::MalformedInput(_))
    }
}
