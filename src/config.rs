use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, SignalError};
use crate::models::Asset;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Parameters of the regime filter and momentum ranking
///
/// Immutable for the duration of a run and shared by both components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyConfig {
    /// EMA span for the trend filter
    pub ema_len: usize,
    /// Momentum window, in sessions
    pub lookback: usize,
    /// Recent sessions excluded from the momentum window
    pub skip: usize,
    /// Weight of the top-ranked asset
    pub w1: f64,
    /// Weight of the second-ranked asset
    pub w2: f64,
    /// Symbol the trend filter reads
    pub reference_asset: String,
    /// Allocation universe; order is the tie-break for equal scores
    pub candidate_assets: Vec<Asset>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            ema_len: 200,
            lookback: 252,
            skip: 21,
            w1: 0.8,
            w2: 0.2,
            reference_asset: "SPY".to_string(),
            candidate_assets: vec![
                Asset::new("SP500", "SPY"),
                Asset::new("NASDAQ", "QQQ"),
                Asset::new("EEM", "EEM"),
            ],
        }
    }
}

impl StrategyConfig {
    /// Sessions every candidate needs for a momentum score
    pub fn min_sessions(&self) -> usize {
        self.lookback + self.skip + 1
    }

    /// Reference symbol followed by candidate symbols, without duplicates
    pub fn symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        std::iter::once(&self.reference_asset)
            .chain(self.candidate_assets.iter().map(|a| &a.symbol))
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.ema_len == 0 {
            return Err(SignalError::InvalidConfig("ema_len must be at least 1".into()));
        }
        if self.lookback == 0 {
            return Err(SignalError::InvalidConfig("lookback must be at least 1".into()));
        }
        if !(self.w2 > 0.0 && self.w1 >= self.w2) {
            return Err(SignalError::InvalidConfig(format!(
                "weights must satisfy w1 >= w2 > 0 (w1={}, w2={})",
                self.w1, self.w2
            )));
        }
        if (self.w1 + self.w2 - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(SignalError::InvalidConfig(format!(
                "weights must sum to 1.0 (w1={}, w2={})",
                self.w1, self.w2
            )));
        }
        if self.reference_asset.trim().is_empty() {
            return Err(SignalError::InvalidConfig("reference_asset is empty".into()));
        }
        if self.candidate_assets.is_empty() {
            return Err(SignalError::InvalidConfig("candidate_assets is empty".into()));
        }

        let mut names = HashSet::new();
        let mut symbols = HashSet::new();
        for asset in &self.candidate_assets {
            if !names.insert(asset.name.as_str()) {
                return Err(SignalError::InvalidConfig(format!(
                    "duplicate candidate name {}",
                    asset.name
                )));
            }
            if !symbols.insert(asset.symbol.as_str()) {
                return Err(SignalError::InvalidConfig(format!(
                    "duplicate candidate symbol {}",
                    asset.symbol
                )));
            }
        }

        Ok(())
    }
}

/// Settings for the price retrieval layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// History window requested from the provider, e.g. "2y"
    pub history_range: String,
    pub cache_ttl_secs: u64,
    pub base_url: String,
    pub requests_per_minute: u32,
    pub max_retries: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            history_range: "2y".to_string(),
            cache_ttl_secs: 3600,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            requests_per_minute: 60,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    pub data: DataConfig,
}

impl AppConfig {
    /// Layer defaults, an optional config file and `RISKON__*` environment variables
    ///
    /// # Example
    /// `RISKON__STRATEGY__LOOKBACK=126` overrides the momentum window.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("RISKON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = settings.try_deserialize()?;
        app.strategy.validate()?;

        tracing::debug!(
            "Loaded config: ema_len={} lookback={} skip={} weights={}/{} reference={}",
            app.strategy.ema_len,
            app.strategy.lookback,
            app.strategy.skip,
            app.strategy.w1,
            app.strategy.w2,
            app.strategy.reference_asset
        );

        Ok(app)
    }
}
