//! Trend filter for the risk-on / risk-off regime
//!
//! Compares the reference asset's latest close with its EMA:
//! - close > EMA → RiskOn
//! - close <= EMA → RiskOff (a tie is treated as unfavourable)

use crate::config::StrategyConfig;
use crate::error::{Result, SignalError};
use crate::indicators::calculate_ewm;
use crate::models::{PriceSeries, RegimeFlag, TrendReading};

#[derive(Debug, Clone)]
pub struct TrendFilter {
    ema_len: usize,
}

impl Default for TrendFilter {
    fn default() -> Self {
        Self::new(200)
    }
}

impl TrendFilter {
    pub fn new(ema_len: usize) -> Self {
        Self { ema_len }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.ema_len)
    }

    pub fn ema_len(&self) -> usize {
        self.ema_len
    }

    /// Classify the regime from the full reference history
    ///
    /// A series shorter than the EMA span is still classified, with a warning.
    pub fn detect_regime(&self, reference: &PriceSeries) -> Result<TrendReading> {
        let last_price = reference
            .last()
            .map(|p| p.price)
            .ok_or_else(|| SignalError::insufficient(reference.symbol(), 0, 1))?;

        if reference.len() < self.ema_len {
            tracing::warn!(
                "{} has {} sessions, fewer than EMA span {}; trend filter is under-smoothed",
                reference.symbol(),
                reference.len(),
                self.ema_len
            );
        }

        let prices = reference.prices();
        let ema = calculate_ewm(&prices, self.ema_len)
            .ok_or_else(|| SignalError::insufficient(reference.symbol(), prices.len(), 1))?;

        let regime = if last_price > ema {
            RegimeFlag::RiskOn
        } else {
            RegimeFlag::RiskOff
        };

        tracing::debug!(
            "Trend filter on {}: price {:.4} vs EMA{} {:.4} → {}",
            reference.symbol(),
            last_price,
            self.ema_len,
            ema,
            regime
        );

        Ok(TrendReading {
            regime,
            last_price,
            ema,
        })
    }
}
