use crate::config::StrategyConfig;
use crate::error::{Result, SignalError};
use crate::models::{PriceTable, Recommendation};
use crate::regime::TrendFilter;
use crate::strategy::momentum::MomentumAllocator;
use crate::strategy::AllocationStrategy;

/// Runs the trend filter and the momentum allocator over one price table
///
/// Stateless between runs: the same table and config always give the same
/// recommendation.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: StrategyConfig,
    trend_filter: TrendFilter,
    allocator: MomentumAllocator,
}

impl SignalEngine {
    pub fn new(config: StrategyConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            trend_filter: TrendFilter::from_config(&config),
            allocator: MomentumAllocator::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Evaluate one period
    ///
    /// Every requested column is checked before anything is computed, so a
    /// malformed or short table never yields a partial recommendation.
    pub fn evaluate(&self, table: &PriceTable) -> Result<Recommendation> {
        for symbol in self.config.symbols() {
            table.series(&symbol)?;
        }

        let required = self.allocator.min_sessions_required();
        if table.len() < required {
            return Err(SignalError::insufficient("price table", table.len(), required));
        }

        let as_of = table
            .last_session()
            .ok_or_else(|| SignalError::insufficient("price table", 0, required))?;

        let reference = table.series(&self.config.reference_asset)?;
        let trend = self.trend_filter.detect_regime(&reference)?;
        let decision = self.allocator.allocate(table, trend.regime)?;

        tracing::info!(
            "Signal as of {}: {} ({} sessions), allocation: {}",
            as_of,
            trend.regime,
            table.len(),
            if decision.allocation.is_cash() {
                "CASH".to_string()
            } else {
                decision
                    .allocation
                    .holdings()
                    .iter()
                    .map(|h| format!("{} {:.0}%", h.asset, h.weight * 100.0))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        );

        Ok(Recommendation {
            as_of,
            trend,
            ranking: decision.ranking,
            allocation: decision.allocation,
        })
    }
}
