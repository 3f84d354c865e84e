use std::cmp::Ordering;

use super::{AllocationDecision, AllocationStrategy};
use crate::config::StrategyConfig;
use crate::error::SignalError;
use crate::indicators::calculate_skip_return;
use crate::models::{Allocation, Asset, Holding, MomentumScore, PriceTable, RegimeFlag};
use crate::Result;

/// Cross-sectional momentum allocator
///
/// Ranks the candidate universe by trailing return (skipping the most recent
/// sessions) and holds at most two assets:
/// - RiskOff, or no positive score → Cash
/// - one positive score → 100% in that asset
/// - two or more → `w1` in the leader, `w2` in the runner-up
#[derive(Debug, Clone)]
pub struct MomentumAllocator {
    lookback: usize,
    skip: usize,
    w1: f64,
    w2: f64,
    candidates: Vec<Asset>,
}

impl MomentumAllocator {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            lookback: config.lookback,
            skip: config.skip,
            w1: config.w1,
            w2: config.w2,
            candidates: config.candidate_assets.clone(),
        }
    }

    pub fn candidates(&self) -> &[Asset] {
        &self.candidates
    }

    /// Score every candidate, in universe order
    ///
    /// Any candidate with a malformed or too-short column aborts the whole
    /// computation; there is no partial result.
    pub fn score(&self, table: &PriceTable) -> Result<Vec<MomentumScore>> {
        let required = self.min_sessions_required();

        let columns = self
            .candidates
            .iter()
            .map(|asset| {
                let series = table.series(&asset.symbol)?;
                if series.len() < required {
                    return Err(SignalError::insufficient(&asset.name, series.len(), required));
                }
                Ok((asset, series.prices()))
            })
            .collect::<Result<Vec<_>>>()?;

        columns
            .into_iter()
            .map(|(asset, prices)| {
                let score = calculate_skip_return(&prices, self.lookback, self.skip)
                    .ok_or_else(|| SignalError::insufficient(&asset.name, prices.len(), required))?;

                tracing::debug!(
                    "Momentum {} ({}): {:+.4}",
                    asset.name,
                    asset.symbol,
                    score
                );

                Ok(MomentumScore {
                    asset: asset.name.clone(),
                    symbol: asset.symbol.clone(),
                    score,
                })
            })
            .collect()
    }

    /// Sort descending by score
    ///
    /// The sort is stable, so exactly equal scores keep universe order.
    pub fn rank(mut scores: Vec<MomentumScore>) -> Vec<MomentumScore> {
        scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scores
    }

    /// Apply the regime × ranking decision table to an already ranked list
    pub fn decide(&self, ranking: &[MomentumScore], regime: RegimeFlag) -> Allocation {
        if !regime.is_risk_on() {
            return Allocation::Cash;
        }

        let positive: Vec<&MomentumScore> = ranking.iter().filter(|s| s.score > 0.0).collect();

        let holding = |s: &MomentumScore, weight: f64| Holding {
            asset: s.asset.clone(),
            symbol: s.symbol.clone(),
            weight,
        };

        match positive.as_slice() {
            [] => Allocation::Cash,
            [only] => Allocation::Assets(vec![holding(*only, 1.0)]),
            [first, second, ..] => Allocation::Assets(vec![
                holding(*first, self.w1),
                holding(*second, self.w2),
            ]),
        }
    }
}

impl Default for MomentumAllocator {
    fn default() -> Self {
        Self::new(&StrategyConfig::default())
    }
}

impl AllocationStrategy for MomentumAllocator {
    fn allocate(&self, table: &PriceTable, regime: RegimeFlag) -> Result<AllocationDecision> {
        let ranking = Self::rank(self.score(table)?);
        let allocation = self.decide(&ranking, regime);

        Ok(AllocationDecision {
            ranking,
            allocation,
        })
    }

    fn name(&self) -> &str {
        "MomentumAllocator"
    }

    fn min_sessions_required(&self) -> usize {
        self.lookback + self.skip + 1
    }
}
