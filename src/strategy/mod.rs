// Allocation strategy module
pub mod momentum;

use crate::models::{Allocation, MomentumScore, PriceTable, RegimeFlag};
use crate::Result;

/// Allocation plus the scores it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationDecision {
    /// Every candidate, best score first
    pub ranking: Vec<MomentumScore>,
    pub allocation: Allocation,
}

/// Base trait for allocation strategies
pub trait AllocationStrategy: Send + Sync {
    /// Derive a target allocation from a price table and the current regime
    fn allocate(&self, table: &PriceTable, regime: RegimeFlag) -> Result<AllocationDecision>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum sessions each candidate needs
    fn min_sessions_required(&self) -> usize;
}
