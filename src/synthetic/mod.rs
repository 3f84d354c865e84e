use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::models::{PricePoint, PriceSeries, PriceTable};

/// Market scenario types for synthetic price histories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady uptrend with noise (~+0.1% per session)
    Uptrend,
    /// Steady downtrend with noise (~-0.1% per session)
    Downtrend,
    /// Mean-reverting around the starting price
    Sideways,
    /// Large swings (±3% per session)
    Volatile,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 4] = [
        MarketScenario::Uptrend,
        MarketScenario::Volatile,
        MarketScenario::Sideways,
        MarketScenario::Downtrend,
    ];
}

/// Generates daily closes on a weekday session calendar
///
/// The same seed always yields the same table.
pub struct SyntheticMarket {
    rng: StdRng,
    base_price: f64,
    start: NaiveDate,
}

impl SyntheticMarket {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 100.0,
            start: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap_or_default(),
        }
    }

    /// First `sessions` weekdays from the start date
    pub fn calendar(&self, sessions: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(sessions);
        let mut day = self.start;
        while dates.len() < sessions {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(day);
            }
            day += Duration::days(1);
        }
        dates
    }

    /// Generate one series following `scenario`
    pub fn generate_series(
        &mut self,
        symbol: &str,
        scenario: MarketScenario,
        sessions: usize,
    ) -> Result<PriceSeries> {
        let mut current_price = self.base_price;
        let floor = self.base_price * 0.05;

        let points = self
            .calendar(sessions)
            .into_iter()
            .map(|session| {
                let change = match scenario {
                    MarketScenario::Uptrend => {
                        current_price * (0.001 + self.rng.gen_range(-0.005..0.005))
                    }
                    MarketScenario::Downtrend => {
                        current_price * (-0.001 + self.rng.gen_range(-0.005..0.005))
                    }
                    MarketScenario::Sideways => {
                        // 10% pull to the mean plus ±1% noise
                        (self.base_price - current_price) * 0.1
                            + current_price * self.rng.gen_range(-0.01..0.01)
                    }
                    MarketScenario::Volatile => current_price * self.rng.gen_range(-0.03..0.03),
                };
                current_price = (current_price + change).max(floor);

                PricePoint {
                    session,
                    price: current_price,
                }
            })
            .collect();

        PriceSeries::new(symbol, points)
    }

    /// Generate an aligned table, one scenario per symbol
    pub fn generate_table(
        &mut self,
        assets: &[(String, MarketScenario)],
        sessions: usize,
    ) -> Result<PriceTable> {
        let series = assets
            .iter()
            .map(|(symbol, scenario)| self.generate_series(symbol, *scenario, sessions))
            .collect::<Result<Vec<_>>>()?;

        PriceTable::from_series(&series)
    }
}
