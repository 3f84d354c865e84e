use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SignalError};

/// An asset eligible for allocation: a display name and the ticker it trades under
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub symbol: String,
}

impl Asset {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
        }
    }
}

/// Closing price for one trading session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub session: NaiveDate,
    pub price: f64,
}

/// Price history for a single symbol, oldest session first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting unordered sessions and non-positive prices
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self> {
        let symbol = symbol.into();

        for pair in points.windows(2) {
            if pair[1].session <= pair[0].session {
                return Err(SignalError::MalformedInput(format!(
                    "{} sessions not strictly increasing at {}",
                    symbol, pair[1].session
                )));
            }
        }

        if let Some(bad) = points.iter().find(|p| !p.price.is_finite() || p.price <= 0.0) {
            return Err(SignalError::MalformedInput(format!(
                "{} has invalid price {} on {}",
                symbol, bad.price, bad.session
            )));
        }

        Ok(Self { symbol, points })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Price `offset` sessions before the most recent one (0 = latest)
    pub fn price_from_end(&self, offset: usize) -> Option<f64> {
        let idx = self.points.len().checked_sub(offset + 1)?;
        Some(self.points[idx].price)
    }
}

/// Prices for a universe of symbols aligned on a shared session calendar
///
/// Cells may be `None` until `drop_incomplete` has been applied. Computation
/// only ever reads through `series`, which refuses incomplete columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    sessions: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn new(
        sessions: Vec<NaiveDate>,
        columns: impl IntoIterator<Item = (String, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        for pair in sessions.windows(2) {
            if pair[1] <= pair[0] {
                return Err(SignalError::MalformedInput(format!(
                    "table sessions not strictly increasing at {}",
                    pair[1]
                )));
            }
        }

        let mut map = BTreeMap::new();
        for (symbol, values) in columns {
            if values.len() != sessions.len() {
                return Err(SignalError::MalformedInput(format!(
                    "column {} has {} rows, table has {} sessions",
                    symbol,
                    values.len(),
                    sessions.len()
                )));
            }
            if map.insert(symbol.clone(), values).is_some() {
                return Err(SignalError::MalformedInput(format!(
                    "duplicate column {}",
                    symbol
                )));
            }
        }

        Ok(Self {
            sessions,
            columns: map,
        })
    }

    /// Align several series on the union of their sessions
    ///
    /// Sessions a series does not cover become `None` in its column.
    pub fn from_series(series: &[PriceSeries]) -> Result<Self> {
        let sessions: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.session))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let columns = series.iter().map(|s| {
            let by_session: BTreeMap<NaiveDate, f64> =
                s.points.iter().map(|p| (p.session, p.price)).collect();
            let column = sessions
                .iter()
                .map(|d| by_session.get(d).copied())
                .collect();
            (s.symbol.clone(), column)
        })
        .collect::<Vec<_>>();

        Self::new(sessions, columns)
    }

    /// Keep only sessions where every column has a value
    pub fn drop_incomplete(&self) -> Self {
        let keep: Vec<usize> = (0..self.sessions.len())
            .filter(|&i| self.columns.values().all(|c| c[i].is_some()))
            .collect();

        Self {
            sessions: keep.iter().map(|&i| self.sessions[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(symbol, column)| (symbol.clone(), keep.iter().map(|&i| column[i]).collect()))
                .collect(),
        }
    }

    /// Number of sessions with at least one missing value
    pub fn incomplete_rows(&self) -> usize {
        (0..self.sessions.len())
            .filter(|&i| self.columns.values().any(|c| c[i].is_none()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[NaiveDate] {
        &self.sessions
    }

    pub fn last_session(&self) -> Option<NaiveDate> {
        self.sessions.last().copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.columns.contains_key(symbol)
    }

    /// Extract one complete column as a series
    pub fn series(&self, symbol: &str) -> Result<PriceSeries> {
        let column = self.columns.get(symbol).ok_or_else(|| {
            SignalError::MalformedInput(format!("symbol {} missing from price table", symbol))
        })?;

        let points = self
            .sessions
            .iter()
            .zip(column)
            .map(|(&session, value)| {
                value.map(|price| PricePoint { session, price }).ok_or_else(|| {
                    SignalError::MalformedInput(format!(
                        "missing {} price on {}",
                        symbol, session
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        PriceSeries::new(symbol, points)
    }
}

/// Market regime produced by the trend filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeFlag {
    RiskOn,
    RiskOff,
}

impl RegimeFlag {
    pub fn is_risk_on(self) -> bool {
        self == Self::RiskOn
    }
}

impl std::fmt::Display for RegimeFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RiskOn => write!(f, "RISK-ON"),
            Self::RiskOff => write!(f, "RISK-OFF"),
        }
    }
}

/// Regime together with the two values it was decided from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrendReading {
    pub regime: RegimeFlag,
    pub last_price: f64,
    pub ema: f64,
}

/// Lookback return of one candidate, as a raw fraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MomentumScore {
    pub asset: String,
    pub symbol: String,
    pub score: f64,
}

/// One line of a non-cash allocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    pub asset: String,
    pub symbol: String,
    pub weight: f64,
}

/// Target allocation for the next period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "holdings", rename_all = "snake_case")]
pub enum Allocation {
    Cash,
    Assets(Vec<Holding>),
}

impl Allocation {
    pub fn is_cash(&self) -> bool {
        matches!(self, Self::Cash)
    }

    pub fn holdings(&self) -> &[Holding] {
        match self {
            Self::Cash => &[],
            Self::Assets(holdings) => holdings,
        }
    }

    /// Weight held in `asset`, 0.0 if not held
    pub fn weight_of(&self, asset: &str) -> f64 {
        self.holdings()
            .iter()
            .find(|h| h.asset == asset)
            .map(|h| h.weight)
            .unwrap_or(0.0)
    }

    pub fn total_weight(&self) -> f64 {
        self.holdings().iter().map(|h| h.weight).sum()
    }
}

/// Everything one evaluation run produces
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub as_of: NaiveDate,
    pub trend: TrendReading,
    pub ranking: Vec<MomentumScore>,
    pub allocation: Allocation,
}
