pub mod yahoo;

pub use yahoo::YahooClient;

use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::models::{PriceSeries, PriceTable};

/// Source of daily price history
pub trait PriceProvider: Send + Sync {
    /// Fetch one symbol's closes over a provider-specific range such as "2y"
    fn fetch_history(
        &self,
        symbol: &str,
        range: &str,
    ) -> impl Future<Output = Result<PriceSeries>> + Send;
}

/// Fetch every symbol and align them into a table of complete rows
///
/// Sessions missing for any symbol are dropped, never filled.
pub async fn load_price_table<P: PriceProvider>(
    provider: &P,
    symbols: &[String],
    range: &str,
) -> Result<PriceTable> {
    let mut series = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let history = provider
            .fetch_history(symbol, range)
            .await
            .with_context(|| format!("Failed to fetch history for {}", symbol))?;
        series.push(history);
    }

    let aligned = PriceTable::from_series(&series)?;
    let dropped = aligned.incomplete_rows();
    if dropped > 0 {
        tracing::warn!(
            "Dropped {} of {} sessions with missing prices",
            dropped,
            aligned.len()
        );
    }

    let table = aligned.drop_incomplete();
    tracing::info!(
        "Loaded {} complete sessions for {} symbols",
        table.len(),
        symbols.len()
    );

    Ok(table)
}

/// Cache key: the symbol universe (sorted, deduplicated) and the history window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniverseKey {
    symbols: Vec<String>,
    range: String,
}

impl UniverseKey {
    pub fn new(symbols: &[String], range: &str) -> Self {
        let mut symbols = symbols.to_vec();
        symbols.sort();
        symbols.dedup();
        Self {
            symbols,
            range: range.to_string(),
        }
    }
}

/// Price tables served through an expiring cache in front of a provider
pub struct MarketData<P> {
    provider: P,
    cache: TtlCache<UniverseKey, PriceTable>,
}

impl<P: PriceProvider> MarketData<P> {
    pub fn new(provider: P, ttl: Duration) -> Self {
        Self {
            provider,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Price table for `symbols` over `range`, fetched only when not cached
    pub async fn price_table(&self, symbols: &[String], range: &str) -> Result<PriceTable> {
        let key = UniverseKey::new(symbols, range);

        if let Some(table) = self.cache.get(&key).map_err(anyhow::Error::msg)? {
            tracing::debug!("Cache hit for {:?}", key);
            return Ok(table);
        }

        let table = load_price_table(&self.provider, &key.symbols, range).await?;
        self.cache
            .insert(key, table.clone())
            .map_err(anyhow::Error::msg)?;

        Ok(table)
    }

    /// Force the next request for this universe to hit the provider
    pub fn invalidate(&self, symbols: &[String], range: &str) -> Result<bool> {
        self.cache
            .invalidate(&UniverseKey::new(symbols, range))
            .map_err(anyhow::Error::msg)
    }

    pub fn clear(&self) -> Result<()> {
        self.cache.clear().map_err(anyhow::Error::msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory provider that counts calls
    struct StaticProvider {
        data: HashMap<String, Vec<(u32, f64)>>,
        calls: AtomicUsize,
    }

    impl StaticProvider {
        fn new(data: &[(&str, Vec<(u32, f64)>)]) -> Self {
            Self {
                data: data
                    .iter()
                    .map(|(s, v)| (s.to_string(), v.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PriceProvider for StaticProvider {
        async fn fetch_history(&self, symbol: &str, _range: &str) -> Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rows = self
                .data
                .get(symbol)
                .with_context(|| format!("unknown symbol {}", symbol))?;
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let points = rows
                .iter()
                .map(|&(day, price)| PricePoint {
                    session: start + ChronoDuration::days(day as i64),
                    price,
                })
                .collect();
            Ok(PriceSeries::new(symbol, points)?)
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_price_table_drops_incomplete_sessions() {
        let provider = StaticProvider::new(&[
            ("SPY", vec![(0, 1.0), (1, 2.0), (2, 3.0)]),
            ("EEM", vec![(0, 10.0), (2, 30.0)]),
        ]);

        let table = load_price_table(&provider, &symbols(&["SPY", "EEM"]), "2y")
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.series("SPY").unwrap().prices(), vec![1.0, 3.0]);
        assert_eq!(table.incomplete_rows(), 0);
    }

    #[tokio::test]
    async fn test_load_price_table_propagates_provider_error() {
        let provider = StaticProvider::new(&[("SPY", vec![(0, 1.0)])]);
        let err = load_price_table(&provider, &symbols(&["SPY", "XXX"]), "2y")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("XXX"));
    }

    #[test]
    fn test_universe_key_ignores_order_and_duplicates() {
        let a = UniverseKey::new(&symbols(&["SPY", "QQQ", "SPY"]), "2y");
        let b = UniverseKey::new(&symbols(&["QQQ", "SPY"]), "2y");
        let c = UniverseKey::new(&symbols(&["QQQ", "SPY"]), "1y");
        assert_eq!(a, b);
        assert_ne!(b, c);
    }

    #[tokio::test]
    async fn test_market_data_caches_and_invalidates() {
        let provider = StaticProvider::new(&[
            ("SPY", vec![(0, 1.0), (1, 2.0)]),
            ("QQQ", vec![(0, 5.0), (1, 6.0)]),
        ]);
        let market = MarketData::new(provider, Duration::from_secs(3600));
        let universe = symbols(&["SPY", "QQQ"]);

        let first = market.price_table(&universe, "2y").await.unwrap();
        let second = market.price_table(&universe, "2y").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(market.provider().calls.load(Ordering::SeqCst), 2);

        assert!(market.invalidate(&universe, "2y").unwrap());
        market.price_table(&universe, "2y").await.unwrap();
        assert_eq!(market.provider().calls.load(Ordering::SeqCst), 4);

        // A different window is a different cache entry
        market.price_table(&universe, "1y").await.unwrap();
        assert_eq!(market.provider().calls.load(Ordering::SeqCst), 6);
    }
}
