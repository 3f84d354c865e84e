use anyhow::{Context, Result};
use chrono::DateTime;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;

use super::PriceProvider;
use crate::config::DataConfig;
use crate::models::{PricePoint, PriceSeries};

// Type alias for the rate limiter to simplify signatures
type YahooRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Yahoo Finance chart API client with rate limiting and retries
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    rate_limiter: Arc<YahooRateLimiter>,
}

/// Response from /v8/finance/chart/{symbol}
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

impl YahooClient {
    pub fn new(config: &DataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; riskon/0.1)")
            .build()
            .context("Failed to build HTTP client")?;

        let rpm = NonZeroU32::new(config.requests_per_minute)
            .context("requests_per_minute must be greater than zero")?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
            rate_limiter,
        })
    }

    /// Make a rate-limited API request with retry logic
    async fn make_request(&self, url: &str) -> Result<reqwest::Response> {
        for attempt in 1..=self.max_retries {
            // Wait for rate limiter
            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if (status.as_u16() == 429 || status.is_server_error())
                        && attempt < self.max_retries
                    {
                        let backoff_secs = 2u64.pow(attempt);
                        tracing::warn!(
                            "Yahoo returned {}, retrying in {}s (attempt {}/{})",
                            status,
                            backoff_secs,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        continue;
                    }

                    // Other errors (4xx) - don't retry
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    anyhow::bail!("Yahoo API error ({}): {}", status, error_text);
                }
                Err(e) if attempt < self.max_retries => {
                    let backoff_secs = 2u64.pow(attempt);
                    tracing::warn!(
                        "Network error: {}, retrying in {}s (attempt {}/{})",
                        e,
                        backoff_secs,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                }
                Err(e) => anyhow::bail!(
                    "Network error after {} attempts: {}",
                    self.max_retries,
                    e
                ),
            }
        }

        anyhow::bail!("Failed after {} attempts", self.max_retries)
    }

    /// Fetch daily closes for `symbol` over `range` (e.g. "2y")
    ///
    /// Prefers split/dividend-adjusted closes; sessions with no close are skipped.
    pub async fn get_daily_closes(&self, symbol: &str, range: &str) -> Result<PriceSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d&events=div%2Csplit",
            self.base_url, symbol, range
        );

        tracing::debug!("Fetching {} daily closes for {}", range, symbol);

        let response = self.make_request(&url).await?;
        let body: ChartResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse chart for {}", symbol))?;

        let series = parse_chart(symbol, body)?;

        tracing::debug!("Fetched {} sessions for {}", series.len(), symbol);

        Ok(series)
    }
}

impl PriceProvider for YahooClient {
    async fn fetch_history(&self, symbol: &str, range: &str) -> Result<PriceSeries> {
        self.get_daily_closes(symbol, range).await
    }
}

fn parse_chart(symbol: &str, body: ChartResponse) -> Result<PriceSeries> {
    if let Some(err) = body.chart.error {
        anyhow::bail!("Yahoo chart error for {} ({}): {}", symbol, err.code, err.description);
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .with_context(|| format!("No chart data for {}", symbol))?;

    let closes = match result.indicators.adjclose.into_iter().next() {
        Some(adj) if !adj.adjclose.is_empty() => adj.adjclose,
        _ => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    if closes.len() != result.timestamp.len() {
        anyhow::bail!(
            "Misaligned chart data for {}: {} timestamps, {} closes",
            symbol,
            result.timestamp.len(),
            closes.len()
        );
    }

    let mut points: Vec<PricePoint> = Vec::with_capacity(result.timestamp.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(price) = close else { continue };
        let session = DateTime::from_timestamp(*ts, 0)
            .with_context(|| format!("Invalid timestamp {} for {}", ts, symbol))?
            .date_naive();

        // Intraday snapshot of the current session can repeat the last date
        match points.last_mut() {
            Some(last) if last.session == session => last.price = price,
            _ => points.push(PricePoint { session, price }),
        }
    }

    PriceSeries::new(symbol, points).with_context(|| format!("Invalid price data for {}", symbol))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_json(timestamps: &[i64], closes: &[Option<f64>], adj: Option<&[Option<f64>]>) -> String {
        let adjclose = adj
            .map(|a| serde_json::json!([{ "adjclose": a }]))
            .unwrap_or_else(|| serde_json::json!([]));
        serde_json::json!({
            "chart": {
                "result": [{
                    "timestamp": timestamps,
                    "indicators": {
                        "quote": [{ "close": closes }],
                        "adjclose": adjclose
                    }
                }],
                "error": null
            }
        })
        .to_string()
    }

    fn test_config(base_url: String) -> DataConfig {
        DataConfig {
            base_url,
            max_retries: 2,
            ..Default::default()
        }
    }

    // 2024-01-02, 2024-01-03, 2024-01-04 at 14:30 UTC
    const TS: [i64; 3] = [1704205800, 1704292200, 1704378600];

    #[test]
    fn test_parse_prefers_adjusted_close() {
        let json = chart_json(
            &TS,
            &[Some(10.0), Some(11.0), Some(12.0)],
            Some(&[Some(9.0), Some(10.0), Some(11.0)]),
        );
        let body: ChartResponse = serde_json::from_str(&json).unwrap();
        let series = parse_chart("SPY", body).unwrap();

        assert_eq!(series.prices(), vec![9.0, 10.0, 11.0]);
        assert_eq!(series.points()[0].session.to_string(), "2024-01-02");
    }

    #[test]
    fn test_parse_skips_null_closes() {
        let json = chart_json(&TS, &[Some(10.0), None, Some(12.0)], None);
        let body: ChartResponse = serde_json::from_str(&json).unwrap();
        let series = parse_chart("SPY", body).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.prices(), vec![10.0, 12.0]);
    }

    #[test]
    fn test_parse_collapses_repeated_session() {
        let json = chart_json(
            &[TS[0], TS[1], TS[1] + 3600],
            &[Some(10.0), Some(11.0), Some(11.5)],
            None,
        );
        let body: ChartResponse = serde_json::from_str(&json).unwrap();
        let series = parse_chart("SPY", body).unwrap();

        assert_eq!(series.prices(), vec![10.0, 11.5]);
    }

    #[test]
    fn test_parse_chart_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        let err = parse_chart("NOPE", body).unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_rejects_misaligned_arrays() {
        let json = chart_json(&TS, &[Some(10.0), Some(11.0)], None);
        let body: ChartResponse = serde_json::from_str(&json).unwrap();
        let err = parse_chart("SPY", body).unwrap_err();
        assert!(err.to_string().contains("3 timestamps, 2 closes"));

        let json = chart_json(
            &TS[..2],
            &[Some(10.0), Some(11.0)],
            Some(&[Some(9.0), Some(10.0), Some(11.0)]),
        );
        let body: ChartResponse = serde_json::from_str(&json).unwrap();
        assert!(parse_chart("SPY", body).is_err());
    }

    #[tokio::test]
    async fn test_get_daily_closes_from_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v8/finance/chart/QQQ")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("range".into(), "2y".into()),
                mockito::Matcher::UrlEncoded("interval".into(), "1d".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chart_json(&TS, &[Some(400.0), Some(401.0), Some(402.0)], None))
            .create_async()
            .await;

        let client = YahooClient::new(&test_config(server.url())).unwrap();
        let series = client.get_daily_closes("QQQ", "2y").await.unwrap();

        mock.assert_async().await;
        assert_eq!(series.symbol(), "QQQ");
        assert_eq!(series.prices(), vec![400.0, 401.0, 402.0]);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Regex("^/v8/finance/chart/BAD".into()))
            .with_status(404)
            .with_body("not found")
            .expect(1)
            .create_async()
            .await;

        let client = YahooClient::new(&test_config(server.url())).unwrap();
        let err = client.get_daily_closes("BAD", "2y").await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Regex("^/v8/finance/chart/SPY".into()))
            .with_status(503)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        let client = YahooClient::new(&test_config(server.url())).unwrap();
        let err = client.get_daily_closes("SPY", "2y").await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_get_daily_closes_live() {
        let client = YahooClient::new(&DataConfig::default()).unwrap();
        let series = client.get_daily_closes("SPY", "1y").await.unwrap();

        assert!(series.len() > 200, "Expected >200 sessions, got {}", series.len());
    }
}
