use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::models::config::MarketDataConfig;
use crate::models::result::{AssetPerformance, MarketPerformance};
use crate::models::series::{MarketChart, PricePoint, VolumePoint};

use super::indicators;

const COINGECKO: &str = "CoinGecko";
const INDEX_QUOTES: &str = "index quotes";
const BTC_COIN_ID: &str = "bitcoin";

/// Back-offsets for the 24h / 7d / 30d changes on a daily series.
const CHANGE_24H_BACK: usize = 2;
const CHANGE_7D_BACK: usize = 8;
const CHANGE_30D_BACK: usize = 30;

/// Source of historical daily series.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// USD price and volume history for a CoinGecko coin id.
    async fn coin_market_chart(&self, coin_id: &str, days: u32) -> Result<MarketChart, AppError>;

    /// Daily close and volume history for an equity index ticker.
    async fn index_history(&self, symbol: &str, days: u32) -> Result<MarketChart, AppError>;
}

// ══════════════════════════════════════════════════════════════
// HTTP source
// ══════════════════════════════════════════════════════════════

/// CoinGecko for coins, a Yahoo-style chart endpoint for indices.
#[derive(Clone)]
pub struct HttpMarketData {
    client: Client,
    config: MarketDataConfig,
}

impl HttpMarketData {
    pub fn new(config: MarketDataConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("coin-insights/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &MarketDataConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        source_name: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        debug!(source = source_name, url, "Fetching market data");
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                source_name: source_name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AppError::UpstreamParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketData {
    async fn coin_market_chart(&self, coin_id: &str, days: u32) -> Result<MarketChart, AppError> {
        let url = format!(
            "{}/coins/{}/market_chart",
            self.config.coingecko_base_url,
            coin_id.trim()
        );
        let query = [
            ("vs_currency", "usd".to_string()),
            ("days", days.to_string()),
            ("interval", "daily".to_string()),
        ];
        let raw: CoinGeckoChart = self.get_json(COINGECKO, &url, &query).await?;
        let chart = raw.into_chart();
        if chart.prices.is_empty() {
            return Err(AppError::NoData(coin_id.to_string()));
        }
        Ok(chart)
    }

    async fn index_history(&self, symbol: &str, days: u32) -> Result<MarketChart, AppError> {
        let url = format!(
            "{}/{}",
            self.config.index_quote_base_url,
            symbol.trim().replace('^', "%5E")
        );
        let query = [
            ("range", format!("{}d", days)),
            ("interval", "1d".to_string()),
        ];
        let raw: IndexChartResponse = self.get_json(INDEX_QUOTES, &url, &query).await?;
        let chart = raw.into_chart();
        if chart.prices.is_empty() {
            return Err(AppError::NoData(symbol.to_string()));
        }
        Ok(chart)
    }
}

// ── Upstream payloads ──

#[derive(Debug, Deserialize)]
struct CoinGeckoChart {
    prices: Vec<PricePoint>,
    #[serde(default)]
    total_volumes: Vec<VolumePoint>,
}

impl CoinGeckoChart {
    fn into_chart(self) -> MarketChart {
        MarketChart {
            prices: self.prices,
            volumes: self.total_volumes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexChartResponse {
    chart: IndexChart,
}

#[derive(Debug, Deserialize)]
struct IndexChart {
    #[serde(default)]
    result: Option<Vec<IndexChartResult>>,
}

#[derive(Debug, Deserialize)]
struct IndexChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: IndexIndicators,
}

#[derive(Debug, Deserialize)]
struct IndexIndicators {
    #[serde(default)]
    quote: Vec<IndexQuote>,
}

#[derive(Debug, Deserialize)]
struct IndexQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl IndexChartResponse {
    /// Timestamps arrive in seconds. Bars with a null close are dropped
    /// together with their volume so the two series stay aligned.
    fn into_chart(self) -> MarketChart {
        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return MarketChart::default();
        };
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return MarketChart::default();
        };

        let mut chart = MarketChart::default();
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let Some(price) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
            let timestamp = ts * 1000;
            chart.prices.push(PricePoint::new(timestamp, price));
            chart.volumes.push(VolumePoint::new(timestamp, volume));
        }
        chart
    }
}

// ══════════════════════════════════════════════════════════════
// Market performance
// ══════════════════════════════════════════════════════════════

/// Percent change from the close `back` positions from the end to the
/// latest close.
pub fn change_over(close: &[f64], back: usize) -> Option<f64> {
    if back == 0 || close.len() < back {
        return None;
    }
    let latest = *close.last()?;
    let reference = close[close.len() - back];
    if reference == 0.0 {
        return None;
    }
    Some((latest - reference) / reference * 100.0)
}

/// Price changes, RSI and MACD for one series.
pub fn asset_performance(symbol: &str, chart: &MarketChart) -> AssetPerformance {
    let close = chart.closes();
    AssetPerformance {
        symbol: symbol.to_string(),
        price: close.last().copied(),
        change_24h: change_over(&close, CHANGE_24H_BACK),
        change_7d: change_over(&close, CHANGE_7D_BACK),
        change_30d: change_over(&close, CHANGE_30D_BACK),
        rsi: indicators::rsi(&close),
        macd: indicators::macd(&close),
    }
}

/// Bitcoin against the configured equity index.
///
/// Both series are fetched concurrently. Either failure aborts the whole
/// snapshot; there is no partial result.
pub async fn calculate_market_performance(
    source: &dyn MarketDataSource,
    config: &MarketDataConfig,
) -> Result<MarketPerformance, AppError> {
    let days = config.history_days;
    let (btc, index) = tokio::try_join!(
        source.coin_market_chart(BTC_COIN_ID, days),
        source.index_history(&config.index_symbol, days),
    )
    .map_err(|e| {
        error!("Market performance fetch failed: {}", e);
        e
    })?;

    info!(
        "Market performance: {} BTC points, {} {} points",
        btc.prices.len(),
        index.prices.len(),
        config.index_symbol
    );

    Ok(MarketPerformance {
        btc: asset_performance("BTC", &btc),
        index: asset_performance(&config.index_symbol, &index),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory source; `None` series fail like an unreachable upstream.
    pub(crate) struct StubSource {
        pub coin: Option<MarketChart>,
        pub index: Option<MarketChart>,
    }

    pub(crate) fn chart(prices: &[f64]) -> MarketChart {
        MarketChart {
            prices: prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PricePoint::new(i as i64 * 86_400_000, p))
                .collect(),
            volumes: (0..prices.len())
                .map(|i| VolumePoint::new(i as i64 * 86_400_000, 1000.0))
                .collect(),
        }
    }

    #[async_trait]
    impl MarketDataSource for StubSource {
        async fn coin_market_chart(&self, coin_id: &str, _days: u32) -> Result<MarketChart, AppError> {
            self.coin
                .clone()
                .ok_or_else(|| AppError::Network(format!("{} unreachable", coin_id)))
        }

        async fn index_history(&self, symbol: &str, _days: u32) -> Result<MarketChart, AppError> {
            self.index.clone().ok_or_else(|| AppError::UpstreamStatus {
                source_name: symbol.to_string(),
                status: 503,
            })
        }
    }

    #[test]
    fn test_change_offsets() {
        let close: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        // 24h compares against close[len - 2]
        let c24 = change_over(&close, 2).unwrap();
        assert!((c24 - (40.0 - 39.0) / 39.0 * 100.0).abs() < 1e-9);
        let c30 = change_over(&close, 30).unwrap();
        assert!((c30 - (40.0 - 11.0) / 11.0 * 100.0).abs() < 1e-9);
        assert_eq!(change_over(&close[..5], 8), None);
        assert_eq!(change_over(&[0.0, 1.0], 2), None);
    }

    #[test]
    fn test_parse_coingecko_chart() {
        let body = r#"{
            "prices": [[1700000000000, 37000.5], [1700086400000, 37500.0]],
            "market_caps": [[1700000000000, 1.0], [1700086400000, 1.0]],
            "total_volumes": [[1700000000000, 12000.0], [1700086400000, 15000.0]]
        }"#;
        let raw: CoinGeckoChart = serde_json::from_str(body).unwrap();
        let chart = raw.into_chart();
        assert_eq!(chart.prices.len(), 2);
        assert_eq!(chart.prices[1], PricePoint::new(1_700_086_400_000, 37500.0));
        assert!(chart.volumes_aligned());
    }

    #[test]
    fn test_parse_index_chart_skips_null_closes() {
        let body = r#"{"chart": {"result": [{
            "timestamp": [1700000000, 1700086400, 1700172800],
            "indicators": {"quote": [{
                "close": [4500.0, null, 4550.5],
                "volume": [100, null, null]
            }]}
        }], "error": null}}"#;
        let raw: IndexChartResponse = serde_json::from_str(body).unwrap();
        let chart = raw.into_chart();
        assert_eq!(
            chart.prices,
            vec![
                PricePoint::new(1_700_000_000_000, 4500.0),
                PricePoint::new(1_700_172_800_000, 4550.5),
            ]
        );
        assert_eq!(chart.volumes[1].volume, 0.0);

        let empty: IndexChartResponse =
            serde_json::from_str(r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#)
                .unwrap();
        assert!(empty.into_chart().prices.is_empty());
    }

    #[tokio::test]
    async fn test_market_performance() {
        let btc: Vec<f64> = (0..40).map(|i| 30_000.0 + i as f64 * 100.0).collect();
        let index: Vec<f64> = (0..40).map(|i| 4_500.0 - i as f64).collect();
        let source = StubSource {
            coin: Some(chart(&btc)),
            index: Some(chart(&index)),
        };
        let config = MarketDataConfig::default();
        let perf = calculate_market_performance(&source, &config).await.unwrap();

        assert_eq!(perf.btc.symbol, "BTC");
        assert_eq!(perf.btc.price, Some(33_900.0));
        assert!(perf.btc.change_7d.unwrap() > 0.0);
        assert_eq!(perf.btc.rsi, Some(100.0));
        assert!(perf.btc.macd.is_some());
        assert_eq!(perf.index.symbol, "^GSPC");
        assert!(perf.index.change_30d.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn test_market_performance_aborts_on_any_failure() {
        let source = StubSource {
            coin: Some(chart(&[1.0, 2.0, 3.0])),
            index: None,
        };
        let err = calculate_market_performance(&source, &MarketDataConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamStatus { status: 503, .. }));

        let source = StubSource {
            coin: None,
            index: Some(chart(&[1.0, 2.0, 3.0])),
        };
        let err = calculate_market_performance(&source, &MarketDataConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
