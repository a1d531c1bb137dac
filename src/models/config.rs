use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Upstream market-data endpoints and request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// CoinGecko API root (e.g. "https://api.coingecko.com/api/v3")
    pub coingecko_base_url: String,
    /// Chart endpoint root for equity indices
    pub index_quote_base_url: String,
    /// Index ticker queried for the cross-asset snapshot
    pub index_symbol: String,
    /// Days of daily history requested per series
    pub history_days: u32,
    pub request_timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
            index_quote_base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            index_symbol: "^GSPC".to_string(),
            history_days: 90,
            request_timeout_secs: 15,
        }
    }
}

impl MarketDataConfig {
    /// Defaults overridden by `COINGECKO_BASE_URL`, `INDEX_QUOTE_BASE_URL`,
    /// `INDEX_SYMBOL`, `MARKET_HISTORY_DAYS` and `MARKET_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(url) = lookup("COINGECKO_BASE_URL") {
            config.coingecko_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("INDEX_QUOTE_BASE_URL") {
            config.index_quote_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(symbol) = lookup("INDEX_SYMBOL") {
            config.index_symbol = symbol.trim().to_string();
        }
        if let Some(days) = lookup("MARKET_HISTORY_DAYS") {
            config.history_days = parse_number("MARKET_HISTORY_DAYS", &days)?;
        }
        if let Some(secs) = lookup("MARKET_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("MARKET_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidConfig(format!("{} must be a number, got '{}'", key, value)))
}

/// Replay timing. One tick lasts `base_tick_ms / speed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub base_tick_ms: u64,
    pub default_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_tick_ms: 100,
            default_speed: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = MarketDataConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.history_days, 90);
        assert_eq!(config.index_symbol, "^GSPC");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_env_overrides() {
        let config = MarketDataConfig::from_lookup(lookup_from(&[
            ("COINGECKO_BASE_URL", "http://localhost:8080/"),
            ("MARKET_HISTORY_DAYS", "365"),
        ]))
        .unwrap();
        assert_eq!(config.coingecko_base_url, "http://localhost:8080");
        assert_eq!(config.history_days, 365);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = MarketDataConfig::from_lookup(lookup_from(&[("MARKET_HISTORY_DAYS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }
}
