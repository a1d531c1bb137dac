pub mod commands;
pub mod engine;
pub mod errors;
pub mod models;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::engine::market::{HttpMarketData, MarketDataSource};
use crate::engine::strategy::StrategyRegistry;
use crate::errors::AppError;
use crate::models::config::MarketDataConfig;

pub use crate::engine::executor::run_backtest;
pub use crate::engine::levels::detect_support_resistance;
pub use crate::engine::market::calculate_market_performance;
pub use crate::engine::playback::{PlaybackCommand, PlaybackDriver};
pub use crate::engine::snapshot::calculate_indicators;
pub use crate::engine::strategy::{Signal, Strategy, StrategyWindow};

/// Shared application state, accessible from all commands.
pub struct AppState {
    pub market: Arc<dyn MarketDataSource>,
    pub market_config: MarketDataConfig,
    pub registry: Arc<StrategyRegistry>,
}

impl AppState {
    /// HTTP market data configured from the environment, built-in strategies.
    pub fn from_env() -> Result<Self, AppError> {
        let config = MarketDataConfig::from_env()?;
        let source = HttpMarketData::new(config.clone())?;
        info!(
            "Market data: coingecko={}, index={} ({})",
            config.coingecko_base_url, config.index_quote_base_url, config.index_symbol
        );
        Ok(Self::with_source(
            Arc::new(source),
            config,
            StrategyRegistry::with_builtins(),
        ))
    }

    pub fn with_source(
        market: Arc<dyn MarketDataSource>,
        market_config: MarketDataConfig,
        registry: StrategyRegistry,
    ) -> Self {
        Self {
            market,
            market_config,
            registry: Arc::new(registry),
        }
    }
}

/// Install the fmt subscriber with `RUST_LOG` filtering (default `info`).
/// Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
