use std::sync::Arc;

use tracing::info;

use crate::engine::{executor, levels, market, snapshot};
use crate::errors::AppError;
use crate::models::result::{
    BacktestConfig, BacktestRequest, BacktestResponse, CoinTechnicals, MarketPerformance,
};
use crate::models::series::VolumePoint;
use crate::AppState;

// ── Backtest Commands ──

/// Fetch the coin's history and run the selected strategies over it.
pub async fn run_backtest(
    state: &AppState,
    request: BacktestRequest,
) -> Result<BacktestResponse, AppError> {
    info!(
        "Running backtest: coin={}, strategies={:?}, direction={:?}, leverage={}",
        request.coin_id, request.strategy_names, request.direction, request.leverage
    );

    let chart = state
        .market
        .coin_market_chart(&request.coin_id, state.market_config.history_days)
        .await?;
    let config = BacktestConfig::from(&request);
    let registry = Arc::clone(&state.registry);

    // CPU-bound simulation off the async runtime
    let response = tokio::task::spawn_blocking(move || {
        let strategies = registry.select(&request.strategy_names);
        let volumes: &[VolumePoint] = if chart.volumes_aligned() {
            chart.volumes.as_slice()
        } else {
            &[]
        };
        let results = executor::run_backtest(&chart.prices, volumes, &strategies, &config);
        BacktestResponse::new(results, chart.prices)
    })
    .await
    .map_err(|e| AppError::BacktestExecution(format!("Task join error: {}", e)))?;

    info!(
        "Backtest complete: {} trades, profit: {:.2}",
        response.trades.len(),
        response.totals.profit
    );

    Ok(response)
}

/// Names of every registered strategy, in registration order.
pub fn list_strategies(state: &AppState) -> Vec<String> {
    state.registry.names().into_iter().map(String::from).collect()
}

// ── Market Commands ──

/// Indicator snapshot and support/resistance levels for one coin.
pub async fn coin_technicals(state: &AppState, coin_id: &str) -> Result<CoinTechnicals, AppError> {
    let chart = state
        .market
        .coin_market_chart(coin_id, state.market_config.history_days)
        .await?;
    let coin_id = coin_id.to_string();

    let technicals = tokio::task::spawn_blocking(move || {
        let price = chart.prices.last().map(|p| p.price);
        CoinTechnicals {
            indicators: snapshot::calculate_indicators(&chart.prices, &chart.volumes),
            levels: levels::detect_support_resistance(&chart.prices, &chart.volumes),
            coin_id,
            price,
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    info!(
        "Technicals for {}: price={:?}, confidence={:?}",
        technicals.coin_id, technicals.price, technicals.indicators.confidence
    );
    Ok(technicals)
}

/// Bitcoin vs. equity index snapshot.
pub async fn market_performance(state: &AppState) -> Result<MarketPerformance, AppError> {
    market::calculate_market_performance(state.market.as_ref(), &state.market_config).await
}
