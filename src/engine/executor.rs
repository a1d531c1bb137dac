use tracing::{debug, info};

use crate::models::result::{BacktestConfig, BacktestResults};
use crate::models::series::{closes, PricePoint, VolumePoint};
use crate::models::trade::{Trade, TradeDirection};

use super::metrics::{calculate_totals, summarize};
use super::orders;
use super::strategy::{close_action, open_action, OpenPosition, Signal, Strategy, StrategyWindow};

/// Run every selected strategy over the price series.
///
/// Each strategy gets its own flat/open state machine, so trades never
/// overlap within a strategy. The ledger is ordered by entry index; within
/// the same index, strategies keep their selection order. An empty series
/// produces no trades and no summaries.
pub fn run_backtest(
    prices: &[PricePoint],
    volumes: &[VolumePoint],
    strategies: &[&dyn Strategy],
    config: &BacktestConfig,
) -> BacktestResults {
    let total_bars = prices.len();
    if total_bars == 0 {
        info!("Backtest skipped: empty price series");
        return BacktestResults::default();
    }
    let span = |p: &PricePoint| {
        p.datetime()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| p.timestamp.to_string())
    };
    info!(
        "Starting backtest: {} bars ({} to {}), {} strategies, direction={:?}, leverage={}",
        total_bars,
        span(&prices[0]),
        span(&prices[total_bars - 1]),
        strategies.len(),
        config.direction,
        config.leverage
    );

    let close = closes(prices);
    let volume: Vec<f64> = if volumes.len() == total_bars {
        volumes.iter().map(|v| v.volume).collect()
    } else {
        Vec::new()
    };

    let mut trades: Vec<Trade> = Vec::new();
    let mut summary = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let strategy_trades = simulate_strategy(*strategy, prices, &close, &volume, config);
        debug!(
            "Strategy '{}' produced {} trades",
            strategy.name(),
            strategy_trades.len()
        );
        summary.push(summarize(strategy.name(), &strategy_trades, config));
        trades.extend(strategy_trades);
    }

    // Stable: ties keep strategy selection order
    trades.sort_by_key(|t| t.entry_index);
    let totals = calculate_totals(&trades, config);

    info!(
        "Backtest complete: {} trades, total return {:.2}%",
        trades.len(),
        totals.total_return
    );

    BacktestResults {
        trades,
        summary,
        totals,
    }
}

/// Walk one strategy bar by bar.
fn simulate_strategy(
    strategy: &dyn Strategy,
    prices: &[PricePoint],
    close: &[f64],
    volume: &[f64],
    config: &BacktestConfig,
) -> Vec<Trade> {
    let mut position: Option<OpenPosition> = None;
    let mut trades: Vec<Trade> = Vec::new();

    for i in 0..close.len() {
        let window = StrategyWindow {
            index: i,
            close: &close[..=i],
            volume: if volume.is_empty() { &[] } else { &volume[..=i] },
            position: position.as_ref(),
        };

        match strategy.evaluate(&window) {
            Signal::Hold => {}
            Signal::Close { action, reason } => {
                // Closing while flat is a no-op
                if let Some(pos) = position.take() {
                    trades.push(close_position(
                        strategy.name(),
                        &pos,
                        prices,
                        i,
                        action,
                        reason,
                        config,
                    ));
                }
            }
            Signal::Open {
                direction,
                action,
                reason,
            } => {
                if !config.direction.allows(direction) {
                    continue;
                }
                match position.as_ref() {
                    Some(pos) if pos.direction == direction => {}
                    Some(pos) => {
                        // Reversal: close the opposite side, then open at the same bar
                        let exit_action = close_action(pos.direction).to_string();
                        trades.push(close_position(
                            strategy.name(),
                            pos,
                            prices,
                            i,
                            exit_action,
                            reason,
                            config,
                        ));
                        position = open_position(direction, action, i, close[i]);
                    }
                    None => {
                        position = open_position(direction, action, i, close[i]);
                    }
                }
            }
        }
    }

    if let Some(pos) = position {
        debug!(
            "Strategy '{}' ended with an open {} position from bar {}; discarded",
            strategy.name(),
            pos.direction,
            pos.entry_index
        );
    }

    trades
}

fn open_position(
    direction: TradeDirection,
    action: String,
    index: usize,
    price: f64,
) -> Option<OpenPosition> {
    if price <= 0.0 || !price.is_finite() {
        debug!("Skipping entry at bar {}: unusable price {}", index, price);
        return None;
    }
    let entry_action = if action.is_empty() {
        open_action(direction).to_string()
    } else {
        action
    };
    Some(OpenPosition {
        direction,
        entry_index: index,
        entry_price: price,
        entry_action,
    })
}

/// Close a position and create the trade record.
fn close_position(
    strategy: &str,
    pos: &OpenPosition,
    prices: &[PricePoint],
    exit_index: usize,
    exit_action: String,
    exit_reason: String,
    config: &BacktestConfig,
) -> Trade {
    let exit_price = prices[exit_index].price;
    let spot = orders::spot_return_pct(pos.direction, pos.entry_price, exit_price);
    let leveraged = orders::leveraged_return_pct(spot, config.leverage);

    Trade {
        id: uuid::Uuid::new_v4().to_string(),
        strategy: strategy.to_string(),
        direction: pos.direction,
        entry_index: pos.entry_index,
        exit_index,
        entry_time: prices[pos.entry_index].timestamp,
        exit_time: prices[exit_index].timestamp,
        entry_price: pos.entry_price,
        exit_price,
        profit_percent: leveraged,
        spot_profit_percent: spot,
        spot_profit_amount: orders::profit_amount(config.investment_amount, spot),
        entry_action: pos.entry_action.clone(),
        exit_action,
        exit_reason,
        liquidation_price: orders::liquidation_price(
            pos.direction,
            pos.entry_price,
            config.leverage,
        ),
    }
}
