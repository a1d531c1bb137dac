use crate::models::result::{BacktestConfig, BacktestTotals, Summary};
use crate::models::trade::Trade;

use super::orders;

/// Per-strategy statistics from that strategy's trades.
///
/// Zero trades is a valid outcome: counts, rates and returns are all zero.
/// Spot figures are only reported when leverage is not 1.
pub fn summarize(strategy_name: &str, trades: &[Trade], config: &BacktestConfig) -> Summary {
    let trade_count = trades.len();
    let winning_trades = trades.iter().filter(|t| t.is_win()).count();
    let total_return: f64 = trades.iter().map(|t| t.profit_percent).sum();

    let (best_trade_return, worst_trade_return) = if trades.is_empty() {
        (0.0, 0.0)
    } else {
        trades.iter().fold((f64::NEG_INFINITY, f64::INFINITY), |(best, worst), t| {
            (best.max(t.profit_percent), worst.min(t.profit_percent))
        })
    };
    let (max_consecutive_wins, max_consecutive_losses) = calculate_consecutive(trades);

    let leveraged = config.leverage != 1.0;
    let spot_return: f64 = trades.iter().map(|t| t.spot_profit_percent).sum();

    Summary {
        strategy_name: strategy_name.to_string(),
        trade_count,
        winning_trades,
        win_rate: win_rate(winning_trades, trade_count),
        total_return,
        profit: orders::profit_amount(config.investment_amount, total_return),
        leverage_used: config.leverage,
        spot_return: leveraged.then_some(spot_return),
        spot_profit: leveraged
            .then(|| orders::profit_amount(config.investment_amount, spot_return)),
        avg_trade_return: if trade_count > 0 {
            total_return / trade_count as f64
        } else {
            0.0
        },
        best_trade_return,
        worst_trade_return,
        max_consecutive_wins,
        max_consecutive_losses,
    }
}

/// Totals over the whole ledger, across every strategy.
pub fn calculate_totals(trades: &[Trade], config: &BacktestConfig) -> BacktestTotals {
    let trade_count = trades.len();
    let winning_trades = trades.iter().filter(|t| t.is_win()).count();
    let total_return: f64 = trades.iter().map(|t| t.profit_percent).sum();
    let spot_return: f64 = trades.iter().map(|t| t.spot_profit_percent).sum();

    BacktestTotals {
        trade_count,
        winning_trades,
        win_rate: win_rate(winning_trades, trade_count),
        total_return,
        profit: orders::profit_amount(config.investment_amount, total_return),
        spot_return,
        spot_profit: orders::profit_amount(config.investment_amount, spot_return),
    }
}

fn win_rate(winning: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        winning as f64 / total as f64 * 100.0
    }
}

/// Longest winning and losing streaks. Break-even trades end neither streak.
fn calculate_consecutive(trades: &[Trade]) -> (usize, usize) {
    let mut max_wins = 0usize;
    let mut max_losses = 0usize;
    let mut current_wins = 0usize;
    let mut current_losses = 0usize;

    for trade in trades {
        if trade.profit_percent > 0.0 {
            current_wins += 1;
            current_losses = 0;
        } else if trade.profit_percent < 0.0 {
            current_losses += 1;
            current_wins = 0;
        }
        max_wins = max_wins.max(current_wins);
        max_losses = max_losses.max(current_losses);
    }

    (max_wins, max_losses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trade::{DirectionFilter, TradeDirection};

    fn trade(profit_percent: f64, leverage: f64) -> Trade {
        let spot = profit_percent / leverage;
        Trade {
            id: String::new(),
            strategy: "Test".into(),
            direction: TradeDirection::Long,
            entry_index: 0,
            exit_index: 1,
            entry_time: 0,
            exit_time: 1,
            entry_price: 100.0,
            exit_price: 100.0 + spot,
            profit_percent,
            spot_profit_percent: spot,
            spot_profit_amount: spot * 10.0,
            entry_action: "BUY".into(),
            exit_action: "SELL".into(),
            exit_reason: "Exit".into(),
            liquidation_price: None,
        }
    }

    fn config(leverage: f64) -> BacktestConfig {
        BacktestConfig {
            investment_amount: 1000.0,
            direction: DirectionFilter::Both,
            leverage,
        }
    }

    #[test]
    fn test_zero_trades() {
        let summary = summarize("Empty", &[], &config(1.0));
        assert_eq!(summary.trade_count, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.total_return, 0.0);
        assert_eq!(summary.best_trade_return, 0.0);
        assert_eq!(summary.spot_return, None);
    }

    #[test]
    fn test_summary_figures() {
        let trades = vec![trade(10.0, 2.0), trade(-4.0, 2.0), trade(6.0, 2.0)];
        let summary = summarize("Test", &trades, &config(2.0));
        assert_eq!(summary.trade_count, 3);
        assert_eq!(summary.winning_trades, 2);
        assert!((summary.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((summary.total_return - 12.0).abs() < 1e-9);
        assert!((summary.profit - 120.0).abs() < 1e-9);
        assert!((summary.avg_trade_return - 4.0).abs() < 1e-9);
        assert_eq!(summary.best_trade_return, 10.0);
        assert_eq!(summary.worst_trade_return, -4.0);
        assert!((summary.spot_return.unwrap() - 6.0).abs() < 1e-9);
        assert!((summary.spot_profit.unwrap() - 60.0).abs() < 1e-9);
        assert_eq!(summary.leverage_used, 2.0);
    }

    #[test]
    fn test_consecutive_streaks() {
        let trades: Vec<Trade> = [1.0, 2.0, 0.0, 3.0, -1.0, -2.0, 4.0]
            .iter()
            .map(|&p| trade(p, 1.0))
            .collect();
        assert_eq!(calculate_consecutive(&trades), (3, 2));
        assert_eq!(calculate_consecutive(&[]), (0, 0));
    }

    #[test]
    fn test_totals() {
        let trades = vec![trade(5.0, 1.0), trade(-1.0, 1.0)];
        let totals = calculate_totals(&trades, &config(1.0));
        assert_eq!(totals.trade_count, 2);
        assert_eq!(totals.winning_trades, 1);
        assert_eq!(totals.win_rate, 50.0);
        assert!((totals.profit - 40.0).abs() < 1e-9);
        assert!((totals.spot_profit - 40.0).abs() < 1e-9);
        assert_eq!(calculate_totals(&[], &config(1.0)), BacktestTotals::default());
    }
}
