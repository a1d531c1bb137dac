use serde::{Deserialize, Serialize};

use super::indicators::{IndicatorsResult, MacdSnapshot};
use super::levels::SupportResistance;
use super::series::PricePoint;
use super::trade::{DirectionFilter, Trade};

// ══════════════════════════════════════════════════════════════
// Backtest
// ══════════════════════════════════════════════════════════════

/// Backtest parameters as supplied by the playground form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub coin_id: String,
    pub investment_amount: f64,
    pub strategy_names: Vec<String>,
    #[serde(default)]
    pub direction: DirectionFilter,
    pub leverage: f64,
}

/// Simulation parameters shared by every selected strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub investment_amount: f64,
    pub direction: DirectionFilter,
    pub leverage: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            investment_amount: 1000.0,
            direction: DirectionFilter::Both,
            leverage: 1.0,
        }
    }
}

impl From<&BacktestRequest> for BacktestConfig {
    fn from(req: &BacktestRequest) -> Self {
        Self {
            investment_amount: req.investment_amount,
            direction: req.direction,
            leverage: req.leverage,
        }
    }
}

/// Per-strategy statistics, recomputed from the full trade list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub strategy_name: String,
    pub trade_count: usize,
    pub winning_trades: usize,
    /// Percent of trades with a positive leveraged return.
    pub win_rate: f64,
    /// Sum of leveraged trade returns, in percent.
    pub total_return: f64,
    /// `investment_amount × total_return / 100`.
    pub profit: f64,
    pub leverage_used: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_profit: Option<f64>,
    pub avg_trade_return: f64,
    pub best_trade_return: f64,
    pub worst_trade_return: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

/// Totals across every selected strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BacktestTotals {
    pub trade_count: usize,
    pub winning_trades: usize,
    pub win_rate: f64,
    pub total_return: f64,
    pub profit: f64,
    pub spot_return: f64,
    pub spot_profit: f64,
}

/// Complete results of a backtest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestResults {
    pub trades: Vec<Trade>,
    pub summary: Vec<Summary>,
    pub totals: BacktestTotals,
}

/// What the playground receives: results plus the simulated price series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResponse {
    pub summary: Vec<Summary>,
    pub prices: Vec<PricePoint>,
    pub trades: Vec<Trade>,
    pub totals: BacktestTotals,
}

impl BacktestResponse {
    pub fn new(results: BacktestResults, prices: Vec<PricePoint>) -> Self {
        Self {
            summary: results.summary,
            prices,
            trades: results.trades,
            totals: results.totals,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Technical summaries
// ══════════════════════════════════════════════════════════════

/// Indicators and levels for one coin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinTechnicals {
    pub coin_id: String,
    pub price: Option<f64>,
    pub indicators: IndicatorsResult,
    pub levels: SupportResistance,
}

/// Cross-asset snapshot for one series (BTC or the equity index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPerformance {
    pub symbol: String,
    pub price: Option<f64>,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub change_30d: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<MacdSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPerformance {
    pub btc: AssetPerformance,
    pub index: AssetPerformance,
}
