use std::fmt;

use serde::{Deserialize, Serialize};

/// Side of an open or closed position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Long => f.write_str("long"),
            TradeDirection::Short => f.write_str("short"),
        }
    }
}

/// Which directions a backtest may open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectionFilter {
    Long,
    Short,
    #[default]
    Both,
}

impl DirectionFilter {
    pub fn allows(self, direction: TradeDirection) -> bool {
        matches!(
            (self, direction),
            (DirectionFilter::Both, _)
                | (DirectionFilter::Long, TradeDirection::Long)
                | (DirectionFilter::Short, TradeDirection::Short)
        )
    }
}

/// A completed simulated round trip. `entry_index < exit_index` always.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub id: String,
    pub strategy: String,
    pub direction: TradeDirection,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Leverage-adjusted return in percent.
    pub profit_percent: f64,
    pub spot_profit_percent: f64,
    pub spot_profit_amount: f64,
    pub entry_action: String,
    pub exit_action: String,
    pub exit_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation_price: Option<f64>,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit_percent > 0.0
    }
}
