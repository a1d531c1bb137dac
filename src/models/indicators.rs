use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of the latest MACD/signal cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crossover {
    Bullish,
    Bearish,
}

/// Long-term trend from SMA50 vs SMA200.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendBias {
    Uptrend,
    Downtrend,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// StochRSI leaving an extreme zone between the previous and the latest point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StochRsiFlip {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeState {
    Expanding,
    Contracting,
    Stable,
}

/// Pattern of the last two closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandlePattern {
    #[serde(rename = "Doji")]
    Doji,
    #[serde(rename = "Bullish Close")]
    BullishClose,
    #[serde(rename = "Bearish Close")]
    BearishClose,
}

impl fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CandlePattern::Doji => "Doji",
            CandlePattern::BullishClose => "Bullish Close",
            CandlePattern::BearishClose => "Bearish Close",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub is_rising: bool,
    pub crossover: Option<Crossover>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmaSnapshot {
    pub sma20: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub above_sma20: bool,
    pub above_sma50: bool,
    pub above_sma200: bool,
}

/// Technical snapshot for the latest point of a price/volume window.
///
/// Always structurally complete; fields that need more history than was
/// supplied are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorsResult {
    pub rsi: Option<f64>,
    pub stoch_rsi: Option<f64>,
    pub macd: Option<MacdSnapshot>,
    pub sma: Option<SmaSnapshot>,
    pub fib_levels: Option<BTreeMap<String, f64>>,
    pub trend_bias: Option<TrendBias>,
    pub range_position: Option<f64>,
    pub volatility: Option<f64>,
    pub stoch_rsi_flip: Option<StochRsiFlip>,
    pub confidence: Confidence,
    pub candle_pattern: Option<CandlePattern>,
    pub vwap: Option<f64>,
    pub momentum: Option<f64>,
    pub is_breakout: bool,
    pub is_volume_spike: bool,
    pub trend_duration: usize,
    pub range_state: RangeState,
}

impl Default for IndicatorsResult {
    fn default() -> Self {
        Self {
            rsi: None,
            stoch_rsi: None,
            macd: None,
            sma: None,
            fib_levels: None,
            trend_bias: None,
            range_position: None,
            volatility: None,
            stoch_rsi_flip: None,
            confidence: Confidence::Low,
            candle_pattern: None,
            vwap: None,
            momentum: None,
            is_breakout: false,
            is_volume_spike: false,
            trend_duration: 0,
            range_state: RangeState::Stable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&Crossover::Bullish).unwrap(), "\"bullish\"");
        assert_eq!(serde_json::to_string(&TrendBias::Sideways).unwrap(), "\"sideways\"");
        assert_eq!(serde_json::to_string(&RangeState::Expanding).unwrap(), "\"expanding\"");
        assert_eq!(
            serde_json::to_string(&CandlePattern::BullishClose).unwrap(),
            "\"Bullish Close\""
        );
    }

    #[test]
    fn test_default_is_empty_snapshot() {
        let r = IndicatorsResult::default();
        assert!(r.rsi.is_none());
        assert_eq!(r.confidence, Confidence::Low);
        assert_eq!(r.range_state, RangeState::Stable);
        assert!(!r.is_breakout);
    }
}
