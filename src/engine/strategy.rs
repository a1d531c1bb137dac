use tracing::warn;

use crate::models::indicators::Crossover;
use crate::models::trade::TradeDirection;

use super::indicators;
use super::orders;

pub const RSI_REVERSAL: &str = "RSI Reversal";
pub const MACD_CROSSOVER: &str = "MACD Crossover";
pub const SMA_CROSSOVER: &str = "SMA Crossover";
pub const STOCH_RSI: &str = "Stoch RSI";
pub const BREAKOUT: &str = "Breakout";

/// Adverse spot move (percent) that closes a built-in strategy's position.
pub const STOP_LOSS_PCT: f64 = 5.0;
/// Favourable spot move (percent) that closes a built-in strategy's position.
pub const TAKE_PROFIT_PCT: f64 = 10.0;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const STOCH_OVERSOLD: f64 = 20.0;
const STOCH_OVERBOUGHT: f64 = 80.0;
const SMA_FAST: usize = 20;
const SMA_SLOW: usize = 50;

/// What a strategy wants to do at the current bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Hold,
    /// Open a position. `reason` doubles as the exit reason when this signal
    /// reverses an opposite open position.
    Open {
        direction: TradeDirection,
        action: String,
        reason: String,
    },
    Close {
        action: String,
        reason: String,
    },
}

impl Signal {
    pub fn open(direction: TradeDirection, reason: impl Into<String>) -> Self {
        Signal::Open {
            direction,
            action: open_action(direction).to_string(),
            reason: reason.into(),
        }
    }

    pub fn close(direction: TradeDirection, reason: impl Into<String>) -> Self {
        Signal::Close {
            action: close_action(direction).to_string(),
            reason: reason.into(),
        }
    }
}

pub fn open_action(direction: TradeDirection) -> &'static str {
    match direction {
        TradeDirection::Long => "BUY",
        TradeDirection::Short => "SELL SHORT",
    }
}

pub fn close_action(direction: TradeDirection) -> &'static str {
    match direction {
        TradeDirection::Long => "SELL",
        TradeDirection::Short => "BUY TO COVER",
    }
}

/// The position a strategy currently holds in the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub direction: TradeDirection,
    pub entry_index: usize,
    pub entry_price: f64,
    pub entry_action: String,
}

/// Trailing view of the market at bar `index`. `close` and `volume` end at
/// `index`; there is no look-ahead.
#[derive(Debug, Clone, Copy)]
pub struct StrategyWindow<'a> {
    pub index: usize,
    pub close: &'a [f64],
    /// Index-aligned volumes, or empty when none were supplied.
    pub volume: &'a [f64],
    pub position: Option<&'a OpenPosition>,
}

impl StrategyWindow<'_> {
    pub fn price(&self) -> f64 {
        self.close.last().copied().unwrap_or(0.0)
    }
}

/// A named signal generator evaluated bar by bar.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, window: &StrategyWindow<'_>) -> Signal;
}

/// Shared stop-loss / take-profit check for the built-in strategies.
pub fn risk_exit(window: &StrategyWindow<'_>) -> Option<Signal> {
    let pos = window.position?;
    let spot = orders::spot_return_pct(pos.direction, pos.entry_price, window.price());
    if spot <= -STOP_LOSS_PCT {
        Some(Signal::close(pos.direction, "Stop loss hit"))
    } else if spot >= TAKE_PROFIT_PCT {
        Some(Signal::close(pos.direction, "Target reached"))
    } else {
        None
    }
}

/// Turn a directional bias into a signal: open when flat, close an opposite
/// position, hold an aligned one.
fn follow_bias(window: &StrategyWindow<'_>, bias: Option<(TradeDirection, &str)>) -> Signal {
    let Some((direction, reason)) = bias else {
        return Signal::Hold;
    };
    match window.position {
        None => Signal::open(direction, reason),
        Some(pos) if pos.direction != direction => Signal::close(pos.direction, reason),
        Some(_) => Signal::Hold,
    }
}

// ── RSI Reversal ──

/// Long when RSI is oversold, short when overbought.
pub struct RsiReversal;

impl Strategy for RsiReversal {
    fn name(&self) -> &str {
        RSI_REVERSAL
    }

    fn evaluate(&self, window: &StrategyWindow<'_>) -> Signal {
        if let Some(exit) = risk_exit(window) {
            return exit;
        }
        let bias = indicators::rsi(window.close).and_then(|rsi| {
            if rsi < RSI_OVERSOLD {
                Some((TradeDirection::Long, "RSI oversold"))
            } else if rsi > RSI_OVERBOUGHT {
                Some((TradeDirection::Short, "RSI overbought"))
            } else {
                None
            }
        });
        follow_bias(window, bias)
    }
}

// ── MACD Crossover ──

pub struct MacdCrossover;

impl Strategy for MacdCrossover {
    fn name(&self) -> &str {
        MACD_CROSSOVER
    }

    fn evaluate(&self, window: &StrategyWindow<'_>) -> Signal {
        if let Some(exit) = risk_exit(window) {
            return exit;
        }
        let bias = indicators::macd(window.close).and_then(|m| match m.crossover {
            Some(Crossover::Bullish) => Some((TradeDirection::Long, "Bullish MACD crossover")),
            Some(Crossover::Bearish) => Some((TradeDirection::Short, "Bearish MACD crossover")),
            None => None,
        });
        follow_bias(window, bias)
    }
}

// ── SMA Crossover ──

/// Golden cross (SMA20 over SMA50) goes long, death cross goes short.
pub struct SmaCrossover;

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        SMA_CROSSOVER
    }

    fn evaluate(&self, window: &StrategyWindow<'_>) -> Signal {
        if let Some(exit) = risk_exit(window) {
            return exit;
        }
        let close = window.close;
        if close.len() <= SMA_SLOW {
            return Signal::Hold;
        }
        let previous = &close[..close.len() - 1];
        let averages = (
            indicators::trailing_sma(previous, SMA_FAST),
            indicators::trailing_sma(previous, SMA_SLOW),
            indicators::trailing_sma(close, SMA_FAST),
            indicators::trailing_sma(close, SMA_SLOW),
        );
        let (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) = averages else {
            return Signal::Hold;
        };

        let bias = if prev_fast <= prev_slow && fast > slow {
            Some((TradeDirection::Long, "Golden cross"))
        } else if prev_fast >= prev_slow && fast < slow {
            Some((TradeDirection::Short, "Death cross"))
        } else {
            None
        };
        follow_bias(window, bias)
    }
}

// ── Stochastic RSI ──

pub struct StochRsiReversal;

impl Strategy for StochRsiReversal {
    fn name(&self) -> &str {
        STOCH_RSI
    }

    fn evaluate(&self, window: &StrategyWindow<'_>) -> Signal {
        if let Some(exit) = risk_exit(window) {
            return exit;
        }
        let bias = indicators::stoch_rsi(window.close).and_then(|stoch| {
            if stoch < STOCH_OVERSOLD {
                Some((TradeDirection::Long, "StochRSI oversold"))
            } else if stoch > STOCH_OVERBOUGHT {
                Some((TradeDirection::Short, "StochRSI overbought"))
            } else {
                None
            }
        });
        follow_bias(window, bias)
    }
}

// ── Breakout ──

/// Trades a close outside the prior 20-bar range, in the breakout direction.
pub struct Breakout;

impl Strategy for Breakout {
    fn name(&self) -> &str {
        BREAKOUT
    }

    fn evaluate(&self, window: &StrategyWindow<'_>) -> Signal {
        if let Some(exit) = risk_exit(window) {
            return exit;
        }
        let close = window.close;
        if !indicators::is_breakout(close) {
            return Signal::Hold;
        }
        let prior = &close[close.len() - 1 - indicators::BREAKOUT_WINDOW..close.len() - 1];
        let Some((_, high)) = indicators::min_max(prior) else {
            return Signal::Hold;
        };
        let bias = if window.price() > high {
            (TradeDirection::Long, "Breakout above range")
        } else {
            (TradeDirection::Short, "Breakdown below range")
        };
        follow_bias(window, Some(bias))
    }
}

// ══════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════

/// Strategies available to the backtest, looked up by name.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(RsiReversal);
        registry.register(MacdCrossover);
        registry.register(SmaCrossover);
        registry.register(StochRsiReversal);
        registry.register(Breakout);
        registry
    }

    /// Add a strategy, replacing any existing one with the same name.
    pub fn register(&mut self, strategy: impl Strategy + 'static) {
        self.strategies
            .retain(|s| !s.name().eq_ignore_ascii_case(strategy.name()));
        self.strategies.push(Box::new(strategy));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&dyn Strategy> {
        self.strategies
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
            .map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve selected names in order. Unknown names and duplicates are skipped.
    pub fn select(&self, names: &[String]) -> Vec<&dyn Strategy> {
        let mut selected: Vec<&dyn Strategy> = Vec::with_capacity(names.len());
        for name in names {
            match self.get(name) {
                Some(strategy) => {
                    if !selected.iter().any(|s| s.name() == strategy.name()) {
                        selected.push(strategy);
                    }
                }
                None => warn!("Unknown strategy '{}' skipped", name),
            }
        }
        selected
    }
}
