use std::collections::BTreeMap;

use statrs::statistics::Statistics;

use crate::models::indicators::{CandlePattern, Crossover, MacdSnapshot, RangeState};

/// Deltas used by RSI (computed over `RSI_PERIOD + 1` closes).
pub const RSI_PERIOD: usize = 14;
/// Trailing closes inspected by Stochastic RSI.
pub const STOCH_RSI_LOOKBACK: usize = 34;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
/// Trailing closes fed into the MACD EMAs.
pub const MACD_WINDOW: usize = 35;
pub const FIB_RETRACEMENTS: [f64; 7] = [0.0, 23.6, 38.2, 50.0, 61.8, 78.6, 100.0];
pub const MOMENTUM_PERIOD: usize = 10;
pub const VOLATILITY_WINDOW: usize = 20;
pub const BREAKOUT_WINDOW: usize = 20;
pub const BREAKOUT_MARGIN: f64 = 0.01;
pub const VOLUME_SPIKE_WINDOW: usize = 20;
pub const VOLUME_SPIKE_FACTOR: f64 = 1.5;
pub const RANGE_STATE_WINDOW: usize = 30;
pub const RANGE_STATE_LOCAL: usize = 10;
const DOJI_THRESHOLD: f64 = 0.001;

/// Last `n` elements of a slice (the whole slice when shorter).
fn tail(data: &[f64], n: usize) -> &[f64] {
    &data[data.len().saturating_sub(n)..]
}

/// (min, max) of a slice, `None` when empty.
pub fn min_max(data: &[f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

// ── SMA ──

/// Average of the last `period` values, or of all values when fewer exist.
/// `None` only for an empty slice.
pub fn trailing_sma(data: &[f64], period: usize) -> Option<f64> {
    let window = tail(data, period);
    if window.is_empty() || period == 0 {
        return None;
    }
    Some(mean(window))
}

// ── EMA ──

/// Exponential Moving Average with `k = 2/(period+1)`, seeded with the first
/// value. Same length as the input, no warm-up gap.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(data.len());
    let Some(&first) = data.first() else {
        return result;
    };
    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = first;
    result.push(prev);
    for &value in &data[1..] {
        prev = value * k + prev * (1.0 - k);
        result.push(prev);
    }
    result
}

// ── RSI ──

/// RSI of the latest close over the last `RSI_PERIOD` deltas.
/// Returns 100 when there were no losses.
pub fn rsi(close: &[f64]) -> Option<f64> {
    if close.len() < RSI_PERIOD + 1 {
        return None;
    }
    let window = tail(close, RSI_PERIOD + 1);
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let avg_gain = gains / RSI_PERIOD as f64;
    let avg_loss = losses / RSI_PERIOD as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let value = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
    Some(value.clamp(0.0, 100.0))
}

// ── Stochastic RSI ──

/// Latest RSI normalized against the min/max of the rolling RSI series over
/// the last `STOCH_RSI_LOOKBACK` closes. A flat RSI series maps to 50.
pub fn stoch_rsi(close: &[f64]) -> Option<f64> {
    if close.len() < STOCH_RSI_LOOKBACK {
        return None;
    }
    let window = tail(close, STOCH_RSI_LOOKBACK);
    let series: Vec<f64> = (RSI_PERIOD + 1..=window.len())
        .filter_map(|end| rsi(&window[..end]))
        .collect();
    let latest = *series.last()?;
    let (lowest, highest) = min_max(&series)?;
    let range = highest - lowest;
    if range == 0.0 {
        return Some(50.0);
    }
    Some((latest - lowest) / range * 100.0)
}

// ── MACD ──

/// MACD and signal lines over the last `MACD_WINDOW` closes.
/// Needs at least `MACD_SLOW` closes.
pub fn macd_lines(close: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
    if close.len() < MACD_SLOW {
        return None;
    }
    let window = tail(close, MACD_WINDOW);
    let fast = ema(window, MACD_FAST);
    let slow = ema(window, MACD_SLOW);
    let macd_line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, MACD_SIGNAL);
    Some((macd_line, signal_line))
}

/// MACD snapshot of the latest close, with crossover detection on the last
/// two points.
pub fn macd(close: &[f64]) -> Option<MacdSnapshot> {
    let (macd_line, signal_line) = macd_lines(close)?;
    let n = macd_line.len();
    if n < 2 {
        return None;
    }
    let (prev_macd, last_macd) = (macd_line[n - 2], macd_line[n - 1]);
    let (prev_signal, last_signal) = (signal_line[n - 2], signal_line[n - 1]);

    let crossover = if prev_macd <= prev_signal && last_macd > last_signal {
        Some(Crossover::Bullish)
    } else if prev_macd >= prev_signal && last_macd < last_signal {
        Some(Crossover::Bearish)
    } else {
        None
    };

    Some(MacdSnapshot {
        macd: last_macd,
        signal: last_signal,
        histogram: last_macd - last_signal,
        is_rising: last_macd > prev_macd,
        crossover,
    })
}

// ── Fibonacci ──

/// Retracement levels measured down from the window high, keyed by percent.
pub fn fibonacci_levels(close: &[f64]) -> Option<BTreeMap<String, f64>> {
    let (low, high) = min_max(close)?;
    let range = high - low;
    Some(
        FIB_RETRACEMENTS
            .iter()
            .map(|&pct| (format!("{}", pct), high - range * pct / 100.0))
            .collect(),
    )
}

// ── Range position ──

/// Where the latest close sits inside the window range, 0 (low) to 100 (high).
pub fn range_position(close: &[f64]) -> Option<f64> {
    let (low, high) = min_max(close)?;
    let latest = *close.last()?;
    let range = high - low;
    if range == 0.0 {
        return None;
    }
    Some((latest - low) / range * 100.0)
}

// ── Candle pattern ──

pub fn candle_pattern(close: &[f64]) -> Option<CandlePattern> {
    if close.len() < 2 {
        return None;
    }
    let diff = close[close.len() - 1] - close[close.len() - 2];
    Some(if diff.abs() < DOJI_THRESHOLD {
        CandlePattern::Doji
    } else if diff > 0.0 {
        CandlePattern::BullishClose
    } else {
        CandlePattern::BearishClose
    })
}

// ── VWAP ──

/// Cumulative Volume Weighted Average Price over the whole window.
/// Requires index-aligned volumes.
pub fn vwap(close: &[f64], volume: &[f64]) -> Option<f64> {
    if close.is_empty() || close.len() != volume.len() {
        return None;
    }
    let cum_vol: f64 = volume.iter().sum();
    if cum_vol == 0.0 {
        return None;
    }
    let cum_pv: f64 = close.iter().zip(volume).map(|(p, v)| p * v).sum();
    Some(cum_pv / cum_vol)
}

// ── Momentum ──

/// `close[-1] - close[-10]`.
pub fn momentum(close: &[f64]) -> Option<f64> {
    if close.len() < MOMENTUM_PERIOD {
        return None;
    }
    Some(close[close.len() - 1] - close[close.len() - MOMENTUM_PERIOD])
}

// ── Volatility ──

/// Sample standard deviation of percent returns over the trailing window.
pub fn volatility(close: &[f64]) -> Option<f64> {
    let window = tail(close, VOLATILITY_WINDOW);
    let returns: Vec<f64> = window
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| (pair[1] - pair[0]) / pair[0] * 100.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }
    let std_dev = returns.iter().std_dev();
    std_dev.is_finite().then_some(std_dev)
}

// ── Breakout / volume ──

/// Latest close more than 1% beyond the high or low of the previous 20 closes.
pub fn is_breakout(close: &[f64]) -> bool {
    if close.len() < BREAKOUT_WINDOW + 1 {
        return false;
    }
    let latest = close[close.len() - 1];
    let prior = &close[close.len() - 1 - BREAKOUT_WINDOW..close.len() - 1];
    let Some((low, high)) = min_max(prior) else {
        return false;
    };
    latest > high * (1.0 + BREAKOUT_MARGIN) || latest < low * (1.0 - BREAKOUT_MARGIN)
}

/// Latest volume above 1.5× the average of the 19 volumes before it.
pub fn is_volume_spike(volume: &[f64]) -> bool {
    if volume.len() < VOLUME_SPIKE_WINDOW {
        return false;
    }
    let latest = volume[volume.len() - 1];
    let prior = &volume[volume.len() - VOLUME_SPIKE_WINDOW..volume.len() - 1];
    latest > VOLUME_SPIKE_FACTOR * mean(prior)
}

/// Latest volume above the trailing 20-volume average.
pub fn has_volume_support(volume: &[f64]) -> bool {
    let Some(&latest) = volume.last() else {
        return false;
    };
    trailing_sma(volume, VOLUME_SPIKE_WINDOW).is_some_and(|avg| latest > avg)
}

// ── Trend duration ──

/// Length of the declining run ending at the latest close
/// (consecutive strictly lower closes, walking backwards).
pub fn trend_duration(close: &[f64]) -> usize {
    close
        .windows(2)
        .rev()
        .take_while(|pair| pair[1] < pair[0])
        .count()
}

// ── Range state ──

/// Compares the average 10-point high/low range of the two halves of the
/// trailing 30 closes.
pub fn range_state(close: &[f64]) -> RangeState {
    if close.len() < RANGE_STATE_WINDOW {
        return RangeState::Stable;
    }
    let window = tail(close, RANGE_STATE_WINDOW);
    let (first, second) = window.split_at(RANGE_STATE_WINDOW / 2);
    let first_avg = average_local_range(first);
    let second_avg = average_local_range(second);

    if second_avg > first_avg * 1.2 {
        RangeState::Expanding
    } else if second_avg < first_avg * 0.8 {
        RangeState::Contracting
    } else {
        RangeState::Stable
    }
}

fn average_local_range(data: &[f64]) -> f64 {
    let ranges: Vec<f64> = data
        .windows(RANGE_STATE_LOCAL.min(data.len()).max(1))
        .filter_map(min_max)
        .map(|(low, high)| high - low)
        .collect();
    if ranges.is_empty() {
        return 0.0;
    }
    mean(&ranges)
}

// ══════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════
