use tracing::warn;

use crate::models::indicators::{
    Confidence, Crossover, IndicatorsResult, MacdSnapshot, SmaSnapshot, StochRsiFlip, TrendBias,
};
use crate::models::series::{closes, PricePoint, VolumePoint};

use super::indicators;

const STOCH_RSI_OVERSOLD: f64 = 20.0;
const STOCH_RSI_OVERBOUGHT: f64 = 80.0;

/// Compute the technical snapshot for the latest point of a price series.
///
/// Volumes are optional; when supplied they must be index-aligned with the
/// prices, otherwise every volume-based field is left at its empty value.
pub fn calculate_indicators(prices: &[PricePoint], volumes: &[VolumePoint]) -> IndicatorsResult {
    let close = closes(prices);
    let volume: Vec<f64> = if volumes.len() == prices.len() {
        volumes.iter().map(|v| v.volume).collect()
    } else {
        if !volumes.is_empty() {
            warn!(
                "Ignoring volume series: {} volumes for {} prices",
                volumes.len(),
                prices.len()
            );
        }
        Vec::new()
    };
    indicators_from_series(&close, &volume)
}

/// Same as [`calculate_indicators`] on bare close/volume columns.
/// An empty `volume` slice disables the volume-based fields.
pub fn indicators_from_series(close: &[f64], volume: &[f64]) -> IndicatorsResult {
    if close.is_empty() {
        return IndicatorsResult::default();
    }
    let volume = if volume.len() == close.len() { volume } else { &[] };

    let rsi = indicators::rsi(close);
    let stoch_rsi = indicators::stoch_rsi(close);
    let macd = indicators::macd(close);
    let sma = sma_snapshot(close);
    let trend_bias = sma.as_ref().map(classify_trend);
    let stoch_rsi_flip = stoch_rsi.and_then(|latest| {
        let previous = indicators::stoch_rsi(&close[..close.len() - 1])?;
        stoch_rsi_flip(previous, latest)
    });
    let volume_support = indicators::has_volume_support(volume);
    let confidence = confidence_score(rsi, stoch_rsi, macd.as_ref(), sma.as_ref(), volume_support);

    IndicatorsResult {
        rsi,
        stoch_rsi,
        macd,
        sma,
        fib_levels: indicators::fibonacci_levels(close),
        trend_bias,
        range_position: indicators::range_position(close),
        volatility: indicators::volatility(close),
        stoch_rsi_flip,
        confidence,
        candle_pattern: indicators::candle_pattern(close),
        vwap: indicators::vwap(close, volume),
        momentum: indicators::momentum(close),
        is_breakout: indicators::is_breakout(close),
        is_volume_spike: indicators::is_volume_spike(volume),
        trend_duration: indicators::trend_duration(close),
        range_state: indicators::range_state(close),
    }
}

fn sma_snapshot(close: &[f64]) -> Option<SmaSnapshot> {
    let latest = *close.last()?;
    let sma20 = indicators::trailing_sma(close, 20)?;
    let sma50 = indicators::trailing_sma(close, 50)?;
    let sma200 = indicators::trailing_sma(close, 200)?;
    Some(SmaSnapshot {
        sma20,
        sma50,
        sma200,
        above_sma20: latest > sma20,
        above_sma50: latest > sma50,
        above_sma200: latest > sma200,
    })
}

fn classify_trend(sma: &SmaSnapshot) -> TrendBias {
    if sma.sma50 > sma.sma200 {
        TrendBias::Uptrend
    } else if sma.sma50 < sma.sma200 {
        TrendBias::Downtrend
    } else {
        TrendBias::Sideways
    }
}

fn stoch_rsi_flip(previous: f64, latest: f64) -> Option<StochRsiFlip> {
    if previous < STOCH_RSI_OVERSOLD && latest >= STOCH_RSI_OVERSOLD {
        Some(StochRsiFlip::Bullish)
    } else if previous > STOCH_RSI_OVERBOUGHT && latest <= STOCH_RSI_OVERBOUGHT {
        Some(StochRsiFlip::Bearish)
    } else {
        None
    }
}

/// Point score: histogram > 0 (+1), bullish crossover (+2), RSI in (50,70)
/// (+1), StochRSI > 50 (+1), volume support (+1), above SMA20 (+1).
/// 5+ is high, 3+ medium.
pub fn confidence_score(
    rsi: Option<f64>,
    stoch_rsi: Option<f64>,
    macd: Option<&MacdSnapshot>,
    sma: Option<&SmaSnapshot>,
    volume_support: bool,
) -> Confidence {
    let mut points = 0;
    if let Some(m) = macd {
        if m.histogram > 0.0 {
            points += 1;
        }
        if m.crossover == Some(Crossover::Bullish) {
            points += 2;
        }
    }
    if rsi.is_some_and(|r| r > 50.0 && r < 70.0) {
        points += 1;
    }
    if stoch_rsi.is_some_and(|s| s > 50.0) {
        points += 1;
    }
    if volume_support {
        points += 1;
    }
    if sma.is_some_and(|s| s.above_sma20) {
        points += 1;
    }

    match points {
        p if p >= 5 => Confidence::High,
        p if p >= 3 => Confidence::Medium,
        _ => Confidence::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::indicators::RangeState;

    fn series(prices: &[f64]) -> (Vec<PricePoint>, Vec<VolumePoint>) {
        let p = prices
            .iter()
            .enumerate()
            .map(|(i, &v)| PricePoint::new(i as i64, v))
            .collect();
        let v = (0..prices.len())
            .map(|i| VolumePoint::new(i as i64, 1000.0))
            .collect();
        (p, v)
    }

    fn zigzag(len: usize) -> Vec<f64> {
        let base = [100.0, 102.0, 98.0, 105.0, 110.0, 90.0];
        (0..len).map(|i| base[i % base.len()] + (i / base.len()) as f64).collect()
    }

    #[test]
    fn test_example_scenario() {
        let (prices, volumes) = series(&zigzag(36));
        let result = calculate_indicators(&prices, &volumes);

        let rsi = result.rsi.expect("rsi with 36 points");
        assert!((0.0..=100.0).contains(&rsi));
        assert!(result.sma.is_some());
        assert!(result.macd.is_some());
        assert!(result.stoch_rsi.is_some());
        assert!(result.vwap.is_some());
        assert!(!result.is_volume_spike, "constant volume never spikes");
        assert!(matches!(
            result.confidence,
            Confidence::Low | Confidence::Medium | Confidence::High
        ));
    }

    #[test]
    fn test_sma_averages_short_windows() {
        let (prices, volumes) = series(&[10.0, 20.0, 30.0]);
        let sma = calculate_indicators(&prices, &volumes).sma.unwrap();
        assert!((sma.sma20 - 20.0).abs() < 1e-10);
        assert!((sma.sma200 - 20.0).abs() < 1e-10);
        assert!(sma.above_sma20);
    }

    #[test]
    fn test_above_sma20_matches_comparison() {
        for len in 1..60 {
            let (prices, volumes) = series(&zigzag(len));
            let result = calculate_indicators(&prices, &volumes);
            let sma = result.sma.unwrap();
            let latest = prices.last().unwrap().price;
            assert_eq!(sma.above_sma20, latest > sma.sma20);
            assert_eq!(sma.above_sma50, latest > sma.sma50);
        }
    }

    #[test]
    fn test_minimal_data_returns_structure() {
        let (prices, volumes) = series(&[100.0]);
        let result = calculate_indicators(&prices, &volumes);
        assert!(result.rsi.is_none());
        assert!(result.macd.is_none());
        assert!(result.momentum.is_none());
        assert!(result.candle_pattern.is_none());
        assert_eq!(result.trend_bias, Some(TrendBias::Sideways));
        assert_eq!(result.range_state, RangeState::Stable);
        assert_eq!(result.confidence, Confidence::Low);

        let empty = calculate_indicators(&[], &[]);
        assert_eq!(empty, IndicatorsResult::default());
    }

    #[test]
    fn test_misaligned_volume_is_ignored() {
        let (prices, mut volumes) = series(&zigzag(30));
        volumes.pop();
        let result = calculate_indicators(&prices, &volumes);
        assert!(result.vwap.is_none());
        assert!(!result.is_volume_spike);
        assert!(result.rsi.is_some());
    }

    #[test]
    fn test_trend_bias_uptrend() {
        let prices: Vec<f64> = (0..250).map(|i| 100.0 + i as f64).collect();
        let (p, v) = series(&prices);
        let result = calculate_indicators(&p, &v);
        assert_eq!(result.trend_bias, Some(TrendBias::Uptrend));
        assert_eq!(result.trend_duration, 0);
    }

    #[test]
    fn test_confidence_levels() {
        let macd = MacdSnapshot {
            macd: 1.0,
            signal: 0.5,
            histogram: 0.5,
            is_rising: true,
            crossover: Some(Crossover::Bullish),
        };
        let sma = SmaSnapshot {
            sma20: 1.0,
            sma50: 1.0,
            sma200: 1.0,
            above_sma20: true,
            above_sma50: true,
            above_sma200: true,
        };
        assert_eq!(
            confidence_score(Some(60.0), Some(70.0), Some(&macd), Some(&sma), true),
            Confidence::High
        );
        // histogram (+1) + crossover (+2)
        assert_eq!(
            confidence_score(Some(80.0), Some(10.0), Some(&macd), None, false),
            Confidence::Medium
        );
        assert_eq!(confidence_score(Some(60.0), None, None, None, false), Confidence::Low);
    }

    #[test]
    fn test_stoch_rsi_flip() {
        assert_eq!(stoch_rsi_flip(10.0, 25.0), Some(StochRsiFlip::Bullish));
        assert_eq!(stoch_rsi_flip(90.0, 75.0), Some(StochRsiFlip::Bearish));
        assert_eq!(stoch_rsi_flip(50.0, 60.0), None);
    }
}
