use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single price sample. Serialized as `[timestamp_ms, price]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, f64)", into = "(i64, f64)")]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: f64,
}

/// A single volume sample, index-aligned with the price series it belongs to.
/// Serialized as `[timestamp_ms, volume]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, f64)", into = "(i64, f64)")]
pub struct VolumePoint {
    pub timestamp: i64,
    pub volume: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Timestamp as a UTC datetime, if it is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

impl VolumePoint {
    pub fn new(timestamp: i64, volume: f64) -> Self {
        Self { timestamp, volume }
    }
}

impl From<(i64, f64)> for PricePoint {
    fn from((timestamp, price): (i64, f64)) -> Self {
        Self { timestamp, price }
    }
}

impl From<PricePoint> for (i64, f64) {
    fn from(p: PricePoint) -> Self {
        (p.timestamp, p.price)
    }
}

impl From<(i64, f64)> for VolumePoint {
    fn from((timestamp, volume): (i64, f64)) -> Self {
        Self { timestamp, volume }
    }
}

impl From<VolumePoint> for (i64, f64) {
    fn from(v: VolumePoint) -> Self {
        (v.timestamp, v.volume)
    }
}

/// Price and volume history for one asset, ascending by timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<PricePoint>,
    #[serde(default)]
    pub volumes: Vec<VolumePoint>,
}

impl MarketChart {
    pub fn closes(&self) -> Vec<f64> {
        closes(&self.prices)
    }

    /// True when volumes can be used index-for-index alongside prices.
    pub fn volumes_aligned(&self) -> bool {
        !self.volumes.is_empty() && self.volumes.len() == self.prices.len()
    }
}

/// Extract the price column of a series.
pub fn closes(prices: &[PricePoint]) -> Vec<f64> {
    prices.iter().map(|p| p.price).collect()
}
