use serde::{Deserialize, Serialize};

/// Volume-ranked price levels around the midpoint of the observed range.
///
/// `support_levels` are ordered nearest-to-midpoint first (descending),
/// `resistance_levels` ascending. Strong sides hold at most three levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub weak_support: Vec<f64>,
    pub weak_resistance: Vec<f64>,
}

impl SupportResistance {
    pub fn is_empty(&self) -> bool {
        self.support_levels.is_empty()
            && self.resistance_levels.is_empty()
            && self.weak_support.is_empty()
            && self.weak_resistance.is_empty()
    }
}
