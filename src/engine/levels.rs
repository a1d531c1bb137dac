use std::cmp::Ordering;

use tracing::warn;

use crate::models::levels::SupportResistance;
use crate::models::series::{PricePoint, VolumePoint};

/// Relative distance under which a price joins an existing cluster.
const CLUSTER_TOLERANCE: f64 = 0.02;
const STRONG_ZONES: usize = 12;
const WEAK_ZONES: usize = 8;
const MAX_STRONG_LEVELS: usize = 3;

/// A price cluster keyed by the first price that opened it.
#[derive(Debug, Clone, Copy)]
struct Cluster {
    key: f64,
    total_volume: f64,
    count: usize,
}

impl Cluster {
    fn avg_volume(&self) -> f64 {
        self.total_volume / self.count as f64
    }
}

/// Exact matches always join; otherwise within 2% of a non-zero key.
fn joins_cluster(price: f64, key: f64) -> bool {
    price == key || (key != 0.0 && ((price - key) / key).abs() <= CLUSTER_TOLERANCE)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Detect support and resistance levels from volume-weighted price clusters.
///
/// Prices are rounded to cents and merged into the first existing cluster
/// within 2% of its key. Clusters are ranked by average volume; the top 12
/// are strong candidates and the next 8 weak ones. Each set is split at the
/// midpoint of the overall price range.
pub fn detect_support_resistance(
    prices: &[PricePoint],
    volumes: &[VolumePoint],
) -> SupportResistance {
    if prices.is_empty() {
        return SupportResistance::default();
    }

    let aligned = volumes.len() == prices.len();
    if !aligned && !volumes.is_empty() {
        warn!(
            "Ignoring volume series for levels: {} volumes for {} prices",
            volumes.len(),
            prices.len()
        );
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    for (i, point) in prices.iter().enumerate() {
        let price = round_cents(point.price);
        let volume = if aligned { volumes[i].volume } else { 0.0 };

        let existing = clusters.iter_mut().find(|c| joins_cluster(price, c.key));
        match existing {
            Some(cluster) => {
                cluster.total_volume += volume;
                cluster.count += 1;
            }
            None => clusters.push(Cluster {
                key: price,
                total_volume: volume,
                count: 1,
            }),
        }
    }

    // Stable sort keeps first-seen order between equal volumes
    clusters.sort_by(|a, b| {
        b.avg_volume()
            .partial_cmp(&a.avg_volume())
            .unwrap_or(Ordering::Equal)
    });

    let (low, high) = prices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.price), hi.max(p.price))
    });
    let midpoint = (high + low) / 2.0;

    let strong: Vec<f64> = clusters.iter().take(STRONG_ZONES).map(|c| c.key).collect();
    let weak: Vec<f64> = clusters
        .iter()
        .skip(STRONG_ZONES)
        .take(WEAK_ZONES)
        .map(|c| c.key)
        .collect();

    let (mut support_levels, mut resistance_levels) = split_at_midpoint(&strong, midpoint);
    support_levels.truncate(MAX_STRONG_LEVELS);
    resistance_levels.truncate(MAX_STRONG_LEVELS);
    let (weak_support, weak_resistance) = split_at_midpoint(&weak, midpoint);

    SupportResistance {
        support_levels,
        resistance_levels,
        weak_support,
        weak_resistance,
    }
}

/// Levels below the midpoint (descending) and at or above it (ascending).
fn split_at_midpoint(levels: &[f64], midpoint: f64) -> (Vec<f64>, Vec<f64>) {
    let mut support: Vec<f64> = levels.iter().copied().filter(|&l| l < midpoint).collect();
    let mut resistance: Vec<f64> = levels.iter().copied().filter(|&l| l >= midpoint).collect();
    support.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    resistance.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    (
        support.into_iter().map(round_cents).collect(),
        resistance.into_iter().map(round_cents).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn series(pairs: &[(f64, f64)]) -> (Vec<PricePoint>, Vec<VolumePoint>) {
        let prices = pairs
            .iter()
            .enumerate()
            .map(|(i, &(p, _))| PricePoint::new(i as i64, p))
            .collect();
        let volumes = pairs
            .iter()
            .enumerate()
            .map(|(i, &(_, v))| VolumePoint::new(i as i64, v))
            .collect();
        (prices, volumes)
    }

    #[test]
    fn test_empty_input() {
        let result = detect_support_resistance(&[], &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_clusters_merge_within_tolerance() {
        // 100 and 101.5 merge (1.5%), 110 opens a new cluster
        let (prices, volumes) = series(&[(100.0, 10.0), (101.5, 30.0), (110.0, 5.0)]);
        let result = detect_support_resistance(&prices, &volumes);
        // midpoint = 105
        assert_eq!(result.support_levels, vec![100.0]);
        assert_eq!(result.resistance_levels, vec![110.0]);
    }

    #[test]
    fn test_first_match_wins_not_nearest() {
        // 101.8 is within 2% of both 100 and 103.5, but 100 was created first
        let (prices, volumes) =
            series(&[(100.0, 1.0), (103.5, 1.0), (101.8, 100.0), (150.0, 1.0)]);
        let result = detect_support_resistance(&prices, &volumes);
        // cluster 100: avg (1+100)/2 = 50.5, ranked first
        assert_eq!(result.support_levels, vec![103.5, 100.0]);
    }

    #[test]
    fn test_zero_prices_share_a_cluster() {
        let (prices, volumes) = series(&[(0.0, 5.0), (0.0, 5.0), (0.0, 5.0), (100.0, 1.0)]);
        let result = detect_support_resistance(&prices, &volumes);
        assert_eq!(result.support_levels, vec![0.0]);
        assert_eq!(result.resistance_levels, vec![100.0]);
        assert!(result.weak_support.is_empty());
    }

    #[test]
    fn test_misaligned_volumes_are_ignored() {
        // 14 separated clusters: with equal volume the last two are weak
        let pairs: Vec<(f64, f64)> = (0..14).map(|i| (100.0 * 1.05f64.powi(i), 1.0)).collect();
        let (prices, _) = series(&pairs);
        // Paired by index, the spike would promote cluster 12 to strong
        let short_volumes: Vec<VolumePoint> = (0..13)
            .map(|i| VolumePoint::new(i as i64, if i == 12 { 9_000.0 } else { 0.0 }))
            .collect();

        let misaligned = detect_support_resistance(&prices, &short_volumes);
        let without = detect_support_resistance(&prices, &[]);
        assert_eq!(misaligned, without);

        let weak: Vec<f64> = without
            .weak_support
            .iter()
            .chain(&without.weak_resistance)
            .copied()
            .collect();
        assert!(weak.contains(&round_cents(100.0 * 1.05f64.powi(12))));
    }

    #[test]
    fn test_strong_levels_truncated_to_three() {
        // Ten well separated prices below and above the midpoint
        let mut pairs = Vec::new();
        for i in 0..10 {
            pairs.push((100.0 + i as f64 * 10.0, 1000.0 - i as f64));
        }
        let (prices, volumes) = series(&pairs);
        let result = detect_support_resistance(&prices, &volumes);
        assert!(result.support_levels.len() <= 3);
        assert!(result.resistance_levels.len() <= 3);
    }

    #[test]
    fn test_weak_levels_from_ranks_13_to_20() {
        // 25 separated clusters with descending volume
        let pairs: Vec<(f64, f64)> = (0..25)
            .map(|i| (100.0 * 1.05f64.powi(i), 1000.0 - i as f64))
            .collect();
        let (prices, volumes) = series(&pairs);
        let result = detect_support_resistance(&prices, &volumes);
        assert_eq!(result.weak_support.len() + result.weak_resistance.len(), 8);
    }

    #[test]
    fn test_ordering_property_on_random_walks() {
        for seed in 0..50u64 {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let mut price = 1000.0;
            let pairs: Vec<(f64, f64)> = (0..200)
                .map(|_| {
                    price *= 1.0 + rng.gen_range(-0.04..0.04);
                    (price, rng.gen_range(1.0..5000.0))
                })
                .collect();
            let (prices, volumes) = series(&pairs);
            let result = detect_support_resistance(&prices, &volumes);

            let low = prices.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
            let high = prices.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
            let midpoint = (low + high) / 2.0;

            assert!(result.support_levels.len() <= 3);
            assert!(result.resistance_levels.len() <= 3);
            // Rounding to cents can move a level by at most half a cent
            for level in result.support_levels.iter().chain(&result.weak_support) {
                assert!(*level <= midpoint + 0.005, "support {} > mid {}", level, midpoint);
            }
            for level in result.resistance_levels.iter().chain(&result.weak_resistance) {
                assert!(*level >= midpoint - 0.005, "resistance {} < mid {}", level, midpoint);
            }
            for pair in result.support_levels.windows(2) {
                assert!(pair[0] >= pair[1]);
            }
            for pair in result.resistance_levels.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
        }
    }
}
