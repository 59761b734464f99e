//! Curve Point Generation
//!
//! Samples a device's time-current curve for plotting and range estimation.
//! The sampling ladder is fixed so plots and chart ranges are reproducible:
//!
//! - fine steps `1.01, 1.11, … 1.91` × pickup (10 points)
//! - medium steps `2.0, 2.5, … 10.0` × pickup (17 points)
//! - coarse steps `10, 20, 50, … 50000` × pickup (12 points)
//!
//! Points at or beyond [`MAX_PLOT_TIME_S`] are dropped. Definite-time devices
//! are sampled on [`DEFINITE_TIME_MULTIPLES`] instead, giving a flat line.
//!
//! Generated points are cached per device name in [`CurvePointGenerator`]
//! until the owner invalidates that entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::curves::{operating_time, FuseCurveStore};
use crate::device::Device;

/// Upper bound on plotted operating times (seconds, exclusive)
pub const MAX_PLOT_TIME_S: f64 = 100.0;

/// Sampling ladder for definite-time devices (multiples of pickup)
pub const DEFINITE_TIME_MULTIPLES: [f64; 18] = [
    1.01, 1.5, 2.0, 3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0, 50.0, 70.0, 100.0, 150.0, 200.0, 300.0, 500.0, 1000.0,
];

/// One point on a time-current curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Current in amps
    pub current_a: f64,
    /// Operating time in seconds
    pub time_s: f64,
}

/// A device's sampled curve, for rendering layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCurve {
    /// Device name
    pub name: String,
    /// Sampled points in ascending current
    pub points: Vec<CurvePoint>,
}

/// The 39 candidate multiples for inverse curves, in order.
pub fn sampling_multiples() -> Vec<f64> {
    let mut multiples = Vec::with_capacity(39);
    // Close to pickup
    multiples.extend((0..10).map(|i| 1.01 + i as f64 * 0.1));
    // Medium range
    multiples.extend((0..17).map(|i| 2.0 + i as f64 * 0.5));
    // High range, logarithmic
    for exponent in 1..=4 {
        let base = 10f64.powi(exponent);
        multiples.extend([base, 2.0 * base, 5.0 * base]);
    }
    multiples
}

/// Sample a device's curve without caching.
pub fn generate_points(device: &Device, store: &dyn FuseCurveStore) -> Vec<CurvePoint> {
    let pickup = device.pickup_current_a();

    if device.is_definite() {
        return DEFINITE_TIME_MULTIPLES
            .iter()
            .map(|multiple| CurvePoint {
                current_a: multiple * pickup,
                time_s: device.time_dial(),
            })
            .collect();
    }

    sampling_multiples()
        .into_iter()
        .filter_map(|multiple| {
            let current_a = multiple * pickup;
            let time_s = operating_time(device, current_a, store).seconds()?;
            (time_s > 0.0 && time_s < MAX_PLOT_TIME_S).then_some(CurvePoint { current_a, time_s })
        })
        .collect()
}

/// Operating point of `device` at each fault level, skipping levels where it
/// does not trip. Used to mark fault levels on a curve plot.
pub fn fault_points(device: &Device, fault_levels: &[f64], store: &dyn FuseCurveStore) -> Vec<CurvePoint> {
    fault_levels
        .iter()
        .filter_map(|&current_a| {
            let time_s = operating_time(device, current_a, store).seconds()?;
            (time_s > 0.0).then_some(CurvePoint { current_a, time_s })
        })
        .collect()
}

/// Memoizing curve sampler keyed by device name.
///
/// The cache is not self-invalidating: whoever mutates a device must call
/// [`invalidate`](Self::invalidate) for it before the next read.
#[derive(Debug, Clone, Default)]
pub struct CurvePointGenerator {
    cache: HashMap<String, Vec<CurvePoint>>,
}

impl CurvePointGenerator {
    /// Create an empty generator
    pub fn new() -> Self {
        CurvePointGenerator::default()
    }

    /// Curve points for `device`, generated on first request.
    pub fn points_for(&mut self, device: &Device, store: &dyn FuseCurveStore) -> &[CurvePoint] {
        self.cache
            .entry(device.name().to_string())
            .or_insert_with(|| {
                let points = generate_points(device, store);
                tracing::debug!(device = device.name(), points = points.len(), "generated curve points");
                points
            })
    }

    /// Drop the cached points for one device. Returns true if an entry existed.
    pub fn invalidate(&mut self, name: &str) -> bool {
        let removed = self.cache.remove(name).is_some();
        if removed {
            tracing::trace!(device = name, "curve cache entry invalidated");
        }
        removed
    }

    /// Drop every cached curve
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// True if points for `name` are cached
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Number of cached curves
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::{FuseSelection, ReferenceFuseStore, StandardCurve};

    fn store() -> &'static ReferenceFuseStore {
        ReferenceFuseStore::builtin()
    }

    fn relay(name: &str, tds: f64) -> Device {
        Device::relay(name, 100.0, tds, StandardCurve::IecStandardInverse).unwrap()
    }

    #[test]
    fn test_sampling_ladder() {
        let multiples = sampling_multiples();
        assert_eq!(multiples.len(), 39);
        assert_eq!(multiples[0], 1.01);
        assert!((multiples[9] - 1.91).abs() < 1e-12);
        assert_eq!(multiples[10], 2.0);
        assert_eq!(multiples[26], 10.0);
        assert_eq!(multiples[27], 10.0);
        assert_eq!(&multiples[36..], &[10000.0, 20000.0, 50000.0]);
    }

    #[test]
    fn test_points_filtered_to_plot_window() {
        let points = generate_points(&relay("R1", 0.5), store());
        assert!(!points.is_empty());
        assert!(points.len() < 39);
        for p in &points {
            assert!(p.time_s > 0.0 && p.time_s < MAX_PLOT_TIME_S);
            assert!(p.current_a > 100.0);
        }
        // 1.01x pickup is ~351 s on this curve and is dropped
        assert!(points[0].current_a > 101.0);
    }

    #[test]
    fn test_definite_time_is_flat_ladder() {
        let device = Device::definite_time("DT", 50.0, 0.25).unwrap();
        let points = generate_points(&device, store());
        assert_eq!(points.len(), DEFINITE_TIME_MULTIPLES.len());
        assert!(points.iter().all(|p| p.time_s == 0.25));
        assert_eq!(points.last().unwrap().current_a, 50_000.0);
    }

    #[test]
    fn test_fuse_curve_points() {
        let fuse = Device::fuse("F1", FuseSelection::new("CEF", 25.0, "ABB")).unwrap();
        let points = generate_points(&fuse, store());
        assert!(!points.is_empty());
        // Times fall as current rises
        assert!(points.windows(2).all(|w| w[1].time_s <= w[0].time_s));
    }

    #[test]
    fn test_missing_fuse_curve_yields_no_points() {
        let fuse = Device::fuse("F1", FuseSelection::new("CEF", 25.0, "Nobody")).unwrap();
        assert!(generate_points(&fuse, store()).is_empty());
    }

    #[test]
    fn test_cache_invalidation_is_per_device() {
        let mut generator = CurvePointGenerator::new();
        let mut r1 = relay("R1", 0.5);
        let r2 = relay("R2", 0.2);

        let r1_before = generator.points_for(&r1, store()).to_vec();
        let r2_before = generator.points_for(&r2, store()).to_vec();
        assert_eq!(generator.cached_len(), 2);

        r1.set_time_dial(1.0).unwrap();
        // Without invalidation the old snapshot is served
        assert_eq!(generator.points_for(&r1, store()), r1_before.as_slice());

        assert!(generator.invalidate("R1"));
        assert!(!generator.is_cached("R1"));
        assert!(generator.is_cached("R2"));

        let r1_after = generator.points_for(&r1, store()).to_vec();
        assert_ne!(r1_after, r1_before);
        assert_eq!(generator.points_for(&r2, store()), r2_before.as_slice());
    }

    #[test]
    fn test_fault_points_skip_non_tripping_levels() {
        let device = relay("R1", 0.5);
        let points = fault_points(&device, &[50.0, 1000.0, 5000.0], store());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].current_a, 1000.0);
    }
}
