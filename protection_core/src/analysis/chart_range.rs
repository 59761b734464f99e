//! Chart Range Estimation
//!
//! Log-log axis bounds covering every device curve, halved on the low side
//! and doubled on the high side, then clamped to fixed absolute limits:
//!
//! ```text
//! x_min = max(10,     min current × 0.5)    x_max = min(100000, max current × 2)
//! y_min = max(0.01,   min time × 0.5)       y_max = min(100,    max time × 2)
//! ```
//!
//! Used only for plot scaling, never for analysis.

use serde::{Deserialize, Serialize};

use super::curve_points::{CurvePoint, CurvePointGenerator};
use crate::curves::FuseCurveStore;
use crate::device::Device;

const LOW_PADDING: f64 = 0.5;
const HIGH_PADDING: f64 = 2.0;
const X_FLOOR_A: f64 = 10.0;
const X_CEILING_A: f64 = 100_000.0;
const Y_FLOOR_S: f64 = 0.01;
const Y_CEILING_S: f64 = 100.0;

/// Axis bounds for a time-current plot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartRanges {
    /// Current axis minimum (A)
    pub x_min: f64,
    /// Current axis maximum (A)
    pub x_max: f64,
    /// Time axis minimum (s)
    pub y_min: f64,
    /// Time axis maximum (s)
    pub y_max: f64,
}

impl Default for ChartRanges {
    fn default() -> Self {
        ChartRanges {
            x_min: 10.0,
            x_max: 10_000.0,
            y_min: 0.01,
            y_max: 10.0,
        }
    }
}

impl ChartRanges {
    /// Padded, clamped bounds over `points`; `None` when there are no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a CurvePoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = (first.current_a, first.current_a, first.time_s, first.time_s);
        let (x_lo, x_hi, y_lo, y_hi) = iter.fold(init, |(x_lo, x_hi, y_lo, y_hi), p| {
            (
                x_lo.min(p.current_a),
                x_hi.max(p.current_a),
                y_lo.min(p.time_s),
                y_hi.max(p.time_s),
            )
        });

        Some(ChartRanges {
            x_min: X_FLOOR_A.max(x_lo * LOW_PADDING),
            x_max: X_CEILING_A.min(x_hi * HIGH_PADDING),
            y_min: Y_FLOOR_S.max(y_lo * LOW_PADDING),
            y_max: Y_CEILING_S.min(y_hi * HIGH_PADDING),
        })
    }

    /// True if the point lies inside the bounds (inclusive)
    pub fn contains(&self, point: &CurvePoint) -> bool {
        (self.x_min..=self.x_max).contains(&point.current_a) && (self.y_min..=self.y_max).contains(&point.time_s)
    }
}

/// Caches the last computed ranges until invalidated.
#[derive(Debug, Clone, Default)]
pub struct ChartRangeEstimator {
    cached: Option<ChartRanges>,
}

impl ChartRangeEstimator {
    /// Create an estimator with nothing cached
    pub fn new() -> Self {
        ChartRangeEstimator::default()
    }

    /// Ranges for `devices`, reusing the cached value when present.
    ///
    /// Curve points come from `generator`, which generates any that are
    /// missing. With no devices, or no plottable points, the default ranges
    /// are returned.
    pub fn estimate(
        &mut self,
        devices: &[Device],
        generator: &mut CurvePointGenerator,
        store: &dyn FuseCurveStore,
    ) -> ChartRanges {
        if let Some(ranges) = self.cached {
            return ranges;
        }

        let ranges = if devices.is_empty() {
            ChartRanges::default()
        } else {
            let mut points = Vec::new();
            for device in devices {
                points.extend_from_slice(generator.points_for(device, store));
            }
            ChartRanges::from_points(&points).unwrap_or_default()
        };

        tracing::debug!(?ranges, "chart ranges recomputed");
        self.cached = Some(ranges);
        ranges
    }

    /// Forget the cached ranges
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// True if a value is cached
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::curve_points::generate_points;
    use crate::curves::{ReferenceFuseStore, StandardCurve};

    fn store() -> &'static ReferenceFuseStore {
        ReferenceFuseStore::builtin()
    }

    fn estimate(devices: &[Device]) -> ChartRanges {
        let mut generator = CurvePointGenerator::new();
        ChartRangeEstimator::new().estimate(devices, &mut generator, store())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * a.abs().max(1.0)
    }

    fn base_relay() -> Device {
        Device::relay("R1", 100.0, 0.5, StandardCurve::IecStandardInverse).unwrap()
    }

    #[test]
    fn test_no_devices_gives_default() {
        assert_eq!(estimate(&[]), ChartRanges::default());
        assert_eq!(
            ChartRanges::default(),
            ChartRanges { x_min: 10.0, x_max: 10_000.0, y_min: 0.01, y_max: 10.0 }
        );
    }

    #[test]
    fn test_padding_and_clamps() {
        let points = [
            CurvePoint { current_a: 200.0, time_s: 3.0 },
            CurvePoint { current_a: 4000.0, time_s: 0.4 },
        ];
        let ranges = ChartRanges::from_points(&points).unwrap();
        assert_eq!(ranges, ChartRanges { x_min: 100.0, x_max: 8000.0, y_min: 0.2, y_max: 6.0 });

        let wide = [
            CurvePoint { current_a: 12.0, time_s: 0.015 },
            CurvePoint { current_a: 90_000.0, time_s: 80.0 },
        ];
        let ranges = ChartRanges::from_points(&wide).unwrap();
        assert_eq!(ranges, ChartRanges { x_min: 10.0, x_max: 100_000.0, y_min: 0.01, y_max: 100.0 });
    }

    #[test]
    fn test_single_relay_ranges() {
        let ranges = estimate(&[base_relay()]);
        // Lowest plotted point is 1.11x pickup; highest current is 50000x
        assert!(close(ranges.x_min, 55.5));
        assert_eq!(ranges.x_max, 100_000.0);
        // Fastest time is at 50000x: 0.07 / (50000^0.02 − 1)
        let fastest = 0.07 / (50_000f64.powf(0.02) - 1.0);
        assert!(close(ranges.y_min, fastest * 0.5));
    }

    #[test]
    fn test_device_inside_range_leaves_ranges_unchanged() {
        // 30.3..40000 A and 0.1..5 s, no clamp in play
        let base = vec![
            Device::definite_time("DT1", 40.0, 0.1).unwrap(),
            Device::definite_time("DT2", 30.0, 5.0).unwrap(),
        ];
        let before = estimate(&base);
        assert!(close(before.x_min, 15.15));
        assert!(close(before.x_max, 80_000.0));
        assert!(close(before.y_min, 0.05));
        assert!(close(before.y_max, 10.0));

        // Every point of this ladder lies within the range above
        let inside = Device::definite_time("DT3", 35.0, 1.0).unwrap();
        for p in generate_points(&inside, store()) {
            assert!(before.contains(&p));
        }
        let mut extended = base.clone();
        extended.push(inside);
        assert_eq!(estimate(&extended), before);
    }

    #[test]
    fn test_device_outside_range_expands_only_affected_bound() {
        let before = estimate(&[base_relay()]);
        let faster = Device::definite_time("DT", 200.0, 0.1).unwrap();
        let after = estimate(&[base_relay(), faster]);
        assert!(close(after.y_min, 0.05));
        assert_eq!(after.x_min, before.x_min);
        assert_eq!(after.x_max, before.x_max);
        assert_eq!(after.y_max, before.y_max);
    }

    #[test]
    fn test_estimator_caches_until_invalidated() {
        let mut generator = CurvePointGenerator::new();
        let mut estimator = ChartRangeEstimator::new();
        let first = estimator.estimate(&[base_relay()], &mut generator, store());
        assert!(estimator.is_cached());

        // Cached value is served even for a different device set
        let stale = estimator.estimate(&[], &mut generator, store());
        assert_eq!(stale, first);

        estimator.invalidate();
        assert_eq!(estimator.estimate(&[], &mut generator, store()), ChartRanges::default());
    }

    #[test]
    fn test_contains() {
        let ranges = ChartRanges::default();
        assert!(ranges.contains(&CurvePoint { current_a: 100.0, time_s: 1.0 }));
        assert!(!ranges.contains(&CurvePoint { current_a: 5.0, time_s: 1.0 }));
    }
}
