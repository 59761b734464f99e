//! # Time-Current Curves
//!
//! Operating-time model for overcurrent protection devices.
//!
//! Every device resolves to one [`CurveShape`]:
//!
//! - **Inverse**: analytic `t = a·TDS / (M^b − 1) + c·TDS`
//! - **Definite**: constant `t = TDS` above pickup
//! - **Tabulated**: log-log interpolation over a fuse table
//!
//! where `M` is the current as a multiple of pickup. At or below pickup
//! (`M <= 1`) a device never trips.
//!
//! ## Example
//!
//! ```rust
//! use protection_core::curves::{operating_time, OperatingTime, StandardCurve};
//! use protection_core::curves::fuse::ReferenceFuseStore;
//! use protection_core::device::Device;
//!
//! let relay = Device::relay("R1", 100.0, 0.5, StandardCurve::IecStandardInverse).unwrap();
//! let store = ReferenceFuseStore::builtin();
//!
//! let t = operating_time(&relay, 1000.0, store);
//! assert!((t.seconds().unwrap() - 1.486).abs() < 0.01);
//! assert_eq!(operating_time(&relay, 100.0, store), OperatingTime::NoTrip);
//! ```

pub mod fuse;
pub mod standard;

pub use fuse::{FuseCurve, FuseCurveStore, FusePoint, FuseSelection, ReferenceFuseStore};
pub use standard::{CurveConstants, StandardCurve};

use serde::{Deserialize, Serialize};

use crate::device::{CurveFamily, CurveKind, Device};

/// Outcome of evaluating a curve at one current.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "seconds", rename_all = "snake_case")]
pub enum OperatingTime {
    /// The device operates after this many seconds
    Trip(f64),
    /// Current at or below pickup: the device never operates
    NoTrip,
    /// No usable value (degenerate curve, missing fuse table)
    Undefined,
}

impl OperatingTime {
    /// Trip time in seconds, if the device operates
    pub fn seconds(&self) -> Option<f64> {
        match self {
            OperatingTime::Trip(t) => Some(*t),
            OperatingTime::NoTrip | OperatingTime::Undefined => None,
        }
    }

    /// Numeric form: `NoTrip` is +∞, `Undefined` is NaN
    pub fn as_f64(&self) -> f64 {
        match self {
            OperatingTime::Trip(t) => *t,
            OperatingTime::NoTrip => f64::INFINITY,
            OperatingTime::Undefined => f64::NAN,
        }
    }

    /// True for a trip time
    pub fn is_trip(&self) -> bool {
        matches!(self, OperatingTime::Trip(_))
    }

    /// True when no value could be computed
    pub fn is_undefined(&self) -> bool {
        matches!(self, OperatingTime::Undefined)
    }
}

/// A device characteristic resolved for evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveShape<'a> {
    /// Analytic inverse-time curve
    Inverse {
        constants: CurveConstants,
        time_dial: f64,
    },
    /// Constant operating time above pickup
    Definite { time_s: f64 },
    /// Tabulated fuse characteristic
    Tabulated(&'a FuseCurve),
}

impl CurveShape<'_> {
    /// Operating time at `multiple` times pickup.
    pub fn evaluate(&self, multiple: f64) -> OperatingTime {
        if !multiple.is_finite() {
            return OperatingTime::Undefined;
        }
        if multiple <= 1.0 {
            return OperatingTime::NoTrip;
        }
        match self {
            CurveShape::Inverse {
                constants,
                time_dial,
            } => inverse_time(constants, *time_dial, multiple),
            CurveShape::Definite { time_s } => OperatingTime::Trip(*time_s),
            CurveShape::Tabulated(curve) => curve.melting_time(multiple),
        }
    }
}

/// Analytic inverse-time evaluation for `multiple > 1`.
///
/// Near `M = 1` the denominator `M^b − 1` can round to zero or below; that
/// sample is `Undefined` rather than an error.
pub fn inverse_time(constants: &CurveConstants, time_dial: f64, multiple: f64) -> OperatingTime {
    let denominator = multiple.powf(constants.b) - 1.0;
    if !(denominator > 0.0) {
        return OperatingTime::Undefined;
    }
    let time = (constants.a * time_dial) / denominator + constants.c * time_dial;
    if time.is_finite() && time >= 0.0 {
        OperatingTime::Trip(time)
    } else {
        OperatingTime::Undefined
    }
}

/// Resolve a device to its curve shape.
///
/// Returns `None` when a fuse device's table is not in the store.
pub fn curve_shape<'s>(device: &Device, store: &'s dyn FuseCurveStore) -> Option<CurveShape<'s>> {
    if device.curve_kind() == CurveKind::Definite {
        return Some(CurveShape::Definite {
            time_s: device.time_dial(),
        });
    }
    match device.curve_family() {
        CurveFamily::Standard(curve) => Some(CurveShape::Inverse {
            constants: curve.constants(),
            time_dial: device.time_dial(),
        }),
        CurveFamily::Analytic(constants) => Some(CurveShape::Inverse {
            constants: *constants,
            time_dial: device.time_dial(),
        }),
        CurveFamily::Fuse(selection) => {
            let curve = store.lookup(selection);
            if curve.is_none() {
                tracing::warn!(device = device.name(), fuse = %selection, "fuse curve not found");
            }
            curve.map(CurveShape::Tabulated)
        }
    }
}

/// Operating time of `device` at `current_a` amps.
///
/// Pure over the device, the current and the read-only store.
pub fn operating_time(device: &Device, current_a: f64, store: &dyn FuseCurveStore) -> OperatingTime {
    let pickup = device.pickup_current_a();
    if !(pickup > 0.0) || !current_a.is_finite() {
        return OperatingTime::Undefined;
    }

    let multiple = current_a / pickup;
    if multiple <= 1.0 {
        return OperatingTime::NoTrip;
    }

    match curve_shape(device, store) {
        Some(shape) => shape.evaluate(multiple),
        None => OperatingTime::Undefined,
    }
}
