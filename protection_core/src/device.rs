//! # Protection Devices
//!
//! A [`Device`] is one overcurrent protection element in a coordination
//! chain: a relay with an analytic curve, a definite-time element, or a fuse
//! with a tabulated characteristic.
//!
//! Devices are always valid: the constructors, setters and the serde
//! conversion reject non-positive pickup currents and time dials and
//! mismatched kind/family combinations, leaving an existing device
//! unchanged on error.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "name": "Feeder relay",
//!   "kind": "relay",
//!   "pickup_current_a": 400.0,
//!   "time_dial": 0.3,
//!   "curve_family": "IEC-SI",
//!   "curve_kind": "inverse"
//! }
//! ```
//!
//! Fuses name a tabulated curve and default their pickup to the rating:
//!
//! ```json
//! {
//!   "name": "Transformer fuse",
//!   "kind": "fuse",
//!   "curve_family": { "fuse_type": "CEF", "rating_a": 63.0, "manufacturer": "ABB" }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::curves::fuse::RATING_TOLERANCE_A;
use crate::curves::{CurveConstants, FuseSelection, StandardCurve};
use crate::errors::{ProtectionError, ProtectionResult};

/// Kind of protection device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Overcurrent relay (analytic curve)
    Relay,
    /// Fuse or breaker (tabulated curve)
    Fuse,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Relay => write!(f, "Relay"),
            DeviceKind::Fuse => write!(f, "Fuse"),
        }
    }
}

/// Curve shape selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Time falls as current rises
    #[default]
    Inverse,
    /// Fixed time (the time dial, in seconds) above pickup
    Definite,
}

/// Where a device's characteristic comes from.
///
/// Serialized untagged: a curve code string, an `{a, b}` object, or a fuse
/// selection object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveFamily {
    /// Named catalogue curve
    Standard(StandardCurve),
    /// Explicit analytic constants
    Analytic(CurveConstants),
    /// Tabulated fuse characteristic
    Fuse(FuseSelection),
}

impl CurveFamily {
    /// Analytic constants, for relay families
    pub fn constants(&self) -> Option<CurveConstants> {
        match self {
            CurveFamily::Standard(curve) => Some(curve.constants()),
            CurveFamily::Analytic(constants) => Some(*constants),
            CurveFamily::Fuse(_) => None,
        }
    }

    /// Fuse selection, for fuse families
    pub fn fuse_selection(&self) -> Option<&FuseSelection> {
        match self {
            CurveFamily::Fuse(selection) => Some(selection),
            CurveFamily::Standard(_) | CurveFamily::Analytic(_) => None,
        }
    }

    /// The device kind this family belongs to
    pub fn device_kind(&self) -> DeviceKind {
        match self {
            CurveFamily::Standard(_) | CurveFamily::Analytic(_) => DeviceKind::Relay,
            CurveFamily::Fuse(_) => DeviceKind::Fuse,
        }
    }

    fn validate(&self) -> ProtectionResult<()> {
        match self {
            CurveFamily::Standard(_) => Ok(()),
            CurveFamily::Analytic(constants) => constants.validate(),
            CurveFamily::Fuse(selection) => selection.validate(),
        }
    }
}

impl std::fmt::Display for CurveFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveFamily::Standard(curve) => write!(f, "{}", curve),
            CurveFamily::Analytic(c) => write!(f, "a={}, b={}, c={}", c.a, c.b, c.c),
            CurveFamily::Fuse(selection) => write!(f, "{}", selection),
        }
    }
}

impl From<StandardCurve> for CurveFamily {
    fn from(curve: StandardCurve) -> Self {
        CurveFamily::Standard(curve)
    }
}

impl From<CurveConstants> for CurveFamily {
    fn from(constants: CurveConstants) -> Self {
        CurveFamily::Analytic(constants)
    }
}

impl From<FuseSelection> for CurveFamily {
    fn from(selection: FuseSelection) -> Self {
        CurveFamily::Fuse(selection)
    }
}

fn default_time_dial() -> f64 {
    1.0
}

/// Flat, serializable description of a device.
///
/// This is the wire form; [`Device`] converts to and from it, validating on
/// the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Unique name within a study
    pub name: String,
    /// Relay or fuse
    pub kind: DeviceKind,
    /// Pickup current in amps (fuses default to their rating)
    #[serde(default)]
    pub pickup_current_a: Option<f64>,
    /// Time dial / time multiplier setting
    #[serde(default = "default_time_dial")]
    pub time_dial: f64,
    /// Curve family
    pub curve_family: CurveFamily,
    /// Inverse or definite time
    #[serde(default)]
    pub curve_kind: CurveKind,
}

/// A validated protection device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DeviceDescriptor", into = "DeviceDescriptor")]
pub struct Device {
    name: String,
    kind: DeviceKind,
    pickup_current_a: f64,
    time_dial: f64,
    curve_family: CurveFamily,
    curve_kind: CurveKind,
}

impl Device {
    /// Inverse-time relay.
    ///
    /// ```rust
    /// use protection_core::curves::StandardCurve;
    /// use protection_core::device::Device;
    ///
    /// let relay = Device::relay("R1", 100.0, 0.5, StandardCurve::IecVeryInverse).unwrap();
    /// assert_eq!(relay.pickup_current_a(), 100.0);
    /// assert!(Device::relay("R2", 0.0, 0.5, StandardCurve::IecVeryInverse).is_err());
    /// ```
    pub fn relay(
        name: impl Into<String>,
        pickup_current_a: f64,
        time_dial: f64,
        curve_family: impl Into<CurveFamily>,
    ) -> ProtectionResult<Self> {
        Device::try_from(DeviceDescriptor {
            name: name.into(),
            kind: DeviceKind::Relay,
            pickup_current_a: Some(pickup_current_a),
            time_dial,
            curve_family: curve_family.into(),
            curve_kind: CurveKind::Inverse,
        })
    }

    /// Definite-time relay operating after `time_s` seconds above pickup.
    ///
    /// Carries the IEC Standard Inverse family so it can be switched back to
    /// an inverse curve.
    pub fn definite_time(name: impl Into<String>, pickup_current_a: f64, time_s: f64) -> ProtectionResult<Self> {
        Device::try_from(DeviceDescriptor {
            name: name.into(),
            kind: DeviceKind::Relay,
            pickup_current_a: Some(pickup_current_a),
            time_dial: time_s,
            curve_family: CurveFamily::Standard(StandardCurve::IecStandardInverse),
            curve_kind: CurveKind::Definite,
        })
    }

    /// Fuse with a tabulated curve; pickup is the fuse rating.
    pub fn fuse(name: impl Into<String>, selection: FuseSelection) -> ProtectionResult<Self> {
        Device::try_from(DeviceDescriptor {
            name: name.into(),
            kind: DeviceKind::Fuse,
            pickup_current_a: None,
            time_dial: default_time_dial(),
            curve_family: CurveFamily::Fuse(selection),
            curve_kind: CurveKind::Inverse,
        })
    }

    /// Device name (identity within a study)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relay or fuse
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Pickup current in amps
    pub fn pickup_current_a(&self) -> f64 {
        self.pickup_current_a
    }

    /// Time dial setting (seconds for definite-time devices)
    pub fn time_dial(&self) -> f64 {
        self.time_dial
    }

    /// Curve family
    pub fn curve_family(&self) -> &CurveFamily {
        &self.curve_family
    }

    /// Inverse or definite
    pub fn curve_kind(&self) -> CurveKind {
        self.curve_kind
    }

    /// True for definite-time devices
    pub fn is_definite(&self) -> bool {
        self.curve_kind == CurveKind::Definite
    }

    /// Set the pickup current. Rejects non-positive values, and for fuses
    /// anything other than the fuse rating.
    pub fn set_pickup_current(&mut self, pickup_current_a: f64) -> ProtectionResult<()> {
        require_positive("pickup_current_a", pickup_current_a)?;
        check_fuse_pickup(&self.curve_family, pickup_current_a)?;
        self.pickup_current_a = pickup_current_a;
        Ok(())
    }

    /// Set the time dial. Rejects non-positive values.
    pub fn set_time_dial(&mut self, time_dial: f64) -> ProtectionResult<()> {
        require_positive("time_dial", time_dial)?;
        self.time_dial = time_dial;
        Ok(())
    }

    /// Replace the curve family. The family must suit the device kind; a
    /// fuse's pickup follows the new rating.
    pub fn set_curve_family(&mut self, curve_family: impl Into<CurveFamily>) -> ProtectionResult<()> {
        let curve_family = curve_family.into();
        check_family(self.kind, &curve_family)?;
        if let Some(selection) = curve_family.fuse_selection() {
            self.pickup_current_a = selection.rating_a;
        }
        self.curve_family = curve_family;
        Ok(())
    }

    /// Switch between inverse and definite time
    pub fn set_curve_kind(&mut self, curve_kind: CurveKind) {
        self.curve_kind = curve_kind;
    }

    /// Select a different fuse table. Fuse devices only; the pickup current
    /// follows the new rating.
    pub fn set_fuse_selection(&mut self, selection: FuseSelection) -> ProtectionResult<()> {
        if self.kind != DeviceKind::Fuse {
            return Err(ProtectionError::invalid_input(
                "curve_family",
                selection.to_string(),
                format!("'{}' is a relay and cannot take a fuse curve", self.name),
            ));
        }
        selection.validate()?;
        self.pickup_current_a = selection.rating_a;
        self.curve_family = CurveFamily::Fuse(selection);
        Ok(())
    }
}

fn require_positive(field: &str, value: f64) -> ProtectionResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProtectionError::invalid_input(
            field,
            value.to_string(),
            "Value must be positive",
        ))
    }
}

/// Fuse tables are indexed by multiples of the rating, so a fuse's pickup
/// is its rating.
fn check_fuse_pickup(family: &CurveFamily, pickup_current_a: f64) -> ProtectionResult<()> {
    match family.fuse_selection() {
        Some(selection) if (pickup_current_a - selection.rating_a).abs() >= RATING_TOLERANCE_A => {
            Err(ProtectionError::invalid_input(
                "pickup_current_a",
                pickup_current_a.to_string(),
                format!("Fuse pickup must equal its rating ({} A)", selection.rating_a),
            ))
        }
        _ => Ok(()),
    }
}

fn check_family(kind: DeviceKind, family: &CurveFamily) -> ProtectionResult<()> {
    if family.device_kind() != kind {
        return Err(ProtectionError::invalid_input(
            "curve_family",
            family.to_string(),
            format!("{} devices cannot use this curve family", kind),
        ));
    }
    family.validate()
}

impl TryFrom<DeviceDescriptor> for Device {
    type Error = ProtectionError;

    fn try_from(descriptor: DeviceDescriptor) -> Result<Self, Self::Error> {
        let name = descriptor.name.trim().to_string();
        if name.is_empty() {
            return Err(ProtectionError::missing_field("name"));
        }

        check_family(descriptor.kind, &descriptor.curve_family)?;

        let pickup_current_a = match (descriptor.pickup_current_a, descriptor.curve_family.fuse_selection()) {
            (Some(pickup), _) => pickup,
            (None, Some(selection)) => selection.rating_a,
            (None, None) => return Err(ProtectionError::missing_field("pickup_current_a")),
        };
        require_positive("pickup_current_a", pickup_current_a)?;
        check_fuse_pickup(&descriptor.curve_family, pickup_current_a)?;
        require_positive("time_dial", descriptor.time_dial)?;

        Ok(Device {
            name,
            kind: descriptor.kind,
            pickup_current_a,
            time_dial: descriptor.time_dial,
            curve_family: descriptor.curve_family,
            curve_kind: descriptor.curve_kind,
        })
    }
}

impl From<Device> for DeviceDescriptor {
    fn from(device: Device) -> Self {
        DeviceDescriptor {
            name: device.name,
            kind: device.kind,
            pickup_current_a: Some(device.pickup_current_a),
            time_dial: device.time_dial,
            curve_family: device.curve_family,
            curve_kind: device.curve_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cef(rating: f64) -> FuseSelection {
        FuseSelection::new("CEF", rating, "ABB")
    }

    #[test]
    fn test_relay_construction() {
        let relay = Device::relay("R1", 400.0, 0.3, StandardCurve::IecExtremelyInverse).unwrap();
        assert_eq!(relay.kind(), DeviceKind::Relay);
        assert_eq!(relay.curve_kind(), CurveKind::Inverse);
        assert_eq!(relay.curve_family().constants(), Some(CurveConstants::new(80.0, 2.0)));
    }

    #[test]
    fn test_fuse_pickup_defaults_to_rating() {
        let fuse = Device::fuse("F1", cef(63.0)).unwrap();
        assert_eq!(fuse.kind(), DeviceKind::Fuse);
        assert_eq!(fuse.pickup_current_a(), 63.0);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(Device::relay("R1", -10.0, 0.3, StandardCurve::IecStandardInverse).is_err());
        assert!(Device::relay("R1", 100.0, 0.0, StandardCurve::IecStandardInverse).is_err());
        assert!(Device::relay("  ", 100.0, 0.3, StandardCurve::IecStandardInverse).is_err());
        assert!(Device::relay("R1", 100.0, 0.3, CurveConstants::new(0.14, 0.0)).is_err());
        assert!(Device::fuse("F1", cef(0.0)).is_err());
        assert!(Device::definite_time("DT", 100.0, f64::NAN).is_err());
    }

    #[test]
    fn test_kind_must_match_family() {
        let descriptor = DeviceDescriptor {
            name: "X".to_string(),
            kind: DeviceKind::Relay,
            pickup_current_a: Some(100.0),
            time_dial: 0.5,
            curve_family: CurveFamily::Fuse(cef(25.0)),
            curve_kind: CurveKind::Inverse,
        };
        let err = Device::try_from(descriptor).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_rejected_setter_leaves_device_unchanged() {
        let mut relay = Device::relay("R1", 100.0, 0.5, StandardCurve::IecStandardInverse).unwrap();
        let before = relay.clone();
        assert!(relay.set_pickup_current(0.0).is_err());
        assert!(relay.set_time_dial(-1.0).is_err());
        assert!(relay.set_curve_family(cef(25.0)).is_err());
        assert!(relay.set_fuse_selection(cef(25.0)).is_err());
        assert_eq!(relay, before);

        relay.set_time_dial(0.8).unwrap();
        assert_eq!(relay.time_dial(), 0.8);
    }

    #[test]
    fn test_fuse_selection_moves_pickup() {
        let mut fuse = Device::fuse("F1", cef(25.0)).unwrap();
        fuse.set_fuse_selection(cef(40.0)).unwrap();
        assert_eq!(fuse.pickup_current_a(), 40.0);
        assert_eq!(fuse.curve_family().fuse_selection().unwrap().rating_a, 40.0);
    }

    #[test]
    fn test_fuse_pickup_pinned_to_rating() {
        let mut fuse = Device::fuse("F1", cef(25.0)).unwrap();
        let err = fuse.set_pickup_current(50.0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(fuse.pickup_current_a(), 25.0);
        fuse.set_pickup_current(25.0).unwrap();
        fuse.set_curve_family(cef(63.0)).unwrap();
        assert_eq!(fuse.pickup_current_a(), 63.0);

        let json = r#"{
            "name": "TX fuse",
            "kind": "fuse",
            "pickup_current_a": 50.0,
            "curve_family": { "fuse_type": "CEF", "rating_a": 25.0, "manufacturer": "ABB" }
        }"#;
        assert!(serde_json::from_str::<Device>(json).is_err());

        let matching = json.replace("50.0", "25.0");
        let device: Device = serde_json::from_str(&matching).unwrap();
        assert_eq!(device.pickup_current_a(), 25.0);
    }

    #[test]
    fn test_descriptor_json() {
        let json = r#"{
            "name": "Feeder",
            "kind": "relay",
            "pickup_current_a": 400.0,
            "time_dial": 0.3,
            "curve_family": "IEC-VI"
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.curve_family(), &CurveFamily::Standard(StandardCurve::IecVeryInverse));
        assert_eq!(device.curve_kind(), CurveKind::Inverse);

        let analytic = r#"{
            "name": "Custom",
            "kind": "relay",
            "pickup_current_a": 50.0,
            "curve_family": { "a": 13.5, "b": 1.0 },
            "curve_kind": "definite"
        }"#;
        let device: Device = serde_json::from_str(analytic).unwrap();
        assert_eq!(device.time_dial(), 1.0);
        assert!(device.is_definite());

        let fuse = r#"{
            "name": "TX fuse",
            "kind": "fuse",
            "curve_family": { "fuse_type": "CEF", "rating_a": 63.0, "manufacturer": "ABB" }
        }"#;
        let device: Device = serde_json::from_str(fuse).unwrap();
        assert_eq!(device.pickup_current_a(), 63.0);
    }

    #[test]
    fn test_invalid_json_device_rejected() {
        let json = r#"{
            "name": "Bad",
            "kind": "relay",
            "pickup_current_a": -5.0,
            "curve_family": "IEC-SI"
        }"#;
        assert!(serde_json::from_str::<Device>(json).is_err());

        let no_pickup = r#"{ "name": "Bad", "kind": "relay", "curve_family": "IEC-SI" }"#;
        assert!(serde_json::from_str::<Device>(no_pickup).is_err());
    }

    #[test]
    fn test_device_serialization_roundtrip() {
        let device = Device::fuse("F1", cef(25.0)).unwrap();
        let json = serde_json::to_string_pretty(&device).unwrap();
        let roundtrip: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(device, roundtrip);
    }
}
