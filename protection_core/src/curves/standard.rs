//! Standard Inverse-Time Curve Families
//!
//! Representative constants for the IEC 60255 and IEEE C37.112 inverse-time
//! families. Operating time for a multiple `M` of pickup is
//!
//! ```text
//! t = a·TDS / (M^b − 1) + c·TDS
//! ```
//!
//! The catalogue keeps `c = 0` for every family, so the IEEE entries are the
//! simplified two-constant forms.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtectionError, ProtectionResult};

/// Analytic curve constants `{a, b}` plus an optional additive term `c`.
///
/// ## JSON Example
///
/// ```json
/// { "a": 0.14, "b": 0.02 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveConstants {
    /// Numerator constant
    pub a: f64,
    /// Exponent applied to the pickup multiple
    pub b: f64,
    /// Additive constant, scaled by the time dial (0 for IEC curves)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub c: f64,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

impl CurveConstants {
    /// Two-constant curve `t = a·TDS / (M^b − 1)`
    pub const fn new(a: f64, b: f64) -> Self {
        CurveConstants { a, b, c: 0.0 }
    }

    /// Add the additive constant (builder pattern)
    pub const fn with_offset(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// IEC Standard Inverse, the default family for new relays
    pub const fn iec_standard_inverse() -> Self {
        CurveConstants::new(0.14, 0.02)
    }

    /// Validate that the constants describe a usable inverse curve.
    pub fn validate(&self) -> ProtectionResult<()> {
        if !(self.a.is_finite() && self.a > 0.0) {
            return Err(ProtectionError::invalid_input(
                "curve_family.a",
                self.a.to_string(),
                "Curve constant a must be positive",
            ));
        }
        if !(self.b.is_finite() && self.b > 0.0) {
            return Err(ProtectionError::invalid_input(
                "curve_family.b",
                self.b.to_string(),
                "Curve exponent b must be positive",
            ));
        }
        if !(self.c.is_finite() && self.c >= 0.0) {
            return Err(ProtectionError::invalid_input(
                "curve_family.c",
                self.c.to_string(),
                "Curve offset c cannot be negative",
            ));
        }
        Ok(())
    }
}

impl Default for CurveConstants {
    fn default() -> Self {
        CurveConstants::iec_standard_inverse()
    }
}

/// Named inverse-time curve families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardCurve {
    /// IEC Standard Inverse
    #[serde(rename = "IEC-SI", alias = "IEC Standard Inverse")]
    IecStandardInverse,
    /// IEC Very Inverse
    #[serde(rename = "IEC-VI", alias = "IEC Very Inverse")]
    IecVeryInverse,
    /// IEC Extremely Inverse
    #[serde(rename = "IEC-EI", alias = "IEC Extremely Inverse")]
    IecExtremelyInverse,
    /// IEC Long Time Inverse
    #[serde(rename = "IEC-LTI", alias = "IEC Long Time Inverse")]
    IecLongTimeInverse,
    /// IEEE Moderately Inverse
    #[serde(rename = "IEEE-MI", alias = "IEEE Moderately Inverse")]
    IeeeModeratelyInverse,
    /// IEEE Very Inverse
    #[serde(rename = "IEEE-VI", alias = "IEEE Very Inverse")]
    IeeeVeryInverse,
    /// IEEE Extremely Inverse
    #[serde(rename = "IEEE-EI", alias = "IEEE Extremely Inverse")]
    IeeeExtremelyInverse,
}

impl StandardCurve {
    /// All curve families for UI selection
    pub const ALL: [StandardCurve; 7] = [
        StandardCurve::IecStandardInverse,
        StandardCurve::IecVeryInverse,
        StandardCurve::IecExtremelyInverse,
        StandardCurve::IecLongTimeInverse,
        StandardCurve::IeeeModeratelyInverse,
        StandardCurve::IeeeVeryInverse,
        StandardCurve::IeeeExtremelyInverse,
    ];

    /// Curve constants for this family
    pub fn constants(&self) -> CurveConstants {
        match self {
            StandardCurve::IecStandardInverse => CurveConstants::new(0.14, 0.02),
            StandardCurve::IecVeryInverse => CurveConstants::new(13.5, 1.0),
            StandardCurve::IecExtremelyInverse => CurveConstants::new(80.0, 2.0),
            StandardCurve::IecLongTimeInverse => CurveConstants::new(120.0, 1.0),
            StandardCurve::IeeeModeratelyInverse => CurveConstants::new(0.0515, 0.02),
            StandardCurve::IeeeVeryInverse => CurveConstants::new(19.61, 2.0),
            StandardCurve::IeeeExtremelyInverse => CurveConstants::new(28.2, 2.0),
        }
    }

    /// Short code (e.g., "IEC-SI")
    pub fn code(&self) -> &'static str {
        match self {
            StandardCurve::IecStandardInverse => "IEC-SI",
            StandardCurve::IecVeryInverse => "IEC-VI",
            StandardCurve::IecExtremelyInverse => "IEC-EI",
            StandardCurve::IecLongTimeInverse => "IEC-LTI",
            StandardCurve::IeeeModeratelyInverse => "IEEE-MI",
            StandardCurve::IeeeVeryInverse => "IEEE-VI",
            StandardCurve::IeeeExtremelyInverse => "IEEE-EI",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            StandardCurve::IecStandardInverse => "IEC Standard Inverse",
            StandardCurve::IecVeryInverse => "IEC Very Inverse",
            StandardCurve::IecExtremelyInverse => "IEC Extremely Inverse",
            StandardCurve::IecLongTimeInverse => "IEC Long Time Inverse",
            StandardCurve::IeeeModeratelyInverse => "IEEE Moderately Inverse",
            StandardCurve::IeeeVeryInverse => "IEEE Very Inverse",
            StandardCurve::IeeeExtremelyInverse => "IEEE Extremely Inverse",
        }
    }

    /// Parse from codes or display names, ignoring case and separators
    pub fn from_str_flexible(s: &str) -> ProtectionResult<Self> {
        let normalized = s.to_uppercase().replace([' ', '_', '-'], "");
        StandardCurve::ALL
            .into_iter()
            .find(|curve| {
                curve.code().replace('-', "") == normalized
                    || curve.display_name().to_uppercase().replace(' ', "") == normalized
            })
            .ok_or_else(|| ProtectionError::curve_not_found(s))
    }
}

impl std::fmt::Display for StandardCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for StandardCurve {
    type Err = ProtectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StandardCurve::from_str_flexible(s)
    }
}
