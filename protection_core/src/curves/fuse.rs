//! Fuse Curve Store
//!
//! Tabulated melting-time characteristics for fuses (and breakers modelled
//! the same way), keyed by fuse type, rating and manufacturer.
//!
//! The engine only ever reads from a store. [`FuseCurveStore`] is the seam a
//! host application implements over its own reference database;
//! [`ReferenceFuseStore`] is the in-memory implementation, with a bundled
//! table loaded from TOML on first use.
//!
//! ## Example
//!
//! ```rust
//! use protection_core::curves::fuse::{FuseCurveStore, FuseSelection, ReferenceFuseStore};
//!
//! let store = ReferenceFuseStore::builtin();
//! let curve = store.lookup(&FuseSelection::new("CEF", 25.0, "ABB")).unwrap();
//! assert_eq!(curve.points().first().unwrap().multiple, 1.0);
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::OperatingTime;
use crate::errors::{ProtectionError, ProtectionResult};

/// Bundled reference table
const BUILTIN_TABLE: &str = include_str!("../../data/fuse_curves.toml");

/// Ratings closer than this are the same rating
pub(crate) const RATING_TOLERANCE_A: f64 = 1e-9;

/// Extrapolation factor applied beyond either end of a table
const EXTRAPOLATION_FACTOR: f64 = 10.0;

static BUILTIN_STORE: Lazy<ReferenceFuseStore> = Lazy::new(|| {
    ReferenceFuseStore::from_toml_str(BUILTIN_TABLE).unwrap_or_else(|e| {
        tracing::error!("bundled fuse reference table is invalid: {e}");
        ReferenceFuseStore::default()
    })
});

/// Reference to a tabulated fuse curve.
///
/// ## JSON Example
///
/// ```json
/// { "fuse_type": "CEF", "rating_a": 25.0, "manufacturer": "ABB" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuseSelection {
    /// Fuse family (e.g., "CEF", "MCB-C")
    pub fuse_type: String,
    /// Rated current in amps
    pub rating_a: f64,
    /// Manufacturer name
    pub manufacturer: String,
}

impl FuseSelection {
    /// Create a fuse selection
    pub fn new(fuse_type: impl Into<String>, rating_a: f64, manufacturer: impl Into<String>) -> Self {
        FuseSelection {
            fuse_type: fuse_type.into(),
            rating_a,
            manufacturer: manufacturer.into(),
        }
    }

    /// Check that the selection can identify a curve.
    pub fn validate(&self) -> ProtectionResult<()> {
        if self.fuse_type.trim().is_empty() {
            return Err(ProtectionError::missing_field("curve_family.fuse_type"));
        }
        if !(self.rating_a.is_finite() && self.rating_a > 0.0) {
            return Err(ProtectionError::invalid_input(
                "curve_family.rating_a",
                self.rating_a.to_string(),
                "Fuse rating must be positive",
            ));
        }
        Ok(())
    }

    /// Same fuse type, manufacturer (case-insensitive) and rating
    pub fn matches(&self, other: &FuseSelection) -> bool {
        self.fuse_type.eq_ignore_ascii_case(&other.fuse_type)
            && self.manufacturer.eq_ignore_ascii_case(&other.manufacturer)
            && (self.rating_a - other.rating_a).abs() < RATING_TOLERANCE_A
    }
}

impl std::fmt::Display for FuseSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}A ({})", self.fuse_type, self.rating_a, self.manufacturer)
    }
}

/// One tabulated point: melting time at a multiple of the rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusePoint {
    /// Current as a multiple of the fuse rating
    pub multiple: f64,
    /// Melting time in seconds
    pub melting_time_s: f64,
}

/// A validated fuse characteristic, sorted ascending by multiple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuseCurve {
    selection: FuseSelection,
    points: Vec<FusePoint>,
}

impl FuseCurve {
    /// Build a curve from unordered points.
    ///
    /// Requires at least one point; every multiple and time must be positive
    /// and finite (the interpolation runs in log space).
    pub fn new(selection: FuseSelection, mut points: Vec<FusePoint>) -> ProtectionResult<Self> {
        selection.validate()?;
        if points.is_empty() {
            return Err(ProtectionError::missing_field("points"));
        }
        for point in &points {
            let usable = point.multiple.is_finite()
                && point.multiple > 0.0
                && point.melting_time_s.is_finite()
                && point.melting_time_s > 0.0;
            if !usable {
                return Err(ProtectionError::invalid_input(
                    "points",
                    format!("({}, {})", point.multiple, point.melting_time_s),
                    format!("Curve points for {} must be positive", selection),
                ));
            }
        }
        points.sort_by(|a, b| a.multiple.total_cmp(&b.multiple));
        Ok(FuseCurve { selection, points })
    }

    /// The selection this curve answers
    pub fn selection(&self) -> &FuseSelection {
        &self.selection
    }

    /// Tabulated points, ascending by multiple
    pub fn points(&self) -> &[FusePoint] {
        &self.points
    }

    /// Melting time at `multiple` times the rating.
    ///
    /// Log-log linear interpolation between the bracketing points. Below the
    /// table the first time is multiplied by 10 (assume a much slower
    /// clearance); above it the last time is divided by 10.
    pub fn melting_time(&self, multiple: f64) -> OperatingTime {
        if !multiple.is_finite() || multiple <= 0.0 {
            return OperatingTime::Undefined;
        }
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return OperatingTime::Undefined;
        };

        if multiple < first.multiple {
            return OperatingTime::Trip(first.melting_time_s * EXTRAPOLATION_FACTOR);
        }
        if multiple > last.multiple {
            return OperatingTime::Trip(last.melting_time_s / EXTRAPOLATION_FACTOR);
        }
        if self.points.len() == 1 {
            return OperatingTime::Trip(first.melting_time_s);
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if multiple < lo.multiple || multiple > hi.multiple {
                continue;
            }
            // duplicated multiple: no slope to follow
            if hi.multiple <= lo.multiple {
                continue;
            }
            let (log_x1, log_y1) = (lo.multiple.ln(), lo.melting_time_s.ln());
            let (log_x2, log_y2) = (hi.multiple.ln(), hi.melting_time_s.ln());
            let log_y = log_y1 + (log_y2 - log_y1) * (multiple.ln() - log_x1) / (log_x2 - log_x1);
            return OperatingTime::Trip(log_y.exp());
        }

        OperatingTime::Undefined
    }
}

/// Read-only lookup of tabulated fuse curves.
///
/// A missing curve is `None`, never an error.
pub trait FuseCurveStore {
    /// Find the curve for a fuse type, rating and manufacturer
    fn lookup(&self, selection: &FuseSelection) -> Option<&FuseCurve>;
}

impl<S: FuseCurveStore + ?Sized> FuseCurveStore for &S {
    fn lookup(&self, selection: &FuseSelection) -> Option<&FuseCurve> {
        (**self).lookup(selection)
    }
}

/// In-memory fuse curve table
#[derive(Debug, Clone, Default)]
pub struct ReferenceFuseStore {
    curves: Vec<FuseCurve>,
}

#[derive(Debug, Deserialize)]
struct ReferenceTable {
    #[serde(default, rename = "curve")]
    curves: Vec<ReferenceEntry>,
}

#[derive(Debug, Deserialize)]
struct ReferenceEntry {
    fuse_type: String,
    manufacturer: String,
    ratings_a: Vec<f64>,
    points: Vec<[f64; 2]>,
}

impl ReferenceFuseStore {
    /// Create an empty store
    pub fn new() -> Self {
        ReferenceFuseStore::default()
    }

    /// The bundled reference table, parsed once per process
    pub fn builtin() -> &'static ReferenceFuseStore {
        &BUILTIN_STORE
    }

    /// Parse a TOML table of `[[curve]]` entries.
    ///
    /// ```rust
    /// use protection_core::curves::fuse::{FuseCurveStore, FuseSelection, ReferenceFuseStore};
    ///
    /// let store = ReferenceFuseStore::from_toml_str(r#"
    ///     [[curve]]
    ///     fuse_type = "gG"
    ///     manufacturer = "Generic"
    ///     ratings_a = [32.0, 63.0]
    ///     points = [[2.0, 100.0], [10.0, 0.1]]
    /// "#).unwrap();
    /// assert!(store.lookup(&FuseSelection::new("gG", 63.0, "Generic")).is_some());
    /// ```
    pub fn from_toml_str(source: &str) -> ProtectionResult<Self> {
        let table: ReferenceTable =
            toml::from_str(source).map_err(|e| ProtectionError::serialization(e.to_string()))?;

        let mut store = ReferenceFuseStore::new();
        for entry in table.curves {
            let points: Vec<FusePoint> = entry
                .points
                .iter()
                .map(|[multiple, melting_time_s]| FusePoint {
                    multiple: *multiple,
                    melting_time_s: *melting_time_s,
                })
                .collect();
            for rating_a in &entry.ratings_a {
                let selection = FuseSelection::new(&entry.fuse_type, *rating_a, &entry.manufacturer);
                store.insert(FuseCurve::new(selection, points.clone())?);
            }
        }
        tracing::debug!(curves = store.len(), "loaded fuse reference table");
        Ok(store)
    }

    /// Add a curve, replacing any curve with the same selection
    pub fn insert(&mut self, curve: FuseCurve) {
        match self.curves.iter_mut().find(|c| c.selection.matches(&curve.selection)) {
            Some(existing) => *existing = curve,
            None => self.curves.push(curve),
        }
    }

    /// Number of curves in the store
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// True when the store holds no curves
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Distinct fuse types, in table order
    pub fn fuse_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for curve in &self.curves {
            let fuse_type = curve.selection.fuse_type.as_str();
            if !types.iter().any(|t| t.eq_ignore_ascii_case(fuse_type)) {
                types.push(fuse_type);
            }
        }
        types
    }

    /// Available ratings for a fuse type, ascending and de-duplicated
    pub fn ratings(&self, fuse_type: &str) -> Vec<f64> {
        let mut ratings: Vec<f64> = self
            .curves
            .iter()
            .filter(|c| c.selection.fuse_type.eq_ignore_ascii_case(fuse_type))
            .map(|c| c.selection.rating_a)
            .collect();
        ratings.sort_by(f64::total_cmp);
        ratings.dedup_by(|a, b| (*a - *b).abs() < RATING_TOLERANCE_A);
        ratings
    }

    /// All curves in the store
    pub fn curves(&self) -> &[FuseCurve] {
        &self.curves
    }
}

impl FuseCurveStore for ReferenceFuseStore {
    fn lookup(&self, selection: &FuseSelection) -> Option<&FuseCurve> {
        self.curves.iter().find(|c| c.selection.matches(selection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cef_25() -> FuseCurve {
        ReferenceFuseStore::builtin()
            .lookup(&FuseSelection::new("CEF", 25.0, "ABB"))
            .cloned()
            .unwrap()
    }

    fn trip(time: OperatingTime) -> f64 {
        time.seconds().unwrap()
    }

    #[test]
    fn test_builtin_table_loads() {
        let store = ReferenceFuseStore::builtin();
        assert!(!store.is_empty());
        assert_eq!(store.fuse_types(), vec!["CEF", "MCB-B", "MCB-C", "MCB-D"]);
        assert_eq!(store.ratings("cef").len(), 11);
        assert_eq!(store.ratings("MCB-B"), vec![6.0, 10.0, 16.0, 20.0, 25.0, 32.0]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let store = ReferenceFuseStore::builtin();
        assert!(store.lookup(&FuseSelection::new("cef", 63.0, "abb")).is_some());
        assert!(store.lookup(&FuseSelection::new("CEF", 64.0, "ABB")).is_none());
        assert!(store.lookup(&FuseSelection::new("CEF", 25.0, "Siemens")).is_none());
    }

    #[test]
    fn test_interpolation_on_table_points() {
        let curve = cef_25();
        assert!((trip(curve.melting_time(3.0)) - 10.0).abs() < 1e-9);
        assert!((trip(curve.melting_time(10.0)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_log_log_interpolation() {
        let curve = cef_25();
        // Between (5, 1) and (10, 0.1) the curve is a straight line in log-log
        // space with slope log(0.1)/log(2); at the geometric midpoint the time
        // is the geometric mean of the end times.
        let midpoint = (5.0f64 * 10.0).sqrt();
        let expected = (1.0f64 * 0.1).sqrt();
        assert!((trip(curve.melting_time(midpoint)) - expected).abs() < 1e-9);

        // Real-space linear interpolation would give 0.55 s at 7.5x
        let t = trip(curve.melting_time(7.5));
        assert!(t < 0.3);
    }

    #[test]
    fn test_extrapolation_is_conservative() {
        let selection = FuseSelection::new("gG", 32.0, "Generic");
        let curve = FuseCurve::new(
            selection,
            vec![
                FusePoint { multiple: 10.0, melting_time_s: 0.05 },
                FusePoint { multiple: 2.0, melting_time_s: 40.0 },
            ],
        )
        .unwrap();
        // Sorted on construction
        assert_eq!(curve.points()[0].multiple, 2.0);
        assert!((trip(curve.melting_time(1.5)) - 400.0).abs() < 1e-9);
        assert!((trip(curve.melting_time(20.0)) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_multiples_use_neighbouring_segment() {
        let curve = FuseCurve::new(
            FuseSelection::new("gG", 16.0, "Generic"),
            vec![
                FusePoint { multiple: 2.0, melting_time_s: 50.0 },
                FusePoint { multiple: 4.0, melting_time_s: 5.0 },
                FusePoint { multiple: 4.0, melting_time_s: 4.0 },
                FusePoint { multiple: 8.0, melting_time_s: 0.5 },
            ],
        )
        .unwrap();
        assert!((trip(curve.melting_time(4.0)) - 5.0).abs() < 1e-9);
        assert!(curve.melting_time(6.0).is_trip());
    }

    #[test]
    fn test_single_point_curve() {
        let curve = FuseCurve::new(
            FuseSelection::new("gG", 10.0, "Generic"),
            vec![FusePoint { multiple: 5.0, melting_time_s: 2.0 }],
        )
        .unwrap();
        assert_eq!(curve.melting_time(5.0), OperatingTime::Trip(2.0));
        assert_eq!(curve.melting_time(4.0), OperatingTime::Trip(20.0));
    }

    #[test]
    fn test_invalid_curves_rejected() {
        let selection = FuseSelection::new("gG", 10.0, "Generic");
        assert!(FuseCurve::new(selection.clone(), vec![]).is_err());
        assert!(FuseCurve::new(
            selection.clone(),
            vec![FusePoint { multiple: 2.0, melting_time_s: 0.0 }]
        )
        .is_err());
        assert!(FuseCurve::new(
            FuseSelection::new("", 10.0, "Generic"),
            vec![FusePoint { multiple: 2.0, melting_time_s: 1.0 }]
        )
        .is_err());
    }

    #[test]
    fn test_insert_replaces_matching_selection() {
        let mut store = ReferenceFuseStore::new();
        let selection = FuseSelection::new("gG", 10.0, "Generic");
        let first = FuseCurve::new(
            selection.clone(),
            vec![FusePoint { multiple: 2.0, melting_time_s: 10.0 }],
        )
        .unwrap();
        let second = FuseCurve::new(
            selection.clone(),
            vec![FusePoint { multiple: 2.0, melting_time_s: 20.0 }],
        )
        .unwrap();
        store.insert(first);
        store.insert(second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(&selection).unwrap().points()[0].melting_time_s, 20.0);
    }

    #[test]
    fn test_bad_toml_is_serialization_error() {
        let err = ReferenceFuseStore::from_toml_str("[[curve]]\nfuse_type = 3").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
