//! Coordination (Discrimination) Analysis
//!
//! Checks that each device in an ordered chain operates sufficiently before
//! the next one upstream. Devices are supplied primary first: `devices[0]`
//! is the most downstream device and each `devices[i + 1]` backs up
//! `devices[i]`.
//!
//! For every adjacent pair and every fault level the margin
//! `t_backup − t_primary` is compared against the minimum discrimination
//! margin. Fault levels where either device does not trip, or where a time
//! cannot be computed, are skipped. A pair with no usable fault level is left
//! out of [`AnalysisResult::pairs`] and listed in
//! [`AnalysisResult::insufficient_data`] instead: there is nothing to judge.
//!
//! ## Example
//!
//! ```rust
//! use protection_core::analysis::coordination::{analyze, DEFAULT_MIN_MARGIN_S};
//! use protection_core::curves::{ReferenceFuseStore, StandardCurve};
//! use protection_core::device::Device;
//!
//! let devices = vec![
//!     Device::relay("Feeder", 100.0, 0.2, StandardCurve::IecStandardInverse).unwrap(),
//!     Device::relay("Incomer", 100.0, 0.5, StandardCurve::IecStandardInverse).unwrap(),
//! ];
//! let result = analyze(&devices, &[1000.0], DEFAULT_MIN_MARGIN_S, ReferenceFuseStore::builtin());
//!
//! assert_eq!(result.pairs.len(), 1);
//! assert!(result.is_fully_coordinated);
//! ```

use serde::{Deserialize, Serialize};

use crate::curves::{operating_time, FuseCurveStore};
use crate::device::Device;

/// Default minimum discrimination margin (seconds)
pub const DEFAULT_MIN_MARGIN_S: f64 = 0.3;

/// Margins at or above this are left off margin plots (seconds)
pub const MAX_PLOTTED_MARGIN_S: f64 = 10.0;

/// Margin between a primary/backup pair at one fault level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSample {
    /// Fault current in amps
    pub fault_current_a: f64,
    /// Primary device operating time (s)
    pub primary_time_s: f64,
    /// Backup device operating time (s)
    pub backup_time_s: f64,
    /// `backup_time_s − primary_time_s`
    pub margin_s: f64,
    /// `margin_s >= min_margin_s`
    pub coordinated: bool,
}

/// Names of an adjacent primary/backup pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRef {
    /// Downstream device
    pub primary_name: String,
    /// Upstream device
    pub backup_name: String,
}

/// Coordination outcome for one adjacent pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationPair {
    /// Downstream device
    pub primary_name: String,
    /// Upstream device
    pub backup_name: String,
    /// True when every margin sample is coordinated
    pub coordinated: bool,
    /// One sample per usable fault level, in fault-level order
    pub margins: Vec<MarginSample>,
}

impl CoordinationPair {
    /// Smallest margin across the fault levels
    pub fn worst_margin(&self) -> Option<&MarginSample> {
        self.margins
            .iter()
            .min_by(|a, b| a.margin_s.total_cmp(&b.margin_s))
    }
}

/// Overall reading of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every reported pair meets the margin
    Coordinated,
    /// At least one pair misses the margin at some fault level
    NotCoordinated,
    /// No pair could be assessed
    InsufficientData,
}

/// Result of analyzing a device chain.
///
/// ## JSON Example
///
/// ```json
/// {
///   "pairs": [{
///     "primary_name": "Feeder",
///     "backup_name": "Incomer",
///     "coordinated": true,
///     "margins": [{
///       "fault_current_a": 1000.0,
///       "primary_time_s": 0.594,
///       "backup_time_s": 1.486,
///       "margin_s": 0.891,
///       "coordinated": true
///     }]
///   }],
///   "insufficient_data": [],
///   "min_margin_s": 0.3,
///   "is_fully_coordinated": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Pairs with at least one margin sample, in chain order
    pub pairs: Vec<CoordinationPair>,
    /// Adjacent pairs left out for lack of usable samples
    #[serde(default)]
    pub insufficient_data: Vec<PairRef>,
    /// Minimum margin used (s)
    pub min_margin_s: f64,
    /// AND over the reported pairs
    pub is_fully_coordinated: bool,
}

impl AnalysisResult {
    /// An analysis with nothing to report
    pub fn empty(min_margin_s: f64) -> Self {
        AnalysisResult {
            pairs: Vec::new(),
            insufficient_data: Vec::new(),
            min_margin_s,
            is_fully_coordinated: true,
        }
    }

    /// Result for a specific primary/backup pair, if it was reported
    pub fn pair(&self, primary_name: &str, backup_name: &str) -> Option<&CoordinationPair> {
        self.pairs
            .iter()
            .find(|p| p.primary_name == primary_name && p.backup_name == backup_name)
    }

    /// Overall verdict, separating "no data" from "not coordinated"
    pub fn verdict(&self) -> Verdict {
        if self.pairs.iter().any(|p| !p.coordinated) {
            Verdict::NotCoordinated
        } else if self.pairs.is_empty() {
            Verdict::InsufficientData
        } else {
            Verdict::Coordinated
        }
    }

    /// True when some adjacent pair could not be assessed
    pub fn has_insufficient_data(&self) -> bool {
        !self.insufficient_data.is_empty()
    }

    /// The smallest margin over all reported pairs
    pub fn worst_margin(&self) -> Option<&MarginSample> {
        self.pairs
            .iter()
            .filter_map(CoordinationPair::worst_margin)
            .min_by(|a, b| a.margin_s.total_cmp(&b.margin_s))
    }

    /// `(fault current, margin)` points for a margin plot, keeping margins
    /// strictly between 0 and [`MAX_PLOTTED_MARGIN_S`].
    pub fn margin_points(&self) -> Vec<(f64, f64)> {
        self.pairs
            .iter()
            .flat_map(|p| p.margins.iter())
            .filter(|m| m.margin_s > 0.0 && m.margin_s < MAX_PLOTTED_MARGIN_S)
            .map(|m| (m.fault_current_a, m.margin_s))
            .collect()
    }
}

/// Analyze an ordered device chain at the given fault levels.
///
/// Fewer than two devices, or no fault levels, gives an empty result.
/// Non-positive or non-finite fault levels are ignored.
pub fn analyze(
    devices: &[Device],
    fault_levels: &[f64],
    min_margin_s: f64,
    store: &dyn FuseCurveStore,
) -> AnalysisResult {
    if devices.len() < 2 || fault_levels.is_empty() {
        return AnalysisResult::empty(min_margin_s);
    }

    let mut result = AnalysisResult::empty(min_margin_s);

    for window in devices.windows(2) {
        let (primary, backup) = (&window[0], &window[1]);
        let margins = margin_samples(primary, backup, fault_levels, min_margin_s, store);

        if margins.is_empty() {
            tracing::debug!(
                primary = primary.name(),
                backup = backup.name(),
                "no usable fault level for pair"
            );
            result.insufficient_data.push(PairRef {
                primary_name: primary.name().to_string(),
                backup_name: backup.name().to_string(),
            });
            continue;
        }

        result.pairs.push(CoordinationPair {
            primary_name: primary.name().to_string(),
            backup_name: backup.name().to_string(),
            coordinated: margins.iter().all(|m| m.coordinated),
            margins,
        });
    }

    result.is_fully_coordinated = result.pairs.iter().all(|p| p.coordinated);
    tracing::debug!(
        pairs = result.pairs.len(),
        insufficient = result.insufficient_data.len(),
        coordinated = result.is_fully_coordinated,
        "coordination analysis complete"
    );
    result
}

fn margin_samples(
    primary: &Device,
    backup: &Device,
    fault_levels: &[f64],
    min_margin_s: f64,
    store: &dyn FuseCurveStore,
) -> Vec<MarginSample> {
    fault_levels
        .iter()
        .filter_map(|&fault_current_a| {
            if !(fault_current_a.is_finite() && fault_current_a > 0.0) {
                return None;
            }
            let primary_time = operating_time(primary, fault_current_a, store);
            let backup_time = operating_time(backup, fault_current_a, store);
            let (Some(primary_time_s), Some(backup_time_s)) = (primary_time.seconds(), backup_time.seconds()) else {
                tracing::trace!(
                    fault_current_a,
                    primary = ?primary_time,
                    backup = ?backup_time,
                    "skipping fault level"
                );
                return None;
            };
            let margin_s = backup_time_s - primary_time_s;
            Some(MarginSample {
                fault_current_a,
                primary_time_s,
                backup_time_s,
                margin_s,
                coordinated: margin_s >= min_margin_s,
            })
        })
        .collect()
}
