//! # Coordination Study
//!
//! [`CoordinationStudy`] is one analysis session: an ordered device chain,
//! the fault levels to check, the analysis settings and a fuse curve store.
//!
//! Every mutation validates its input, drops the cached curve points of the
//! affected device (and the cached chart ranges), and re-runs the
//! coordination analysis before returning, so [`result`](CoordinationStudy::result)
//! is always current.
//!
//! The study is not internally synchronized; all mutation goes through
//! `&mut self`, so a host sharing it across threads must wrap it itself.
//!
//! ## Example
//!
//! ```rust
//! use protection_core::curves::StandardCurve;
//! use protection_core::device::Device;
//! use protection_core::study::CoordinationStudy;
//!
//! let mut study = CoordinationStudy::with_builtin_store();
//! study.add_device(Device::relay("Feeder", 100.0, 0.2, StandardCurve::IecStandardInverse)?)?;
//! study.add_device(Device::relay("Incomer", 100.0, 0.5, StandardCurve::IecStandardInverse)?)?;
//! study.add_fault_level(1000.0)?;
//!
//! assert!(study.result().is_fully_coordinated);
//!
//! // Slow the feeder down until it no longer discriminates
//! study.set_time_dial("Feeder", 0.45)?;
//! assert!(!study.result().is_fully_coordinated);
//! # Ok::<(), protection_core::errors::ProtectionError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::analysis::chart_range::{ChartRangeEstimator, ChartRanges};
use crate::analysis::coordination::{analyze, AnalysisResult, DEFAULT_MIN_MARGIN_S};
use crate::analysis::curve_points::{fault_points, CurvePoint, CurvePointGenerator, DeviceCurve};
use crate::curves::{operating_time, FuseCurveStore, FuseSelection, OperatingTime, ReferenceFuseStore};
use crate::device::{CurveFamily, CurveKind, Device};
use crate::errors::{ProtectionError, ProtectionResult};
use crate::study_file::{StudyFile, StudyMetadata};

fn default_min_margin() -> f64 {
    DEFAULT_MIN_MARGIN_S
}

/// Analysis settings carried with a study
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Minimum discrimination margin between adjacent devices (s)
    #[serde(default = "default_min_margin")]
    pub min_margin_s: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            min_margin_s: DEFAULT_MIN_MARGIN_S,
        }
    }
}

impl AnalysisSettings {
    /// Validate settings values.
    pub fn validate(&self) -> ProtectionResult<()> {
        if !(self.min_margin_s.is_finite() && self.min_margin_s >= 0.0) {
            return Err(ProtectionError::invalid_input(
                "min_margin_s",
                self.min_margin_s.to_string(),
                "Minimum margin must be zero or positive",
            ));
        }
        Ok(())
    }
}

/// An in-memory coordination study.
pub struct CoordinationStudy {
    devices: Vec<Device>,
    fault_levels: Vec<f64>,
    settings: AnalysisSettings,
    store: Box<dyn FuseCurveStore>,
    curves: CurvePointGenerator,
    ranges: ChartRangeEstimator,
    result: AnalysisResult,
}

impl std::fmt::Debug for CoordinationStudy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinationStudy")
            .field("devices", &self.devices)
            .field("fault_levels", &self.fault_levels)
            .field("settings", &self.settings)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl CoordinationStudy {
    /// Create an empty study reading fuse curves from `store`.
    pub fn new(store: impl FuseCurveStore + 'static) -> Self {
        let settings = AnalysisSettings::default();
        CoordinationStudy {
            devices: Vec::new(),
            fault_levels: Vec::new(),
            settings,
            store: Box::new(store),
            curves: CurvePointGenerator::new(),
            ranges: ChartRangeEstimator::new(),
            result: AnalysisResult::empty(settings.min_margin_s),
        }
    }

    /// Create an empty study over the bundled fuse reference table.
    pub fn with_builtin_store() -> Self {
        CoordinationStudy::new(ReferenceFuseStore::builtin())
    }

    /// Devices in chain order (primary first)
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Look up a device by name
    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name() == name)
    }

    /// Fault levels in insertion order (A)
    pub fn fault_levels(&self) -> &[f64] {
        &self.fault_levels
    }

    /// Current settings
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// The fuse curve store
    pub fn store(&self) -> &dyn FuseCurveStore {
        self.store.as_ref()
    }

    /// Latest analysis result
    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    /// The curve point cache, for inspection
    pub fn curve_cache(&self) -> &CurvePointGenerator {
        &self.curves
    }

    // ------------------------------------------------------------------
    // Device chain
    // ------------------------------------------------------------------

    /// Append a device to the chain; it backs up the device before it.
    /// Names must be unique.
    pub fn add_device(&mut self, device: Device) -> ProtectionResult<()> {
        if self.device(device.name()).is_some() {
            return Err(ProtectionError::duplicate_device(device.name()));
        }
        self.curves.invalidate(device.name());
        tracing::debug!(device = device.name(), "device added");
        self.devices.push(device);
        self.devices_changed();
        Ok(())
    }

    /// Remove the device at `index`; out-of-range indices are ignored.
    pub fn remove_device(&mut self, index: usize) -> Option<Device> {
        if index >= self.devices.len() {
            return None;
        }
        let device = self.devices.remove(index);
        self.curves.invalidate(device.name());
        tracing::debug!(device = device.name(), "device removed");
        self.devices_changed();
        Some(device)
    }

    /// Remove a device by name
    pub fn remove_device_named(&mut self, name: &str) -> ProtectionResult<Device> {
        let index = self.index_of(name)?;
        self.remove_device(index)
            .ok_or_else(|| ProtectionError::device_not_found(name))
    }

    /// Apply `change` to a copy of the named device and commit it only if
    /// the change succeeds.
    ///
    /// The device name cannot be changed this way.
    pub fn modify_device<F>(&mut self, name: &str, change: F) -> ProtectionResult<()>
    where
        F: FnOnce(&mut Device) -> ProtectionResult<()>,
    {
        let index = self.index_of(name)?;
        let mut updated = self.devices[index].clone();
        change(&mut updated)?;
        if updated.name() != name {
            return Err(ProtectionError::invalid_input(
                "name",
                updated.name(),
                "Devices cannot be renamed in place",
            ));
        }
        self.devices[index] = updated;
        self.curves.invalidate(name);
        self.devices_changed();
        Ok(())
    }

    /// Set a device's pickup current
    pub fn set_pickup_current(&mut self, name: &str, pickup_current_a: f64) -> ProtectionResult<()> {
        self.modify_device(name, |d| d.set_pickup_current(pickup_current_a))
    }

    /// Set a device's time dial
    pub fn set_time_dial(&mut self, name: &str, time_dial: f64) -> ProtectionResult<()> {
        self.modify_device(name, |d| d.set_time_dial(time_dial))
    }

    /// Set a device's curve family
    pub fn set_curve_family(&mut self, name: &str, curve_family: impl Into<CurveFamily>) -> ProtectionResult<()> {
        let curve_family = curve_family.into();
        self.modify_device(name, |d| d.set_curve_family(curve_family))
    }

    /// Switch a device between inverse and definite time
    pub fn set_curve_kind(&mut self, name: &str, curve_kind: CurveKind) -> ProtectionResult<()> {
        self.modify_device(name, |d| {
            d.set_curve_kind(curve_kind);
            Ok(())
        })
    }

    /// Select a different fuse table for a fuse device
    pub fn set_fuse_selection(&mut self, name: &str, selection: FuseSelection) -> ProtectionResult<()> {
        self.modify_device(name, |d| d.set_fuse_selection(selection))
    }

    // ------------------------------------------------------------------
    // Fault levels and settings
    // ------------------------------------------------------------------

    /// Add a fault level (A). Rejects non-positive and non-finite values.
    pub fn add_fault_level(&mut self, current_a: f64) -> ProtectionResult<()> {
        if !(current_a.is_finite() && current_a > 0.0) {
            return Err(ProtectionError::invalid_input(
                "fault_level",
                current_a.to_string(),
                "Fault current must be positive",
            ));
        }
        self.fault_levels.push(current_a);
        self.reanalyze();
        Ok(())
    }

    /// Remove the fault level at `index`
    pub fn remove_fault_level(&mut self, index: usize) -> Option<f64> {
        if index >= self.fault_levels.len() {
            return None;
        }
        let level = self.fault_levels.remove(index);
        self.reanalyze();
        Some(level)
    }

    /// Remove every fault level
    pub fn clear_fault_levels(&mut self) {
        self.fault_levels.clear();
        self.reanalyze();
    }

    /// Change the minimum discrimination margin (s)
    pub fn set_min_margin(&mut self, min_margin_s: f64) -> ProtectionResult<()> {
        let settings = AnalysisSettings { min_margin_s };
        settings.validate()?;
        if self.settings != settings {
            self.settings = settings;
            self.reanalyze();
        }
        Ok(())
    }

    /// Remove all devices and fault levels; settings are kept
    pub fn reset(&mut self) {
        self.devices.clear();
        self.fault_levels.clear();
        self.curves.clear();
        self.devices_changed();
    }

    // ------------------------------------------------------------------
    // Derived data
    // ------------------------------------------------------------------

    /// Operating time of a named device at `current_a`
    pub fn operating_time(&self, name: &str, current_a: f64) -> ProtectionResult<OperatingTime> {
        let device = self
            .device(name)
            .ok_or_else(|| ProtectionError::device_not_found(name))?;
        Ok(operating_time(device, current_a, self.store.as_ref()))
    }

    /// Cached curve points for one device
    pub fn points_for(&mut self, name: &str) -> ProtectionResult<&[CurvePoint]> {
        let device = self
            .devices
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| ProtectionError::device_not_found(name))?;
        Ok(self.curves.points_for(device, self.store.as_ref()))
    }

    /// Cached curve points for every device, in chain order
    pub fn curve_points(&mut self) -> Vec<DeviceCurve> {
        let store = self.store.as_ref();
        self.devices
            .iter()
            .map(|device| DeviceCurve {
                name: device.name().to_string(),
                points: self.curves.points_for(device, store).to_vec(),
            })
            .collect()
    }

    /// Each device's operating point at every fault level where it trips
    pub fn fault_points(&self) -> Vec<DeviceCurve> {
        self.devices
            .iter()
            .map(|device| DeviceCurve {
                name: device.name().to_string(),
                points: fault_points(device, &self.fault_levels, self.store.as_ref()),
            })
            .collect()
    }

    /// Plot axis ranges over all device curves
    pub fn chart_ranges(&mut self) -> ChartRanges {
        self.ranges
            .estimate(&self.devices, &mut self.curves, self.store.as_ref())
    }

    // ------------------------------------------------------------------
    // Study files
    // ------------------------------------------------------------------

    /// Build a study from a loaded document.
    ///
    /// The whole document is validated before anything is analyzed:
    /// settings, unique device names and positive fault levels.
    pub fn from_file(file: StudyFile, store: impl FuseCurveStore + 'static) -> ProtectionResult<Self> {
        file.settings.validate()?;

        for (i, device) in file.devices.iter().enumerate() {
            if file.devices[..i].iter().any(|d| d.name() == device.name()) {
                return Err(ProtectionError::duplicate_device(device.name()));
            }
        }
        if let Some(bad) = file.fault_levels_a.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
            return Err(ProtectionError::invalid_input(
                "fault_levels_a",
                bad.to_string(),
                "Fault current must be positive",
            ));
        }

        let mut study = CoordinationStudy::new(store);
        study.devices = file.devices;
        study.fault_levels = file.fault_levels_a;
        study.settings = file.settings;
        study.devices_changed();
        tracing::info!(
            title = %file.meta.title,
            devices = study.devices.len(),
            fault_levels = study.fault_levels.len(),
            "study opened"
        );
        Ok(study)
    }

    /// Snapshot the study as a document, stamping `meta.modified`.
    pub fn to_file(&self, mut meta: StudyMetadata) -> StudyFile {
        meta.touch();
        StudyFile {
            meta,
            settings: self.settings,
            devices: self.devices.clone(),
            fault_levels_a: self.fault_levels.clone(),
        }
    }

    fn index_of(&self, name: &str) -> ProtectionResult<usize> {
        self.devices
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| ProtectionError::device_not_found(name))
    }

    fn devices_changed(&mut self) {
        self.ranges.invalidate();
        self.reanalyze();
    }

    fn reanalyze(&mut self) {
        self.result = analyze(
            &self.devices,
            &self.fault_levels,
            self.settings.min_margin_s,
            self.store.as_ref(),
        );
    }
}

impl Default for CoordinationStudy {
    fn default() -> Self {
        CoordinationStudy::with_builtin_store()
    }
}
