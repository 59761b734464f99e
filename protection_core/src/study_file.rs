//! # Study Files
//!
//! A [`StudyFile`] is the saved form of a coordination study: metadata,
//! settings, the device chain and the fault levels, as pretty-printed JSON.
//!
//! Saves are atomic: the document is written to a `.tmp` sibling, synced,
//! then renamed over the target so an interrupted save never leaves a
//! truncated study behind.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "meta": {
//!     "version": "0.1.0",
//!     "title": "Substation A feeder 3",
//!     "engineer": "J. Engineer",
//!     "job_id": "25-014",
//!     "created": "2025-03-01T09:00:00Z",
//!     "modified": "2025-03-01T09:00:00Z"
//!   },
//!   "settings": { "min_margin_s": 0.3 },
//!   "devices": [
//!     { "name": "Feeder", "kind": "relay", "pickup_current_a": 100.0,
//!       "time_dial": 0.2, "curve_family": "IEC-SI" },
//!     { "name": "Incomer", "kind": "relay", "pickup_current_a": 100.0,
//!       "time_dial": 0.5, "curve_family": "IEC-SI" }
//!   ],
//!   "fault_levels_a": [1000.0, 5000.0]
//! }
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use protection_core::study::CoordinationStudy;
//! use protection_core::study_file::{load_study, save_study, StudyMetadata};
//! use std::path::Path;
//!
//! let file = load_study(Path::new("feeder3.json"))?;
//! let mut study = CoordinationStudy::from_file(file, protection_core::curves::ReferenceFuseStore::builtin())?;
//! study.set_time_dial("Feeder", 0.25)?;
//!
//! let meta = StudyMetadata::new("Feeder 3", "J. Engineer", "25-014");
//! save_study(&study.to_file(meta), Path::new("feeder3.json"))?;
//! # Ok::<(), protection_core::errors::ProtectionError>(())
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::errors::{ProtectionError, ProtectionResult};
use crate::study::AnalysisSettings;

/// Current schema version for study files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Study metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMetadata {
    /// Schema version the file was written with
    pub version: String,
    /// Study title
    #[serde(default)]
    pub title: String,
    /// Responsible engineer
    #[serde(default)]
    pub engineer: String,
    /// Job number
    #[serde(default)]
    pub job_id: String,
    /// When the study was created
    pub created: DateTime<Utc>,
    /// When the study was last written
    pub modified: DateTime<Utc>,
}

impl StudyMetadata {
    /// Metadata for a new study at the current schema version
    pub fn new(title: impl Into<String>, engineer: impl Into<String>, job_id: impl Into<String>) -> Self {
        let now = Utc::now();
        StudyMetadata {
            version: SCHEMA_VERSION.to_string(),
            title: title.into(),
            engineer: engineer.into(),
            job_id: job_id.into(),
            created: now,
            modified: now,
        }
    }

    /// Stamp the modification time
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

/// Saved study document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyFile {
    /// Metadata
    pub meta: StudyMetadata,
    /// Analysis settings
    #[serde(default)]
    pub settings: AnalysisSettings,
    /// Device chain, primary first
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Fault levels to check (A)
    #[serde(default)]
    pub fault_levels_a: Vec<f64>,
}

impl StudyFile {
    /// Empty study document
    pub fn new(meta: StudyMetadata) -> Self {
        StudyFile {
            meta,
            settings: AnalysisSettings::default(),
            devices: Vec::new(),
            fault_levels_a: Vec::new(),
        }
    }

    /// Parse a study document from JSON and check its schema version.
    pub fn from_json(json: &str) -> ProtectionResult<Self> {
        let file: StudyFile = serde_json::from_str(json).map_err(|e| ProtectionError::serialization(e.to_string()))?;
        validate_version(&file.meta.version)?;
        Ok(file)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> ProtectionResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ProtectionError::serialization(e.to_string()))
    }
}

/// Save a study document with atomic write semantics.
///
/// Writes `<path>.tmp`, syncs it, then renames it over `path`. On a failed
/// rename the temporary file is removed.
pub fn save_study(file: &StudyFile, path: &Path) -> ProtectionResult<()> {
    let json = file.to_json()?;
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| ProtectionError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| ProtectionError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .sync_all()
        .map_err(|e| ProtectionError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;
    drop(tmp_file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        ProtectionError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    tracing::debug!(path = %path.display(), devices = file.devices.len(), "study saved");
    Ok(())
}

/// Load a study document.
///
/// # Errors
///
/// * `FileError` - the file cannot be read
/// * `SerializationError` - invalid JSON or an invalid device
/// * `VersionMismatch` - incompatible schema version
pub fn load_study(path: &Path) -> ProtectionResult<StudyFile> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ProtectionError::file_error("read", path.display().to_string(), e.to_string()))?;

    let file: StudyFile = serde_json::from_str(&contents)
        .map_err(|e| ProtectionError::serialization(format!("Invalid study in {}: {}", path.display(), e)))?;
    validate_version(&file.meta.version)?;

    tracing::debug!(path = %path.display(), devices = file.devices.len(), "study loaded");
    Ok(file)
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Check a file's schema version against [`SCHEMA_VERSION`].
///
/// Major versions must match; while the schema is `0.x`, a newer minor
/// version is also rejected.
pub fn validate_version(file_version: &str) -> ProtectionResult<()> {
    let mismatch = || ProtectionError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts = parse_version(file_version).ok_or_else(mismatch)?;
    let current_parts = parse_version(SCHEMA_VERSION).ok_or_else(mismatch)?;

    if file_parts.0 != current_parts.0 {
        return Err(mismatch());
    }
    if current_parts.0 == 0 && file_parts.1 > current_parts.1 {
        return Err(mismatch());
    }
    Ok(())
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::StandardCurve;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn temp_study_path(name: &str) -> PathBuf {
        temp_dir().join(format!("protection_test_{}_{}.json", name, std::process::id()))
    }

    fn sample_file() -> StudyFile {
        let mut file = StudyFile::new(StudyMetadata::new("Feeder 3", "Test Engineer", "TEST-001"));
        file.devices = vec![
            Device::relay("Feeder", 100.0, 0.2, StandardCurve::IecStandardInverse).unwrap(),
            Device::relay("Incomer", 100.0, 0.5, StandardCurve::IecStandardInverse).unwrap(),
        ];
        file.fault_levels_a = vec![1000.0, 5000.0];
        file
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_study_path("roundtrip");
        let file = sample_file();
        save_study(&file, &path).unwrap();

        let loaded = load_study(&path).unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.meta.job_id, "TEST-001");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_study_path("atomic");
        save_study(&sample_file(), &path).unwrap();

        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_tmp_path_keeps_extension() {
        let tmp = tmp_path_for(Path::new("/studies/feeder.json"));
        assert_eq!(tmp, Path::new("/studies/feeder.json.tmp"));
    }

    #[test]
    fn test_missing_file_is_file_error() {
        let err = load_study(&temp_study_path("does_not_exist")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("latest").is_err());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "meta": {
                "version": "0.1.0",
                "created": "2025-03-01T09:00:00Z",
                "modified": "2025-03-01T09:00:00Z"
            },
            "devices": [
                { "name": "F1", "kind": "fuse",
                  "curve_family": { "fuse_type": "CEF", "rating_a": 25.0, "manufacturer": "ABB" } }
            ]
        }"#;
        let file = StudyFile::from_json(json).unwrap();
        assert_eq!(file.settings, AnalysisSettings::default());
        assert!(file.fault_levels_a.is_empty());
        assert_eq!(file.devices[0].pickup_current_a(), 25.0);
    }

    #[test]
    fn test_invalid_device_is_serialization_error() {
        let json = r#"{
            "meta": {
                "version": "0.1.0",
                "created": "2025-03-01T09:00:00Z",
                "modified": "2025-03-01T09:00:00Z"
            },
            "devices": [
                { "name": "R1", "kind": "relay", "pickup_current_a": 0.0, "curve_family": "IEC-SI" }
            ]
        }"#;
        let err = StudyFile::from_json(json).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
        assert!(err.to_string().contains("pickup_current_a"));
    }

    #[test]
    fn test_newer_major_version_rejected() {
        let mut file = sample_file();
        file.meta.version = "2.0.0".to_string();
        let json = file.to_json().unwrap();
        let err = StudyFile::from_json(&json).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");
    }

    #[test]
    fn test_demo_study_parses() {
        let file = StudyFile::from_json(include_str!("../../demos/feeder_study.json")).unwrap();
        assert_eq!(file.devices.len(), 4);
        assert_eq!(file.fault_levels_a.len(), 4);
        assert!(file.devices[3].is_definite());
    }
}
