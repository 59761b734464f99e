//! # Error Types
//!
//! Structured error types for protection_core. Routine numeric outcomes
//! (current below pickup, degenerate curve samples, pairs without data) are
//! not errors; they are carried by [`OperatingTime`](crate::curves::OperatingTime)
//! and by omission from results. Errors are reserved for invalid
//! configuration and file handling.
//!
//! ## Example
//!
//! ```rust
//! use protection_core::errors::{ProtectionError, ProtectionResult};
//!
//! fn validate_pickup(pickup_a: f64) -> ProtectionResult<()> {
//!     if !(pickup_a > 0.0) {
//!         return Err(ProtectionError::InvalidInput {
//!             field: "pickup_current_a".to_string(),
//!             value: pickup_a.to_string(),
//!             reason: "Pickup current must be positive".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_pickup(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for protection_core operations
pub type ProtectionResult<T> = Result<T, ProtectionError>;

/// Structured error type for study configuration and file operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ProtectionError {
    /// An input value is invalid (non-positive pickup, bad fault level, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// No device with this name in the study
    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    /// A device with this name already exists in the study
    #[error("Duplicate device name: {name}")]
    DuplicateDevice { name: String },

    /// Named curve family is not in the catalogue
    #[error("Curve not found: {curve_name}")]
    CurveNotFound { curve_name: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Study file schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl ProtectionError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ProtectionError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        ProtectionError::MissingField {
            field: field.into(),
        }
    }

    /// Create a DeviceNotFound error
    pub fn device_not_found(name: impl Into<String>) -> Self {
        ProtectionError::DeviceNotFound { name: name.into() }
    }

    /// Create a DuplicateDevice error
    pub fn duplicate_device(name: impl Into<String>) -> Self {
        ProtectionError::DuplicateDevice { name: name.into() }
    }

    /// Create a CurveNotFound error
    pub fn curve_not_found(curve_name: impl Into<String>) -> Self {
        ProtectionError::CurveNotFound {
            curve_name: curve_name.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        ProtectionError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        ProtectionError::SerializationError {
            reason: reason.into(),
        }
    }

    /// True when the error comes from caller-supplied configuration rather
    /// than the environment (files, internal faults).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ProtectionError::InvalidInput { .. }
                | ProtectionError::MissingField { .. }
                | ProtectionError::DeviceNotFound { .. }
                | ProtectionError::DuplicateDevice { .. }
                | ProtectionError::CurveNotFound { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ProtectionError::InvalidInput { .. } => "INVALID_INPUT",
            ProtectionError::MissingField { .. } => "MISSING_FIELD",
            ProtectionError::DeviceNotFound { .. } => "DEVICE_NOT_FOUND",
            ProtectionError::DuplicateDevice { .. } => "DUPLICATE_DEVICE",
            ProtectionError::CurveNotFound { .. } => "CURVE_NOT_FOUND",
            ProtectionError::FileError { .. } => "FILE_ERROR",
            ProtectionError::SerializationError { .. } => "SERIALIZATION_ERROR",
            ProtectionError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
