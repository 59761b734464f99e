//! # protection_core - Overcurrent Protection Coordination Engine
//!
//! `protection_core` evaluates time-current characteristics of overcurrent
//! relays and fuses, samples them for plotting, and checks that adjacent
//! devices in a radial chain discriminate with a sufficient time margin.
//! All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Synchronous**: plain functions and an explicit study object, no I/O
//!   beyond study files
//! - **JSON-First**: all public data implements Serialize/Deserialize
//! - **Failure in the types**: below-pickup and degenerate samples are
//!   [`OperatingTime`](curves::OperatingTime) values, not errors
//! - **Explicit caches**: owned by the study and invalidated on every change
//!
//! ## Quick Start
//!
//! ```rust
//! use protection_core::curves::{FuseSelection, StandardCurve};
//! use protection_core::device::Device;
//! use protection_core::study::CoordinationStudy;
//!
//! let mut study = CoordinationStudy::with_builtin_store();
//! study.add_device(Device::fuse("TX fuse", FuseSelection::new("CEF", 25.0, "ABB"))?)?;
//! study.add_device(Device::relay("Incomer", 100.0, 0.5, StandardCurve::IecStandardInverse)?)?;
//! study.add_fault_level(1000.0)?;
//!
//! assert!(study.result().is_fully_coordinated);
//!
//! // Serialize to JSON for storage or transmission
//! let json = serde_json::to_string_pretty(study.result()).unwrap();
//! assert!(json.contains("\"margin_s\""));
//! # Ok::<(), protection_core::errors::ProtectionError>(())
//! ```
//!
//! ## Modules
//!
//! - [`curves`] - Curve constants, fuse tables and operating-time evaluation
//! - [`device`] - Validated relay and fuse descriptions
//! - [`analysis`] - Coordination margins, curve sampling and chart ranges
//! - [`study`] - A mutable study that keeps analysis and caches current
//! - [`study_file`] - Study documents with atomic saves
//! - [`errors`] - Structured error types

pub mod analysis;
pub mod curves;
pub mod device;
pub mod errors;
pub mod study;
pub mod study_file;

// Re-export commonly used types at crate root for convenience
pub use analysis::{AnalysisResult, ChartRanges, CoordinationPair, CurvePoint, MarginSample, Verdict};
pub use curves::{FuseCurveStore, FuseSelection, OperatingTime, ReferenceFuseStore, StandardCurve};
pub use device::{CurveFamily, CurveKind, Device, DeviceKind};
pub use errors::{ProtectionError, ProtectionResult};
pub use study::{AnalysisSettings, CoordinationStudy};
pub use study_file::{load_study, save_study, StudyFile, StudyMetadata};
