//! # Coordination Analysis
//!
//! The analysis pipeline over a device chain:
//!
//! - [`coordination`] - adjacent-pair discrimination margins per fault level
//! - [`curve_points`] - sampled, cached time-current curves for plotting
//! - [`chart_range`] - stable plot axis bounds over all curves
//!
//! Each stage is usable on its own; [`CoordinationStudy`](crate::study::CoordinationStudy)
//! wires them together and keeps their caches consistent.

pub mod chart_range;
pub mod coordination;
pub mod curve_points;

// Re-export commonly used types
pub use chart_range::{ChartRangeEstimator, ChartRanges};
pub use coordination::{
    analyze, AnalysisResult, CoordinationPair, MarginSample, PairRef, Verdict, DEFAULT_MIN_MARGIN_S,
};
pub use curve_points::{CurvePoint, CurvePointGenerator, DeviceCurve};
