//! # Kaldor Analytics Engine
//!
//! This crate turns raw loom measurement windows into health signals: anomaly
//! flags, a maintenance outlook, and quality summaries.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of databases or
//!   HTTP. It depends only on `core-types` and the thresholds in `configuration`.
//! - **Stateless Calculation:** Every component is a small calculator that takes an
//!   immutable window and returns a fresh report, so all of them are safe to share
//!   across concurrent requests.
//!
//! ## Public API
//!
//! - `AnomalyDetector`: z-score outlier detection over `bbw_avg`.
//! - `TrendEstimator`: regression of hourly variability into a `HealthAssessment`.
//! - `QualityAggregator`: count/mean/spread/range roll-ups for a period.
//! - The report structs, which are the JSON payloads served to consumers.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod anomaly;
pub mod error;
pub mod quality;
pub mod report;
pub mod stats;
pub mod trend;

// Re-export the key components to create a clean, public-facing API.
pub use anomaly::{AnomalyDetector, AnomalyScan};
pub use error::AnalyticsError;
pub use quality::QualityAggregator;
pub use report::{
    AnomalyPoint, AnomalyReport, HealthAssessment, LoomSummary, Period, QualityMeasurements,
    QualityReport, SummaryFigures, WindowStatistics, ZScoreResult,
};
pub use trend::TrendEstimator;
