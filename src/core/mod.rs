//! Core recovery analysis modules

pub mod indices;
pub mod timeseries;
pub mod recovery_rate;
pub mod survival;
pub mod engine;

// Re-export main types
pub use indices::{IndexSnapshot, OpticalIndices, RadarMetrics, ndvi, ndwi, normalized_difference, db_to_linear, linear_to_db, radar_backscatter};
pub use timeseries::{TimeSeriesAggregator, TimeSeriesRecord, nan_mean, nan_std};
pub use recovery_rate::{RecoveryRateEstimator, RecoveryMetrics, LinearFit, linear_fit, baseline_from_pre_flood};
pub use survival::{SurvivalAnalyzer, SurvivalMetrics, EventTimeMatrix, KaplanMeierFit, SurvivalStep};
pub use engine::{RecoveryEngine, RecoveryReport, ReportSummary, EngineVariant};
