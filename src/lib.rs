//! Regrowth: post-flood land recovery metrics from Sentinel-1/Sentinel-2 grids
//!
//! Spectral indices and radar backscatter are computed per acquisition,
//! reduced to a time series, and turned into a regression-based recovery
//! estimate plus a per-pixel survival analysis of time to recovery.

pub mod types;
pub mod config;
pub mod core;
pub mod io;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use crate::types::{
    Acquisition, BandGrid, FloodMask, IndexGrid, OpticalBands, Polarization, RadarBands,
    RegrowthError, RegrowthResult, parse_date,
};

pub use crate::config::{BaselineSource, EngineConfig, PixelWindow, RateConfig, SurvivalConfig};
pub use crate::core::{
    EngineVariant, RecoveryEngine, RecoveryMetrics, RecoveryReport, ReportSummary,
    SurvivalMetrics, TimeSeriesRecord,
};
pub use crate::io::{SceneSynthesizer, SyntheticSceneConfig};
