//! Engine configuration
//!
//! Every tunable that used to be a literal (baseline NDVI, recovery threshold
//! fraction, flood extent) is an explicit, serializable parameter here. All
//! sections use `#[serde(default)]`, so a JSON document only needs the keys it
//! overrides.

use crate::core::recovery_rate::baseline_from_pre_flood;
use crate::core::survival::DEFAULT_THRESHOLD_FRACTION;
use crate::core::timeseries::TimeSeriesRecord;
use crate::io::synthetic::SyntheticSceneConfig;
use crate::types::{FloodMask, RegrowthError, RegrowthResult};
use chrono::NaiveDate;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pre-flood NDVI used when no history is available
pub const DEFAULT_BASELINE_NDVI: f64 = 0.6;

/// Where the regression's reference NDVI comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineSource {
    /// Fixed pre-flood NDVI
    Fixed { ndvi: f64 },
    /// Mean NDVI of acquisitions before the flood, `fallback_ndvi` if there are none
    PreFloodMean { fallback_ndvi: f64 },
}

impl Default for BaselineSource {
    fn default() -> Self {
        BaselineSource::Fixed {
            ndvi: DEFAULT_BASELINE_NDVI,
        }
    }
}

impl BaselineSource {
    pub fn resolve(&self, records: &[TimeSeriesRecord], flood_date: NaiveDate) -> f64 {
        match self {
            BaselineSource::Fixed { ndvi } => *ndvi,
            BaselineSource::PreFloodMean { fallback_ndvi } => {
                match baseline_from_pre_flood(records, flood_date) {
                    Some(baseline) => baseline,
                    None => {
                        log::warn!(
                            "No pre-flood acquisitions, using fallback baseline NDVI {:.3}",
                            fallback_ndvi
                        );
                        *fallback_ndvi
                    }
                }
            }
        }
    }

    fn reference_value(&self) -> f64 {
        match self {
            BaselineSource::Fixed { ndvi } => *ndvi,
            BaselineSource::PreFloodMean { fallback_ndvi } => *fallback_ndvi,
        }
    }
}

/// Regression-based recovery estimation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub baseline: BaselineSource,
}

/// Per-pixel survival analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Disabled engines report only the regression metrics
    pub enabled: bool,
    /// Fraction of baseline NDVI that counts as recovered
    pub threshold_fraction: f64,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_fraction: DEFAULT_THRESHOLD_FRACTION,
        }
    }
}

/// Half-open pixel rectangle `[row_start, row_end) x [col_start, col_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl PixelWindow {
    /// Central window covering 30% to 70% of each axis
    pub fn centered(dim: (usize, usize)) -> Self {
        let (height, width) = dim;
        Self {
            row_start: height * 3 / 10,
            row_end: height * 7 / 10,
            col_start: width * 3 / 10,
            col_end: width * 7 / 10,
        }
    }

    /// Start bounds must not exceed end bounds
    pub fn validate(&self) -> RegrowthResult<()> {
        if self.row_start > self.row_end || self.col_start > self.col_end {
            return Err(RegrowthError::InvalidParameter(format!(
                "flood window {:?} has start bounds past its end bounds",
                self
            )));
        }
        Ok(())
    }

    /// Rasterize the window as a flood mask. The window must lie inside the grid.
    pub fn to_mask(&self, dim: (usize, usize)) -> RegrowthResult<FloodMask> {
        self.validate()?;

        let (height, width) = dim;
        if self.row_end > height || self.col_end > width {
            return Err(RegrowthError::InvalidParameter(format!(
                "flood window {:?} does not fit a {}x{} grid",
                self, height, width
            )));
        }

        let mut mask = Array2::from_elem(dim, false);
        mask.slice_mut(s![self.row_start..self.row_end, self.col_start..self.col_end])
            .fill(true);
        Ok(mask)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rate: RateConfig,
    pub survival: SurvivalConfig,
    /// Scene used by `process_flood_event`
    pub scene: SyntheticSceneConfig,
    /// Flood extent when the caller supplies no mask; centred window if absent
    pub flood_window: Option<PixelWindow>,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> RegrowthResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RegrowthError::Config(format!("Invalid engine configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> RegrowthResult<Self> {
        log::info!("Loading engine configuration from {}", path.as_ref().display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> RegrowthResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RegrowthError::Serialization(format!("engine configuration: {}", e)))
    }

    pub fn validate(&self) -> RegrowthResult<()> {
        let baseline = self.rate.baseline.reference_value();
        if !baseline.is_finite() {
            return Err(RegrowthError::InvalidParameter(format!(
                "baseline NDVI must be finite, got {}",
                baseline
            )));
        }

        let fraction = self.survival.threshold_fraction;
        if !fraction.is_finite() || fraction <= 0.0 {
            return Err(RegrowthError::InvalidParameter(format!(
                "recovery threshold fraction must be positive, got {}",
                fraction
            )));
        }

        self.scene.validate()?;

        // Grid bounds are checked against the analysed grids, not here
        if let Some(window) = &self.flood_window {
            window.validate()?;
        }
        Ok(())
    }
}
