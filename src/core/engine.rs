use crate::config::{EngineConfig, PixelWindow};
use crate::core::indices::IndexSnapshot;
use crate::core::recovery_rate::{RecoveryMetrics, RecoveryRateEstimator};
use crate::core::survival::{SurvivalAnalyzer, SurvivalMetrics};
use crate::core::timeseries::{TimeSeriesAggregator, TimeSeriesRecord};
use crate::io::synthetic::SceneSynthesizer;
use crate::types::{
    check_shape, Acquisition, FloodMask, IndexGrid, RegrowthError, RegrowthResult,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which analyses an engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineVariant {
    /// Regression metrics plus per-pixel survival analysis
    Survival,
    /// Regression metrics only
    Baseline,
}

impl std::fmt::Display for EngineVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineVariant::Survival => write!(f, "survival"),
            EngineVariant::Baseline => write!(f, "baseline"),
        }
    }
}

/// Output of one flood-event analysis
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub flood_date: NaiveDate,
    pub engine: EngineVariant,
    pub time_series: Vec<TimeSeriesRecord>,
    pub recovery_metrics: RecoveryMetrics,
    /// Present only for the survival variant with post-flood acquisitions
    pub survival: Option<SurvivalMetrics>,
}

/// Compact per-event row for dashboards and event listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub flood_date: NaiveDate,
    pub engine: EngineVariant,
    pub time_series_length: usize,
    pub recovery_percentage: f64,
    pub recovery_rate: f64,
    pub time_to_recovery_days: Option<f64>,
    pub current_ndvi: Option<f64>,
    pub median_recovery_time: Option<f64>,
    pub confidence_score: Option<f64>,
}

impl RecoveryReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            flood_date: self.flood_date,
            engine: self.engine,
            time_series_length: self.time_series.len(),
            recovery_percentage: self.recovery_metrics.recovery_percentage,
            recovery_rate: self.recovery_metrics.recovery_rate,
            time_to_recovery_days: self.recovery_metrics.time_to_recovery_days,
            current_ndvi: self.recovery_metrics.current_ndvi,
            median_recovery_time: self.survival.as_ref().map(|s| s.median_recovery_time),
            confidence_score: self.survival.as_ref().map(|s| s.confidence_score),
        }
    }

    pub fn to_json(&self) -> RegrowthResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RegrowthError::Serialization(format!("recovery report: {}", e)))
    }
}

/// Flood recovery engine: regression metrics, optionally extended with survival analysis
#[derive(Debug, Clone)]
pub struct RecoveryEngine {
    config: EngineConfig,
    variant: EngineVariant,
    survival: Option<SurvivalAnalyzer>,
}

impl RecoveryEngine {
    /// Validate the configuration and pick the richest variant it allows
    pub fn new(config: EngineConfig) -> RegrowthResult<Self> {
        config.validate()?;

        let (variant, survival) = Self::negotiate(&config)?;
        log::info!("Recovery engine initialized ({} variant)", variant);

        Ok(Self {
            config,
            variant,
            survival,
        })
    }

    /// Survival variant when enabled, baseline otherwise
    pub fn negotiate(
        config: &EngineConfig,
    ) -> RegrowthResult<(EngineVariant, Option<SurvivalAnalyzer>)> {
        if !config.survival.enabled {
            log::warn!("Survival analysis disabled, falling back to baseline engine");
            return Ok((EngineVariant::Baseline, None));
        }

        let analyzer = SurvivalAnalyzer::with_threshold_fraction(config.survival.threshold_fraction)?;
        Ok((EngineVariant::Survival, Some(analyzer)))
    }

    /// Engine that only reports regression metrics
    pub fn baseline(mut config: EngineConfig) -> RegrowthResult<Self> {
        config.survival.enabled = false;
        Self::new(config)
    }

    pub fn variant(&self) -> EngineVariant {
        self.variant
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyse a series of acquisitions.
    ///
    /// `baseline_ndvi` is the pre-flood NDVI used for per-pixel thresholds.
    /// Without a `flood_mask`, the configured window (or the centred default)
    /// marks the flooded area.
    pub fn analyze(
        &self,
        flood_date: NaiveDate,
        acquisitions: &[Acquisition],
        baseline_ndvi: &IndexGrid,
        flood_mask: Option<&FloodMask>,
    ) -> RegrowthResult<RecoveryReport> {
        log::info!(
            "Analysing flood event of {} ({} acquisitions, {} engine)",
            flood_date,
            acquisitions.len(),
            self.variant
        );

        if acquisitions.is_empty() {
            return Err(RegrowthError::EmptyInput(
                "no acquisitions supplied for the flood event".to_string(),
            ));
        }

        let snapshots = acquisitions
            .iter()
            .map(IndexSnapshot::from_acquisition)
            .collect::<RegrowthResult<Vec<_>>>()?;

        let time_series = TimeSeriesAggregator::new().aggregate(&snapshots)?;

        let baseline = self.config.rate.baseline.resolve(&time_series, flood_date);
        let recovery_metrics = RecoveryRateEstimator::new(baseline).estimate(&time_series, flood_date);

        let survival = match &self.survival {
            Some(analyzer) => self.run_survival(analyzer, flood_date, &snapshots, baseline_ndvi, flood_mask)?,
            None => None,
        };

        log::info!("Flood event analysis complete");

        Ok(RecoveryReport {
            flood_date,
            engine: self.variant,
            time_series,
            recovery_metrics,
            survival,
        })
    }

    fn run_survival(
        &self,
        analyzer: &SurvivalAnalyzer,
        flood_date: NaiveDate,
        snapshots: &[IndexSnapshot],
        baseline_ndvi: &IndexGrid,
        flood_mask: Option<&FloodMask>,
    ) -> RegrowthResult<Option<SurvivalMetrics>> {
        let stack: Vec<IndexGrid> = snapshots
            .iter()
            .filter(|s| s.date >= flood_date)
            .map(|s| s.ndvi.clone())
            .collect();

        if stack.is_empty() {
            log::warn!("No post-flood acquisitions, survival analysis skipped");
            return Ok(None);
        }

        let dim = baseline_ndvi.dim();
        let mask = match flood_mask {
            Some(mask) => {
                check_shape("flood mask", dim, mask.dim())?;
                mask.clone()
            }
            None => self
                .config
                .flood_window
                .unwrap_or_else(|| PixelWindow::centered(dim))
                .to_mask(dim)?,
        };

        analyzer.analyze(&stack, baseline_ndvi, &mask).map(Some)
    }

    /// Simulate a flood event with `num_time_steps` acquisitions and analyse it
    pub fn process_flood_event(
        &self,
        flood_date: NaiveDate,
        num_time_steps: usize,
    ) -> RegrowthResult<RecoveryReport> {
        log::info!("Processing flood event from {}", flood_date);

        if let Some(window) = &self.config.flood_window {
            window.to_mask((self.config.scene.height, self.config.scene.width))?;
        }

        let mut synthesizer = SceneSynthesizer::new(self.config.scene.clone())?;
        let event = synthesizer.flood_event(flood_date, num_time_steps)?;

        self.analyze(flood_date, &event.acquisitions, &event.baseline_ndvi, None)
    }
}
