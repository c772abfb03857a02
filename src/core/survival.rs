//! Per-pixel time-to-recovery analysis
//!
//! Every flooded pixel is treated as a subject whose "event" is regaining a
//! fixed fraction of its own pre-flood NDVI. Pixels that never get there
//! within the observed horizon are right-censored at the horizon. The
//! censored durations are then summarised with a Kaplan-Meier estimator.

use crate::types::{check_shape, FloodMask, IndexGrid, RegrowthError, RegrowthResult};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Default fraction of baseline NDVI a pixel must regain to count as recovered
pub const DEFAULT_THRESHOLD_FRACTION: f64 = 0.9;

/// Per-pixel event times for one flood event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTimeMatrix {
    /// 1-indexed step of first recovery, or the horizon length when censored
    pub time_to_event: Array2<f64>,
    pub event_observed: Array2<bool>,
}

impl EventTimeMatrix {
    /// Every pixel censored at `horizon`
    pub fn censored(dim: (usize, usize), horizon: usize) -> Self {
        Self {
            time_to_event: Array2::from_elem(dim, horizon as f64),
            event_observed: Array2::from_elem(dim, false),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.time_to_event.dim()
    }

    /// (duration, observed) pairs for the masked pixels, in row-major order
    pub fn masked_samples(&self, mask: &FloodMask) -> (Vec<f64>, Vec<bool>) {
        let mut durations = Vec::new();
        let mut observed = Vec::new();

        Zip::from(&self.time_to_event)
            .and(&self.event_observed)
            .and(mask)
            .for_each(|&t, &e, &m| {
                if m {
                    durations.push(t);
                    observed.push(e);
                }
            });

        (durations, observed)
    }
}

/// One row of the Kaplan-Meier life table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalStep {
    pub time: f64,
    pub at_risk: usize,
    pub events: usize,
    pub censored: usize,
    /// Estimated probability of remaining unrecovered after `time`
    pub survival: f64,
}

/// Kaplan-Meier estimate of the survival function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KaplanMeierFit {
    pub timeline: Vec<SurvivalStep>,
    /// First time at which survival drops to 0.5 or below, infinite if never
    pub median_survival_time: f64,
    pub sample_size: usize,
}

impl KaplanMeierFit {
    /// Fit the product-limit estimator. Returns `None` for an empty sample.
    pub fn fit(durations: &[f64], observed: &[bool]) -> Option<Self> {
        let n = durations.len().min(observed.len());
        if n == 0 {
            return None;
        }

        let mut samples: Vec<(f64, bool)> = durations[..n]
            .iter()
            .copied()
            .zip(observed[..n].iter().copied())
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut timeline = Vec::new();
        let mut at_risk = n;
        let mut survival = 1.0;
        let mut idx = 0;

        while idx < samples.len() {
            let time = samples[idx].0;
            let mut events = 0;
            let mut censored = 0;
            while idx < samples.len() && samples[idx].0 == time {
                if samples[idx].1 {
                    events += 1;
                } else {
                    censored += 1;
                }
                idx += 1;
            }

            // Censored subjects at `time` are still at risk for events at `time`
            survival *= 1.0 - events as f64 / at_risk as f64;
            timeline.push(SurvivalStep {
                time,
                at_risk,
                events,
                censored,
                survival,
            });
            at_risk -= events + censored;
        }

        let median_survival_time = timeline
            .iter()
            .find(|step| step.survival <= 0.5)
            .map(|step| step.time)
            .unwrap_or(f64::INFINITY);

        Some(Self {
            timeline,
            median_survival_time,
            sample_size: n,
        })
    }

    /// Survival probability S(t), a right-continuous step function
    pub fn survival_at(&self, time: f64) -> f64 {
        self.timeline
            .iter()
            .take_while(|step| step.time <= time)
            .last()
            .map(|step| step.survival)
            .unwrap_or(1.0)
    }

    /// Probability that a pixel has recovered by `time`, i.e. `1 - S(t)`
    pub fn recovery_probability_at(&self, time: f64) -> f64 {
        1.0 - self.survival_at(time)
    }
}

/// Survival-based recovery summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalMetrics {
    /// In time steps. 0 when no pixel is flooded, infinite when fewer than
    /// half of the flooded pixels recovered.
    pub median_recovery_time: f64,
    /// Percentage of flooded pixels with an observed recovery
    pub confidence_score: f64,
    pub recovery_map: EventTimeMatrix,
    pub masked_pixels: usize,
    pub observed_events: usize,
    pub curve: Option<KaplanMeierFit>,
}

/// Event-time scan and Kaplan-Meier fit over an NDVI stack
#[derive(Debug, Clone)]
pub struct SurvivalAnalyzer {
    threshold_fraction: f64,
}

impl SurvivalAnalyzer {
    pub fn new() -> Self {
        Self {
            threshold_fraction: DEFAULT_THRESHOLD_FRACTION,
        }
    }

    pub fn with_threshold_fraction(threshold_fraction: f64) -> RegrowthResult<Self> {
        if !threshold_fraction.is_finite() {
            return Err(RegrowthError::InvalidParameter(format!(
                "recovery threshold fraction must be finite, got {}",
                threshold_fraction
            )));
        }
        Ok(Self { threshold_fraction })
    }

    pub fn threshold_fraction(&self) -> f64 {
        self.threshold_fraction
    }

    /// Per-pixel recovery threshold
    pub fn recovery_threshold(&self, baseline_ndvi: &IndexGrid) -> IndexGrid {
        baseline_ndvi.mapv(|b| b * self.threshold_fraction)
    }

    /// Scan the stack in time order and freeze each masked pixel at the first
    /// step where it reaches its threshold. Later drops do not undo a recovery.
    pub fn scan_event_times(
        &self,
        ndvi_stack: &[IndexGrid],
        baseline_ndvi: &IndexGrid,
        flood_mask: &FloodMask,
    ) -> RegrowthResult<EventTimeMatrix> {
        if ndvi_stack.is_empty() {
            return Err(RegrowthError::EmptyInput(
                "survival analysis requires at least one NDVI time step".to_string(),
            ));
        }

        let dim = baseline_ndvi.dim();
        check_shape("flood mask", dim, flood_mask.dim())?;
        for (step, frame) in ndvi_stack.iter().enumerate() {
            check_shape(&format!("NDVI step {}", step + 1), dim, frame.dim())?;
        }

        log::debug!(
            "Scanning {} time steps over {}x{} pixels (threshold {:.2} x baseline)",
            ndvi_stack.len(),
            dim.0,
            dim.1,
            self.threshold_fraction
        );

        let threshold = self.recovery_threshold(baseline_ndvi);
        let mut events = EventTimeMatrix::censored(dim, ndvi_stack.len());

        // Steps must be visited in order: "already observed" depends on earlier steps
        for (step, frame) in ndvi_stack.iter().enumerate() {
            let event_time = (step + 1) as f64;
            freeze_recovered(&mut events, frame, &threshold, flood_mask, event_time);
        }

        Ok(events)
    }

    /// Event-time scan followed by a Kaplan-Meier fit over the flooded pixels
    pub fn analyze(
        &self,
        ndvi_stack: &[IndexGrid],
        baseline_ndvi: &IndexGrid,
        flood_mask: &FloodMask,
    ) -> RegrowthResult<SurvivalMetrics> {
        log::info!("Running survival analysis over {} time steps", ndvi_stack.len());

        let recovery_map = self.scan_event_times(ndvi_stack, baseline_ndvi, flood_mask)?;
        let (durations, observed) = recovery_map.masked_samples(flood_mask);

        let masked_pixels = durations.len();
        let observed_events = observed.iter().filter(|&&e| e).count();

        if masked_pixels == 0 {
            log::warn!("Flood mask selects no pixels, skipping Kaplan-Meier fit");
            return Ok(SurvivalMetrics {
                median_recovery_time: 0.0,
                confidence_score: 0.0,
                recovery_map,
                masked_pixels,
                observed_events,
                curve: None,
            });
        }

        let curve = KaplanMeierFit::fit(&durations, &observed);
        let median_recovery_time = curve
            .as_ref()
            .map(|fit| fit.median_survival_time)
            .unwrap_or(0.0);
        let confidence_score = observed_events as f64 / masked_pixels as f64 * 100.0;

        log::info!(
            "Survival analysis: median recovery {} steps, {}/{} pixels recovered ({:.2}%)",
            median_recovery_time,
            observed_events,
            masked_pixels,
            confidence_score
        );

        Ok(SurvivalMetrics {
            median_recovery_time,
            confidence_score,
            recovery_map,
            masked_pixels,
            observed_events,
            curve,
        })
    }
}

impl Default for SurvivalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "parallel")]
fn freeze_recovered(
    events: &mut EventTimeMatrix,
    frame: &IndexGrid,
    threshold: &IndexGrid,
    mask: &FloodMask,
    event_time: f64,
) {
    Zip::from(&mut events.time_to_event)
        .and(&mut events.event_observed)
        .and(frame)
        .and(threshold)
        .and(mask)
        .par_for_each(|t, e, &value, &thr, &inside| {
            if inside && !*e && value >= thr {
                *t = event_time;
                *e = true;
            }
        });
}

#[cfg(not(feature = "parallel"))]
fn freeze_recovered(
    events: &mut EventTimeMatrix,
    frame: &IndexGrid,
    threshold: &IndexGrid,
    mask: &FloodMask,
    event_time: f64,
) {
    Zip::from(&mut events.time_to_event)
        .and(&mut events.event_observed)
        .and(frame)
        .and(threshold)
        .and(mask)
        .for_each(|t, e, &value, &thr, &inside| {
            if inside && !*e && value >= thr {
                *t = event_time;
                *e = true;
            }
        });
}
