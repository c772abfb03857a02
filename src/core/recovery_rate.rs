use crate::core::timeseries::TimeSeriesRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Regression-based recovery summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    /// NDVI change per day since the flood
    pub recovery_rate: f64,
    /// Days until baseline is reached at the current rate. `None` when
    /// already recovered, diverging, or indeterminate.
    pub time_to_recovery_days: Option<f64>,
    /// Current NDVI as a percentage of baseline, capped at 100
    pub recovery_percentage: f64,
    /// `None` only when there is no post-flood observation
    pub current_ndvi: Option<f64>,
    pub baseline_ndvi: f64,
}

/// Ordinary least squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Degree-1 least-squares fit. Returns `None` for fewer than two points or
/// when every `x` is identical.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x[..n].iter().zip(&y[..n]) {
        let dx = xi - mean_x;
        sxx += dx * dx;
        sxy += dx * (yi - mean_y);
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Mean NDVI over records dated strictly before the flood, ignoring
/// acquisitions without valid pixels
pub fn baseline_from_pre_flood(records: &[TimeSeriesRecord], flood_date: NaiveDate) -> Option<f64> {
    let pre_flood: Vec<f64> = records
        .iter()
        .filter(|r| r.date < flood_date && r.mean_ndvi.is_finite())
        .map(|r| r.mean_ndvi)
        .collect();

    if pre_flood.is_empty() {
        None
    } else {
        Some(pre_flood.iter().sum::<f64>() / pre_flood.len() as f64)
    }
}

/// Estimates recovery rate, percentage and ETA from the aggregated series
#[derive(Debug, Clone)]
pub struct RecoveryRateEstimator {
    baseline_ndvi: f64,
}

impl RecoveryRateEstimator {
    pub fn new(baseline_ndvi: f64) -> Self {
        Self { baseline_ndvi }
    }

    pub fn baseline_ndvi(&self) -> f64 {
        self.baseline_ndvi
    }

    /// Fit the post-flood NDVI trend (records dated on or after `flood_date`).
    ///
    /// Records whose mean NDVI is NaN carry no observation and are left out
    /// of the regression.
    pub fn estimate(&self, records: &[TimeSeriesRecord], flood_date: NaiveDate) -> RecoveryMetrics {
        let post_flood: Vec<(usize, &TimeSeriesRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.date >= flood_date)
            .collect();

        log::info!(
            "Estimating recovery rate from {} post-flood records (baseline NDVI {:.3})",
            post_flood.len(),
            self.baseline_ndvi
        );

        // Latest date wins; equal dates resolve to the later input position
        let current = match post_flood.iter().max_by_key(|(i, r)| (r.date, *i)) {
            Some((_, record)) => record.mean_ndvi,
            None => {
                log::warn!("No acquisitions on or after flood date {}", flood_date);
                return RecoveryMetrics {
                    recovery_rate: 0.0,
                    time_to_recovery_days: None,
                    recovery_percentage: 0.0,
                    current_ndvi: None,
                    baseline_ndvi: self.baseline_ndvi,
                };
            }
        };

        let (days, ndvi): (Vec<f64>, Vec<f64>) = post_flood
            .iter()
            .filter(|(_, r)| !r.mean_ndvi.is_nan())
            .map(|(_, r)| ((r.date - flood_date).num_days() as f64, r.mean_ndvi))
            .unzip();

        let recovery_rate = match linear_fit(&days, &ndvi) {
            Some(fit) => fit.slope,
            None => {
                log::debug!("Fewer than two distinct observation days, recovery rate set to 0");
                0.0
            }
        };

        let recovery_percentage = if self.baseline_ndvi > 0.0 && !current.is_nan() {
            (current / self.baseline_ndvi * 100.0).min(100.0)
        } else {
            0.0
        };

        let time_to_recovery_days = if recovery_rate > 0.0 && current < self.baseline_ndvi {
            Some((self.baseline_ndvi - current) / recovery_rate)
        } else {
            None
        };

        let metrics = RecoveryMetrics {
            recovery_rate,
            time_to_recovery_days,
            recovery_percentage,
            current_ndvi: Some(current),
            baseline_ndvi: self.baseline_ndvi,
        };

        log::info!(
            "Recovery rate {:.6}/day, {:.1}% of baseline, ETA {:?} days",
            metrics.recovery_rate,
            metrics.recovery_percentage,
            metrics.time_to_recovery_days
        );

        metrics
    }
}
