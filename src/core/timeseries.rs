use crate::core::indices::IndexSnapshot;
use crate::types::{Polarization, RegrowthError, RegrowthResult};
use chrono::NaiveDate;
use ndarray::{ArrayBase, Data, Dimension};
use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};

/// Scalar summary of one acquisition date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub date: NaiveDate,
    pub mean_ndvi: f64,
    pub std_ndvi: f64,
    pub mean_ndwi: Option<f64>,
    pub mean_vv_backscatter: Option<f64>,
}

/// Mean over the non-NaN elements; NaN when every element is NaN
pub fn nan_mean<S, D, T>(data: &ArrayBase<S, D>) -> T
where
    S: Data<Elem = T>,
    D: Dimension,
    T: Float,
{
    let (sum, count) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((T::zero(), 0usize), |(sum, count), &v| (sum + v, count + 1));

    if count == 0 {
        T::nan()
    } else {
        sum / <T as NumCast>::from(count).unwrap_or_else(T::nan)
    }
}

/// Population standard deviation over the non-NaN elements
pub fn nan_std<S, D, T>(data: &ArrayBase<S, D>) -> T
where
    S: Data<Elem = T>,
    D: Dimension,
    T: Float,
{
    let mean = nan_mean(data);
    if mean.is_nan() {
        return T::nan();
    }

    let (sum_sq, count) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((T::zero(), 0usize), |(acc, count), &v| {
            let diff = v - mean;
            (acc + diff * diff, count + 1)
        });

    (sum_sq / <T as NumCast>::from(count).unwrap_or_else(T::nan)).sqrt()
}

/// Reduces per-date index grids to an ordered series of scalar statistics
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesAggregator;

impl TimeSeriesAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Summarize each snapshot. Output has the same length and order as the
    /// input; the caller is responsible for chronological order.
    pub fn aggregate(&self, snapshots: &[IndexSnapshot]) -> RegrowthResult<Vec<TimeSeriesRecord>> {
        if snapshots.is_empty() {
            return Err(RegrowthError::EmptyInput(
                "time series requires at least one acquisition".to_string(),
            ));
        }

        log::info!("Aggregating time series over {} acquisitions", snapshots.len());

        if let Some(pair) = snapshots.windows(2).find(|w| w[1].date < w[0].date) {
            log::warn!(
                "Acquisition dates are not in chronological order ({} follows {})",
                pair[1].date,
                pair[0].date
            );
        }

        let records = summarize_all(snapshots);

        let missing = records.iter().filter(|r| r.mean_ndvi.is_nan()).count();
        if missing > 0 {
            log::warn!("{} acquisitions have no valid NDVI pixels", missing);
        }

        Ok(records)
    }

    /// Statistics for one snapshot
    pub fn summarize(snapshot: &IndexSnapshot) -> TimeSeriesRecord {
        TimeSeriesRecord {
            date: snapshot.date,
            mean_ndvi: nan_mean(&snapshot.ndvi),
            std_ndvi: nan_std(&snapshot.ndvi),
            mean_ndwi: snapshot.ndwi.as_ref().map(nan_mean),
            mean_vv_backscatter: snapshot
                .radar
                .as_ref()
                .map(|radar| nan_mean(radar.db(Polarization::VV))),
        }
    }
}

#[cfg(feature = "parallel")]
fn summarize_all(snapshots: &[IndexSnapshot]) -> Vec<TimeSeriesRecord> {
    use rayon::prelude::*;

    snapshots
        .par_iter()
        .map(TimeSeriesAggregator::summarize)
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn summarize_all(snapshots: &[IndexSnapshot]) -> Vec<TimeSeriesRecord> {
    snapshots.iter().map(TimeSeriesAggregator::summarize).collect()
}
