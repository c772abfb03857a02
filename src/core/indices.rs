//! Spectral and radar indices
//!
//! Per-pixel transforms of co-registered band grids. Degenerate pixels
//! (zero denominators) become NaN instead of raising, so a single dark or
//! masked pixel never aborts a whole acquisition.

use crate::types::{
    check_shape, Acquisition, BandGrid, IndexGrid, OpticalBands, Polarization, RadarBands,
    RegrowthResult,
};
use chrono::NaiveDate;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Processed Sentinel-1 backscatter for one acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarMetrics {
    pub vv_db: BandGrid,
    pub vh_db: BandGrid,
    pub vv_linear: BandGrid,
    pub vh_linear: BandGrid,
    /// VV / VH in linear scale, NaN where VH is zero
    pub cross_ratio: BandGrid,
}

impl RadarMetrics {
    pub fn from_bands(bands: &RadarBands) -> RegrowthResult<Self> {
        radar_backscatter(bands.band(Polarization::VV), bands.band(Polarization::VH))
    }

    pub fn db(&self, polarization: Polarization) -> &BandGrid {
        match polarization {
            Polarization::VV => &self.vv_db,
            Polarization::VH => &self.vh_db,
        }
    }
}

/// Optical indices derived from one Sentinel-2 acquisition
#[derive(Debug, Clone)]
pub struct OpticalIndices {
    pub ndvi: IndexGrid,
    /// Absent when the green band was not supplied
    pub ndwi: Option<IndexGrid>,
}

impl OpticalIndices {
    pub fn from_bands(bands: &OpticalBands) -> RegrowthResult<Self> {
        let ndvi = ndvi(&bands.red, &bands.nir)?;
        let ndwi = match &bands.green {
            Some(green) => Some(ndwi(green, &bands.nir)?),
            None => None,
        };
        Ok(Self { ndvi, ndwi })
    }
}

/// Every index computed for one acquisition date
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub date: NaiveDate,
    pub ndvi: IndexGrid,
    pub ndwi: Option<IndexGrid>,
    pub radar: Option<RadarMetrics>,
}

impl IndexSnapshot {
    /// Compute NDVI, NDWI and radar metrics for an acquisition
    pub fn from_acquisition(acquisition: &Acquisition) -> RegrowthResult<Self> {
        acquisition.validate()?;

        let (height, width) = acquisition.dim();
        log::debug!("Computing indices for {} ({}x{})", acquisition.date, height, width);

        let optical = OpticalIndices::from_bands(&acquisition.optical)?;
        let radar = match &acquisition.radar {
            Some(bands) => Some(RadarMetrics::from_bands(bands)?),
            None => None,
        };

        Ok(Self {
            date: acquisition.date,
            ndvi: optical.ndvi,
            ndwi: optical.ndwi,
            radar,
        })
    }
}

/// Normalized difference `(a - b) / (a + b)`.
///
/// Values lie in [-1, 1] for non-negative inputs. Pixels where `a + b == 0`
/// are NaN.
pub fn normalized_difference(band_a: &BandGrid, band_b: &BandGrid) -> RegrowthResult<IndexGrid> {
    check_shape("normalized difference", band_a.dim(), band_b.dim())?;

    Ok(pixelwise(band_a, band_b, |a, b| {
        let sum = a + b;
        if sum == 0.0 {
            f64::NAN
        } else {
            (a - b) / sum
        }
    }))
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(red: &BandGrid, nir: &BandGrid) -> RegrowthResult<IndexGrid> {
    normalized_difference(nir, red)
}

/// Normalized Difference Water Index (McFeeters)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
pub fn ndwi(green: &BandGrid, nir: &BandGrid) -> RegrowthResult<IndexGrid> {
    normalized_difference(green, nir)
}

/// Convert backscatter from dB to linear power: `10^(dB/10)`
pub fn db_to_linear(db: &BandGrid) -> BandGrid {
    map_pixels(db, |x| 10f64.powf(x / 10.0))
}

/// Convert linear power to dB. Non-positive values have no dB
/// representation and become NaN.
pub fn linear_to_db(linear: &BandGrid) -> BandGrid {
    map_pixels(linear, |x| if x > 0.0 { 10.0 * x.log10() } else { f64::NAN })
}

/// Linear-scale conversion and VV/VH cross-ratio for a dual-pol acquisition
pub fn radar_backscatter(vv_db: &BandGrid, vh_db: &BandGrid) -> RegrowthResult<RadarMetrics> {
    check_shape("radar backscatter", vv_db.dim(), vh_db.dim())?;
    log::debug!("Processing radar backscatter {:?}", vv_db.dim());

    let vv_linear = db_to_linear(vv_db);
    let vh_linear = db_to_linear(vh_db);
    let cross_ratio = pixelwise(&vv_linear, &vh_linear, |vv, vh| {
        if vh != 0.0 {
            vv / vh
        } else {
            f64::NAN
        }
    });

    Ok(RadarMetrics {
        vv_db: vv_db.clone(),
        vh_db: vh_db.clone(),
        vv_linear,
        vh_linear,
        cross_ratio,
    })
}

#[cfg(feature = "parallel")]
fn pixelwise<F>(a: &Array2<f64>, b: &Array2<f64>, op: F) -> Array2<f64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    Zip::from(a).and(b).par_map_collect(|&x, &y| op(x, y))
}

#[cfg(not(feature = "parallel"))]
fn pixelwise<F>(a: &Array2<f64>, b: &Array2<f64>, op: F) -> Array2<f64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    Zip::from(a).and(b).map_collect(|&x, &y| op(x, y))
}

#[cfg(feature = "parallel")]
fn map_pixels<F>(grid: &Array2<f64>, op: F) -> Array2<f64>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let mut out = grid.to_owned();
    out.par_mapv_inplace(op);
    out
}

#[cfg(not(feature = "parallel"))]
fn map_pixels<F>(grid: &Array2<f64>, op: F) -> Array2<f64>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    grid.mapv(op)
}
