use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Reflectance or backscatter values for one band at one acquisition date
pub type BandGrid = Array2<f64>;

/// Derived normalized-difference index (NDVI, NDWI), NaN where undefined
pub type IndexGrid = Array2<f64>;

/// Pixels considered flooded
pub type FloodMask = Array2<bool>;

/// Polarization channels used from Sentinel-1 dual-pol acquisitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
        }
    }
}

/// Sentinel-2 optical bands for one acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpticalBands {
    pub red: BandGrid,             // B4
    pub nir: BandGrid,             // B8
    pub green: Option<BandGrid>,   // B3
    pub swir: Option<BandGrid>,    // B11
}

/// Sentinel-1 backscatter for one acquisition, in dB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarBands {
    pub vv_db: BandGrid,
    pub vh_db: BandGrid,
}

impl RadarBands {
    pub fn band(&self, polarization: Polarization) -> &BandGrid {
        match polarization {
            Polarization::VV => &self.vv_db,
            Polarization::VH => &self.vh_db,
        }
    }
}

/// All co-registered grids acquired on one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    pub date: NaiveDate,
    pub optical: OpticalBands,
    pub radar: Option<RadarBands>,
}

impl Acquisition {
    /// Grid dimensions, taken from the red band
    pub fn dim(&self) -> (usize, usize) {
        self.optical.red.dim()
    }

    /// Check that every grid of this acquisition shares the red band's dimensions
    pub fn validate(&self) -> RegrowthResult<()> {
        let expected = self.dim();
        let context = format!("acquisition {}", self.date);

        check_shape(&context, expected, self.optical.nir.dim())?;
        if let Some(green) = &self.optical.green {
            check_shape(&context, expected, green.dim())?;
        }
        if let Some(swir) = &self.optical.swir {
            check_shape(&context, expected, swir.dim())?;
        }
        if let Some(radar) = &self.radar {
            check_shape(&context, expected, radar.vv_db.dim())?;
            check_shape(&context, expected, radar.vh_db.dim())?;
        }
        Ok(())
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form
pub fn parse_date(value: &str) -> RegrowthResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| RegrowthError::InvalidDate(format!("'{}': {}", value, e)))
}

pub(crate) fn check_shape(
    context: &str,
    expected: (usize, usize),
    found: (usize, usize),
) -> RegrowthResult<()> {
    if expected != found {
        return Err(RegrowthError::ShapeMismatch {
            context: context.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Error types for recovery processing
#[derive(Debug, thiserror::Error)]
pub enum RegrowthError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for recovery operations
pub type RegrowthResult<T> = Result<T, RegrowthError>;
