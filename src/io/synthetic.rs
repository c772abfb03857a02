use crate::types::{
    Acquisition, BandGrid, IndexGrid, OpticalBands, RadarBands, RegrowthError, RegrowthResult,
};
use chrono::{Days, NaiveDate};
use ndarray::{Array2, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Parameters of a simulated flood scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSceneConfig {
    pub height: usize,
    pub width: usize,
    /// RNG seed, identical seeds give identical scenes
    pub seed: u64,
    /// Days between consecutive acquisitions
    pub revisit_days: u32,
    /// Standard deviation of per-pixel NDVI noise
    pub noise_std: f64,
    /// NDVI drop right after the flood
    pub flood_depression: f64,
    /// NDVI regained over the whole simulated horizon
    pub recovery_gain: f64,
}

impl Default for SyntheticSceneConfig {
    fn default() -> Self {
        Self {
            height: 500,
            width: 500,
            seed: 42,
            revisit_days: 30,      // Monthly composites
            noise_std: 0.05,
            flood_depression: 0.2,
            recovery_gain: 0.4,
        }
    }
}

impl SyntheticSceneConfig {
    pub fn validate(&self) -> RegrowthResult<()> {
        if self.height == 0 || self.width == 0 {
            return Err(RegrowthError::InvalidParameter(format!(
                "scene size must be non-zero, got {}x{}",
                self.height, self.width
            )));
        }
        if self.revisit_days == 0 {
            return Err(RegrowthError::InvalidParameter(
                "revisit interval must be at least one day".to_string(),
            ));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(RegrowthError::InvalidParameter(format!(
                "noise standard deviation must be finite and non-negative, got {}",
                self.noise_std
            )));
        }
        if !self.flood_depression.is_finite() || !self.recovery_gain.is_finite() {
            return Err(RegrowthError::InvalidParameter(
                "flood depression and recovery gain must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// A simulated flood event ready for analysis
#[derive(Debug, Clone)]
pub struct SyntheticEvent {
    /// Pre-flood NDVI of the scene
    pub baseline_ndvi: IndexGrid,
    /// One acquisition per time step, starting on the flood date
    pub acquisitions: Vec<Acquisition>,
}

/// Generates simulated Sentinel-1/Sentinel-2 scenes in place of real imagery
pub struct SceneSynthesizer {
    config: SyntheticSceneConfig,
    rng: StdRng,
}

impl SceneSynthesizer {
    pub fn new(config: SyntheticSceneConfig) -> RegrowthResult<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.config.height, self.config.width)
    }

    fn uniform_band(&mut self, scale: f64, offset: f64) -> BandGrid {
        let rng = &mut self.rng;
        Array2::from_shape_simple_fn((self.config.height, self.config.width), || {
            rng.gen::<f64>() * scale + offset
        })
    }

    /// Simulated Sentinel-2 surface reflectance
    pub fn optical_bands(&mut self) -> OpticalBands {
        log::debug!("Generating simulated Sentinel-2 bands ({}x{})", self.config.height, self.config.width);

        let red = self.uniform_band(0.3, 0.1);
        let nir = self.uniform_band(0.4, 0.3);
        let swir = self.uniform_band(0.3, 0.1);
        let green = self.uniform_band(0.3, 0.1);

        OpticalBands {
            red,
            nir,
            green: Some(green),
            swir: Some(swir),
        }
    }

    /// Simulated Sentinel-1 backscatter, -30 to 5 dB
    pub fn radar_bands(&mut self) -> RadarBands {
        log::debug!("Generating simulated Sentinel-1 bands ({}x{})", self.config.height, self.config.width);

        RadarBands {
            vv_db: self.uniform_band(35.0, -30.0),
            vh_db: self.uniform_band(35.0, -30.0),
        }
    }

    /// Zero-mean Gaussian noise grid
    fn noise(&mut self) -> RegrowthResult<Array2<f64>> {
        let normal = Normal::new(0.0, self.config.noise_std)
            .map_err(|e| RegrowthError::InvalidParameter(format!("noise distribution: {}", e)))?;
        let rng = &mut self.rng;
        Ok(Array2::from_shape_simple_fn(
            (self.config.height, self.config.width),
            || normal.sample(rng),
        ))
    }

    /// NDVI frames following a linear recovery from the flood depression:
    /// `baseline - depression + gain * i / n + noise`
    pub fn recovery_stack(&mut self, baseline_ndvi: &IndexGrid, num_steps: usize) -> RegrowthResult<Vec<IndexGrid>> {
        let mut stack = Vec::with_capacity(num_steps);
        for i in 0..num_steps {
            let shift = self.config.recovery_gain * i as f64 / num_steps as f64
                - self.config.flood_depression;
            let noise = self.noise()?;
            stack.push(Zip::from(baseline_ndvi).and(&noise).map_collect(|&b, &n| b + shift + n));
        }
        Ok(stack)
    }

    /// Full simulated event: baseline scene plus `num_steps` acquisitions,
    /// the first on the flood date and then every `revisit_days`
    pub fn flood_event(&mut self, flood_date: NaiveDate, num_steps: usize) -> RegrowthResult<SyntheticEvent> {
        if num_steps == 0 {
            return Err(RegrowthError::InvalidParameter(
                "number of time steps must be positive".to_string(),
            ));
        }

        log::info!(
            "Simulating flood event on {} with {} acquisitions every {} days",
            flood_date,
            num_steps,
            self.config.revisit_days
        );

        let dates = acquisition_dates(flood_date, num_steps, self.config.revisit_days)?;

        let optical = self.optical_bands();
        let radar = self.radar_bands();
        let baseline_ndvi = crate::core::indices::ndvi(&optical.red, &optical.nir)?;
        let stack = self.recovery_stack(&baseline_ndvi, num_steps)?;

        let acquisitions = stack
            .iter()
            .zip(dates)
            .map(|(frame, date)| Acquisition {
                date,
                optical: OpticalBands {
                    red: red_for_ndvi(&optical.nir, frame),
                    nir: optical.nir.clone(),
                    green: optical.green.clone(),
                    swir: optical.swir.clone(),
                },
                radar: Some(radar.clone()),
            })
            .collect();

        Ok(SyntheticEvent {
            baseline_ndvi,
            acquisitions,
        })
    }
}

/// `num_steps` dates starting on `flood_date`, `revisit_days` apart
fn acquisition_dates(flood_date: NaiveDate, num_steps: usize, revisit_days: u32) -> RegrowthResult<Vec<NaiveDate>> {
    (0..num_steps as u64)
        .map(|i| {
            i.checked_mul(revisit_days as u64)
                .and_then(|offset| flood_date.checked_add_days(Days::new(offset)))
                .ok_or_else(|| {
                    RegrowthError::InvalidDate(format!(
                        "acquisition {} after {} falls outside the supported calendar",
                        i + 1,
                        flood_date
                    ))
                })
        })
        .collect()
}

/// Red reflectance that gives `target` NDVI together with `nir`.
/// Targets are clamped just inside (-1, 1) so the band stays finite.
fn red_for_ndvi(nir: &BandGrid, target: &IndexGrid) -> BandGrid {
    Zip::from(nir).and(target).map_collect(|&n, &v| {
        let v = v.clamp(-0.99, 0.99);
        n * (1.0 - v) / (1.0 + v)
    })
}
