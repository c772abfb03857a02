use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use ndarray::{array, Array2};
use regrowth::core::indices::{ndvi, radar_backscatter, IndexSnapshot};
use regrowth::core::recovery_rate::RecoveryRateEstimator;
use regrowth::core::survival::SurvivalAnalyzer;
use regrowth::core::timeseries::TimeSeriesAggregator;
use regrowth::{Acquisition, EngineConfig, OpticalBands, RadarBands, RecoveryEngine, RegrowthError};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn flood_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()
}

/// Uniform 3x3 acquisition with the given NDVI, NIR fixed at 0.4
fn uniform_acquisition(days_after: i64, target_ndvi: f64) -> Acquisition {
    let nir = 0.4;
    Acquisition {
        date: flood_date() + Duration::days(days_after),
        optical: OpticalBands {
            red: Array2::from_elem((3, 3), nir * (1.0 - target_ndvi) / (1.0 + target_ndvi)),
            nir: Array2::from_elem((3, 3), nir),
            green: Some(Array2::from_elem((3, 3), 0.2)),
            swir: None,
        },
        radar: Some(RadarBands {
            vv_db: Array2::from_elem((3, 3), -10.0),
            vh_db: Array2::from_elem((3, 3), -20.0),
        }),
    }
}

#[test]
fn test_index_examples() {
    init_logging();

    let red = array![[0.1, 0.0]];
    let nir = array![[0.5, 0.0]];
    let result = ndvi(&red, &nir).unwrap();
    assert_relative_eq!(result[[0, 0]], 0.4 / 0.6, epsilon = 1e-12);
    assert!(result[[0, 1]].is_nan());

    let radar = radar_backscatter(&array![[-10.0]], &array![[-20.0]]).unwrap();
    assert_relative_eq!(radar.vv_linear[[0, 0]], 0.1, epsilon = 1e-12);
    assert_relative_eq!(radar.vh_linear[[0, 0]], 0.01, epsilon = 1e-12);
    assert_relative_eq!(radar.cross_ratio[[0, 0]], 10.0, epsilon = 1e-9);
}

#[test]
fn test_steady_recovery_from_acquisitions() {
    init_logging();

    let acquisitions: Vec<Acquisition> = [(0, 0.3), (30, 0.35), (60, 0.4), (90, 0.45)]
        .iter()
        .map(|&(day, v)| uniform_acquisition(day, v))
        .collect();

    let snapshots: Vec<IndexSnapshot> = acquisitions
        .iter()
        .map(IndexSnapshot::from_acquisition)
        .collect::<Result<_, _>>()
        .unwrap();
    let records = TimeSeriesAggregator::new().aggregate(&snapshots).unwrap();

    assert_eq!(records.len(), 4);
    assert_relative_eq!(records[1].mean_ndvi, 0.35, epsilon = 1e-9);
    assert_relative_eq!(records[1].std_ndvi, 0.0, epsilon = 1e-9);
    assert_relative_eq!(records[0].mean_vv_backscatter.unwrap(), -10.0, epsilon = 1e-12);
    assert!(records[0].mean_ndwi.is_some());

    let metrics = RecoveryRateEstimator::new(0.6).estimate(&records, flood_date());
    assert_relative_eq!(metrics.recovery_rate, 0.001667, epsilon = 1e-6);
    assert_relative_eq!(metrics.recovery_percentage, 75.0, epsilon = 1e-6);
    assert_relative_eq!(metrics.time_to_recovery_days.unwrap(), 90.0, epsilon = 1e-4);
}

#[test]
fn test_four_pixel_survival() {
    init_logging();

    let baseline = Array2::from_elem((2, 2), 0.6);
    let mask = Array2::from_elem((2, 2), true);
    let stack = vec![
        array![[0.5, 0.5], [0.5, 0.5]],
        array![[0.55, 0.4], [0.55, 0.4]],
        array![[0.6, 0.6], [0.6, 0.6]],
    ];

    let metrics = SurvivalAnalyzer::new().analyze(&stack, &baseline, &mask).unwrap();
    assert_eq!(metrics.recovery_map.time_to_event, array![[2.0, 3.0], [2.0, 3.0]]);
    assert_relative_eq!(metrics.confidence_score, 100.0);
    assert_eq!(metrics.median_recovery_time, 2.0);

    let curve = metrics.curve.unwrap();
    assert_relative_eq!(curve.survival_at(2.0), 0.5, epsilon = 1e-12);
    assert_relative_eq!(curve.survival_at(3.0), 0.0, epsilon = 1e-12);
}

#[test]
fn test_engine_end_to_end() {
    init_logging();

    let engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
    let acquisitions: Vec<Acquisition> = [(-30, 0.62), (0, 0.3), (30, 0.4), (60, 0.58)]
        .iter()
        .map(|&(day, v)| uniform_acquisition(day, v))
        .collect();
    let baseline = Array2::from_elem((3, 3), 0.6);
    let mut mask = Array2::from_elem((3, 3), false);
    mask[[1, 1]] = true;

    let report = engine
        .analyze(flood_date(), &acquisitions, &baseline, Some(&mask))
        .unwrap();

    // Pre-flood acquisition is reported but left out of the regression
    assert_eq!(report.time_series.len(), 4);
    assert_relative_eq!(report.recovery_metrics.current_ndvi.unwrap(), 0.58, epsilon = 1e-9);

    // Three post-flood steps, threshold 0.54 first reached at step 3
    let survival = report.survival.unwrap();
    assert_eq!(survival.masked_pixels, 1);
    assert_eq!(survival.recovery_map.time_to_event[[1, 1]], 3.0);
    assert_eq!(survival.median_recovery_time, 3.0);
}

#[test]
fn test_engine_without_post_flood_data() {
    init_logging();

    let engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
    let acquisitions = vec![uniform_acquisition(-60, 0.6), uniform_acquisition(-30, 0.61)];
    let baseline = Array2::from_elem((3, 3), 0.6);

    let report = engine.analyze(flood_date(), &acquisitions, &baseline, None).unwrap();
    assert_eq!(report.recovery_metrics.recovery_rate, 0.0);
    assert_eq!(report.recovery_metrics.recovery_percentage, 0.0);
    assert!(report.recovery_metrics.current_ndvi.is_none());
    assert!(report.survival.is_none());
}

#[test]
fn test_engine_rejects_bad_input() {
    init_logging();

    let engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
    let baseline = Array2::from_elem((3, 3), 0.6);

    assert!(matches!(
        engine.analyze(flood_date(), &[], &baseline, None),
        Err(RegrowthError::EmptyInput(_))
    ));

    let mut broken = uniform_acquisition(0, 0.3);
    broken.optical.nir = Array2::from_elem((3, 4), 0.4);
    assert!(matches!(
        engine.analyze(flood_date(), &[broken], &baseline, None),
        Err(RegrowthError::ShapeMismatch { .. })
    ));
}
