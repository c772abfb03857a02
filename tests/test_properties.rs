use chrono::{Duration, NaiveDate};
use ndarray::Array2;
use proptest::prelude::*;
use regrowth::core::indices::ndvi;
use regrowth::core::recovery_rate::RecoveryRateEstimator;
use regrowth::core::survival::SurvivalAnalyzer;
use regrowth::core::timeseries::TimeSeriesRecord;
use regrowth::IndexGrid;

fn flood_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()
}

fn monthly_records(values: &[f64]) -> Vec<TimeSeriesRecord> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| TimeSeriesRecord {
            date: flood_date() + Duration::days(30 * i as i64),
            mean_ndvi: v,
            std_ndvi: 0.0,
            mean_ndwi: None,
            mean_vv_backscatter: None,
        })
        .collect()
}

/// Stack of 2x2 NDVI frames with a matching baseline grid
fn stack_strategy() -> impl Strategy<Value = (Vec<IndexGrid>, IndexGrid)> {
    (1usize..6).prop_flat_map(|steps| {
        (
            prop::collection::vec(0.0..1.0f64, 4 * steps),
            prop::collection::vec(0.1..1.0f64, 4),
        )
            .prop_map(|(values, baseline)| {
                let stack: Vec<IndexGrid> = values
                    .chunks(4)
                    .map(|chunk| Array2::from_shape_vec((2, 2), chunk.to_vec()).unwrap())
                    .collect();
                let baseline = Array2::from_shape_vec((2, 2), baseline).unwrap();
                (stack, baseline)
            })
    })
}

proptest! {
    #[test]
    fn prop_ndvi_is_bounded(red in 0.0..1.0f64, nir in 0.0..1.0f64) {
        prop_assume!(red + nir > 0.0);
        let value = ndvi(&Array2::from_elem((1, 1), red), &Array2::from_elem((1, 1), nir)).unwrap()[[0, 0]];
        prop_assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn prop_ndvi_nan_only_for_zero_sum(
        red in prop::collection::vec(prop::sample::select(vec![0.0, 0.05, 0.3]), 6),
        nir in prop::collection::vec(prop::sample::select(vec![0.0, 0.2, 0.6]), 6),
    ) {
        let red = Array2::from_shape_vec((2, 3), red).unwrap();
        let nir = Array2::from_shape_vec((2, 3), nir).unwrap();
        let result = ndvi(&red, &nir).unwrap();

        for ((&v, &r), &n) in result.iter().zip(red.iter()).zip(nir.iter()) {
            prop_assert_eq!(v.is_nan(), r + n == 0.0);
        }
    }

    #[test]
    fn prop_recovery_percentage_is_capped(
        values in prop::collection::vec(-1.0..1.0f64, 1..12),
        baseline in 0.01..1.0f64,
    ) {
        let metrics = RecoveryRateEstimator::new(baseline).estimate(&monthly_records(&values), flood_date());
        prop_assert!(metrics.recovery_percentage <= 100.0);
    }

    #[test]
    fn prop_single_observation_has_no_trend(value in -1.0..1.0f64, baseline in 0.01..1.0f64) {
        let metrics = RecoveryRateEstimator::new(baseline).estimate(&monthly_records(&[value]), flood_date());
        prop_assert_eq!(metrics.recovery_rate, 0.0);
        prop_assert!(metrics.time_to_recovery_days.is_none());
    }

    #[test]
    fn prop_event_time_is_first_crossing(horizon in 1usize..10, crossing in 0usize..10) {
        // crossing == 0 or beyond the horizon means the pixel never recovers
        let recovers = crossing >= 1 && crossing <= horizon;
        let stack: Vec<IndexGrid> = (1..=horizon)
            .map(|step| {
                let value = if recovers && step >= crossing { 0.9 } else { 0.1 };
                Array2::from_elem((1, 1), value)
            })
            .collect();

        let events = SurvivalAnalyzer::new()
            .scan_event_times(&stack, &Array2::from_elem((1, 1), 0.6), &Array2::from_elem((1, 1), true))
            .unwrap();

        let expected = if recovers { crossing } else { horizon };
        prop_assert_eq!(events.time_to_event[[0, 0]], expected as f64);
        prop_assert_eq!(events.event_observed[[0, 0]], recovers);
    }

    #[test]
    fn prop_confidence_is_observed_share(
        (stack, baseline) in stack_strategy(),
        mask in prop::collection::vec(any::<bool>(), 4),
    ) {
        let mask = Array2::from_shape_vec((2, 2), mask).unwrap();
        let metrics = SurvivalAnalyzer::new().analyze(&stack, &baseline, &mask).unwrap();

        if metrics.masked_pixels == 0 {
            prop_assert_eq!(metrics.confidence_score, 0.0);
        } else {
            let expected = 100.0 * metrics.observed_events as f64 / metrics.masked_pixels as f64;
            prop_assert!((metrics.confidence_score - expected).abs() < 1e-9);
        }
        prop_assert_eq!(metrics.masked_pixels, mask.iter().filter(|&&m| m).count());
    }

    #[test]
    fn prop_higher_threshold_never_speeds_recovery(
        (stack, baseline) in stack_strategy(),
        low in 0.5..1.0f64,
        raise in 0.0..0.5f64,
    ) {
        let mask = Array2::from_elem((2, 2), true);
        let lenient = SurvivalAnalyzer::with_threshold_fraction(low).unwrap();
        let strict = SurvivalAnalyzer::with_threshold_fraction(low + raise).unwrap();

        let lenient = lenient.analyze(&stack, &baseline, &mask).unwrap();
        let strict = strict.analyze(&stack, &baseline, &mask).unwrap();
        prop_assert!(strict.median_recovery_time >= lenient.median_recovery_time);
    }
}
