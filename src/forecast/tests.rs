use assert_float_eq::*;

use crate::metric::MetricCatalog;
use crate::player::Role;

use super::*;

fn forecaster() -> Forecaster {
    Forecaster::try_from(ForecastOptions::default()).unwrap()
}

fn series(role: Role, metric: Metric, points: &[(i32, f64)]) -> SeasonSeries {
    SeasonSeries::new(PlayerKey::new(role, "1234567"), metric, points.iter().copied())
}

fn noisy_home_runs() -> SeasonSeries {
    series(
        Role::Batter,
        Metric::HomeRuns,
        &[
            (2016, 21.),
            (2017, 25.),
            (2018, 24.),
            (2019, 29.),
            (2020, 27.),
            (2021, 33.),
            (2022, 31.),
            (2023, 36.),
        ],
    )
}

fn assert_ordered(predictions: &[Prediction]) {
    for prediction in predictions {
        assert!(
            prediction.lower <= prediction.center && prediction.center <= prediction.upper,
            "{prediction:?}"
        );
    }
}

fn seasons(predictions: &[Prediction]) -> Vec<i32> {
    predictions.iter().map(|prediction| prediction.season).collect()
}

#[test]
fn batting_average() {
    let series = series(
        Role::Batter,
        Metric::BattingAverage,
        &[
            (2018, 0.280),
            (2019, 0.295),
            (2020, 0.310),
            (2021, 0.300),
            (2022, 0.315),
            (2023, 0.320),
        ],
    );
    let bound = MetricCatalog::standard()
        .bound(Role::Batter, Metric::BattingAverage)
        .unwrap()
        .clone();
    let result = forecaster()
        .forecast(&series, Metric::BattingAverage, 3)
        .unwrap()
        .clip_future(&bound);

    assert_eq!(vec![2024, 2025, 2026], seasons(&result.future));
    assert_eq!(vec![2018, 2019, 2020, 2021, 2022, 2023], seasons(&result.fitted));
    for prediction in &result.future {
        assert!((0.0..=0.4).contains(&prediction.center), "{prediction:?}");
    }
    assert_float_relative_eq!(0.3283333333, result.future[0].center, 1e-6);
    assert_float_relative_eq!(0.3426190476, result.future[2].center, 1e-6);
    assert!(result.future[1].width() > result.future[0].width());
    assert!(result.future[2].width() > result.future[1].width());
    assert_ordered(&result.fitted);
    assert_ordered(&result.future);
    assert_eq!(0.95, result.confidence_level);
    assert_eq!(4, result.diagnostics.degrees_of_freedom);
    assert!(result.diagnostics.r_squared.is_some());
}

#[test]
fn earned_run_average_clipped_only_in_future() {
    let series = series(
        Role::Pitcher,
        Metric::EarnedRunAverage,
        &[(2021, 4.0), (2022, 4.6), (2023, 5.6)],
    );
    let bound = MetricCatalog::standard()
        .bound(Role::Pitcher, Metric::EarnedRunAverage)
        .unwrap()
        .clone();
    let unclipped = forecaster()
        .forecast(&series, Metric::EarnedRunAverage, 2)
        .unwrap();
    assert_float_relative_eq!(16.6 / 3., unclipped.fitted[2].center, 1e-9);
    assert_float_relative_eq!(19. / 3., unclipped.future[0].center, 1e-9);

    let clipped = unclipped.clone().clip_future(&bound);
    assert!(clipped.fitted[2].center > 5.);
    assert_eq!(unclipped.fitted, clipped.fitted);
    for prediction in &clipped.future {
        assert!(prediction.upper <= 5., "{prediction:?}");
    }
    assert_ordered(&clipped.future);
    assert_eq!(clipped, clipped.clone().clip_future(&bound));
}

#[test]
fn one_season_is_insufficient() {
    let series = series(Role::Batter, Metric::Hits, &[(2023, 180.)]);
    let err = forecaster().forecast(&series, Metric::Hits, 3).unwrap_err();
    match err {
        ForecastError::InsufficientHistory {
            required,
            available,
            seasons,
            ..
        } => {
            assert_eq!(2, required);
            assert_eq!(1, available);
            assert_eq!(vec![2023], seasons);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn two_seasons_are_solved_exactly() {
    let series = series(Role::Batter, Metric::Walks, &[(2022, 14.), (2020, 10.)]);
    let result = forecaster().forecast(&series, Metric::Walks, 2).unwrap();
    assert_eq!(vec![2023, 2024], seasons(&result.future));
    assert_float_relative_eq!(16., result.future[0].center, 1e-9);
    assert_float_relative_eq!(18., result.future[1].center, 1e-9);
    assert_eq!(0, result.diagnostics.degrees_of_freedom);
    assert_eq!(None, result.diagnostics.std_errors);
    assert_float_relative_eq!(1.959963984540054, result.diagnostics.quantile, 1e-6);
    assert_float_relative_eq!(8_f64.sqrt(), result.diagnostics.residual_std_error, 1e-9);
    assert_ordered(&result.future);

    // history retains input order
    assert_eq!(2022, result.history[0].season);
    assert_eq!(vec![2020, 2022], seasons(&result.fitted));
}

#[test]
fn periods_out_of_range() {
    for periods in [0, MAX_HORIZON + 1, usize::MAX] {
        let err = forecaster()
            .forecast(&noisy_home_runs(), Metric::HomeRuns, periods)
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)), "{periods}: {err:?}");
    }
    let result = forecaster()
        .forecast(&noisy_home_runs(), Metric::HomeRuns, MAX_HORIZON)
        .unwrap();
    assert_eq!(MAX_HORIZON, result.future.len());
    assert_eq!(2023 + MAX_HORIZON as i32, result.future[MAX_HORIZON - 1].season);
}

#[test]
fn future_seasons_past_range() {
    let series = series(
        Role::Batter,
        Metric::HomeRuns,
        &[(i32::MAX - 1, 20.), (i32::MAX, 24.)],
    );
    let err = forecaster().forecast(&series, Metric::HomeRuns, 1).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidParameter(_)), "{err:?}");
}

#[test]
fn duplicate_seasons() {
    let series = series(Role::Batter, Metric::Hits, &[(2022, 150.), (2023, 160.), (2022, 155.)]);
    let err = forecaster().forecast(&series, Metric::Hits, 1).unwrap_err();
    assert!(
        matches!(
            err,
            ForecastError::DataIntegrity(DataIntegrity::DuplicateSeason { season: 2022, .. })
        ),
        "{err:?}"
    );
}

#[test]
fn metric_mismatch() {
    let err = forecaster()
        .forecast(&noisy_home_runs(), Metric::Hits, 1)
        .unwrap_err();
    assert!(
        matches!(
            err,
            ForecastError::DataIntegrity(DataIntegrity::MetricMismatch {
                expected: Metric::Hits,
                actual: Metric::HomeRuns
            })
        ),
        "{err:?}"
    );
}

#[test]
fn identical_values() {
    let series = series(Role::Pitcher, Metric::Wins, &[(2021, 12.), (2022, 12.), (2023, 12.)]);
    let err = forecaster().forecast(&series, Metric::Wins, 1).unwrap_err();
    match err {
        ForecastError::ForecastComputation { samples, cause, .. } => {
            assert_eq!(3, samples);
            assert!(matches!(cause, ComputationFailure::NoVariation), "{cause:?}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn width_increases_with_horizon() {
    let result = forecaster()
        .forecast(&noisy_home_runs(), Metric::HomeRuns, 5)
        .unwrap();
    assert_eq!(vec![2024, 2025, 2026, 2027, 2028], seasons(&result.future));
    for window in result.future.windows(2) {
        assert!(window[1].width() > window[0].width(), "{window:?}");
    }
    assert!(result.future[0].width() > result.fitted[7].width());
    assert_ordered(&result.future);
}

#[test]
fn changepoints() {
    let forecaster = Forecaster::try_from(ForecastOptions {
        changepoints: 2,
        ..ForecastOptions::default()
    })
    .unwrap();
    let result = forecaster
        .forecast(&noisy_home_runs(), Metric::HomeRuns, 3)
        .unwrap();
    assert_eq!(vec![2017, 2019], result.diagnostics.changepoints);
    assert_eq!(4, result.diagnostics.regressors.len());
    assert_eq!(4, result.diagnostics.degrees_of_freedom);
    for window in result.future.windows(2) {
        assert!(window[1].width() > window[0].width(), "{window:?}");
    }

    // too few seasons to afford any hinge
    let short = series(Role::Batter, Metric::HomeRuns, &[(2021, 20.), (2022, 24.), (2023, 23.)]);
    let result = forecaster.forecast(&short, Metric::HomeRuns, 1).unwrap();
    assert!(result.diagnostics.changepoints.is_empty());
    assert_eq!(1, result.diagnostics.degrees_of_freedom);
}

#[test]
fn select_knots_within_range() {
    let samples = (0..8).map(|t| (t as f64, t as f64)).collect::<Vec<_>>();
    assert_eq!(vec![1., 3.], select_knots(&samples, 2));
    assert_eq!(vec![1., 2., 3., 4., 5.], select_knots(&samples, 10));
    assert!(select_knots(&samples, 0).is_empty());
    assert!(select_knots(&samples[..3], 1).is_empty());
}

#[test]
fn budget_exceeded() {
    let forecaster = Forecaster {
        options: ForecastOptions {
            fit_budget_ms: 0,
            ..ForecastOptions::default()
        },
    };
    let err = forecaster
        .forecast(&noisy_home_runs(), Metric::HomeRuns, 1)
        .unwrap_err();
    assert!(
        matches!(
            err,
            ForecastError::ForecastComputation {
                cause: ComputationFailure::Budget { .. },
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn options_validate() {
    assert!(ForecastOptions::default().validate().is_ok());
    for options in [
        ForecastOptions {
            min_seasons: 1,
            ..ForecastOptions::default()
        },
        ForecastOptions {
            confidence_level: 1.,
            ..ForecastOptions::default()
        },
        ForecastOptions {
            noise_floor: 0.,
            ..ForecastOptions::default()
        },
        ForecastOptions {
            fit_budget_ms: 0,
            ..ForecastOptions::default()
        },
    ] {
        assert!(Forecaster::try_from(options).is_err());
    }
}

#[test]
fn options_serde_defaults() {
    let options: ForecastOptions = serde_json::from_str(r#"{"changepoints": 1}"#).unwrap();
    assert_eq!(
        ForecastOptions {
            changepoints: 1,
            ..ForecastOptions::default()
        },
        options
    );
}
