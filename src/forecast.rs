//! Per-metric trend forecasting with uncertainty bands.
//!
//! A series is fitted with an additive trend over a yearly time index `t = season - first_season`:
//! an intercept, a linear trend and, optionally, hinge terms that let the slope change at selected
//! seasons. One observation per season leaves nothing to estimate within-year seasonality from,
//! so no such terms exist.
//!
//! Each prediction carries a symmetric band `center ± q·√var`, where `q` is the two-sided
//! Student-t quantile at the residual degrees of freedom (normal when none remain) and
//! `var = σ²(1 + xᵀ(XᵀX)⁻¹x)`. Future bands additionally accumulate `σ²·h/n` over the horizon
//! `h`, so that they widen strictly the further out they reach.

use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use tracing::debug;

use crate::error::{ComputationFailure, DataIntegrity, ForecastError};
use crate::linear::regression::{RegressionModel, Regressor};
use crate::metric::{Metric, MetricBound};
use crate::player::PlayerKey;
use crate::series::{SeasonPoint, SeasonSeries};
use crate::timed::Timed;

/// The fewest distinct seasons a forecast is attempted from.
pub const MIN_SEASONS: usize = 2;

/// The furthest horizon a single forecast may reach.
pub const MAX_HORIZON: usize = 100;

/// Hinge changepoints are only placed within this leading fraction of the history.
const CHANGEPOINT_RANGE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastOptions {
    pub min_seasons: usize,
    pub confidence_level: f64,
    pub changepoints: usize,
    pub noise_floor: f64,
    pub fit_budget_ms: u64,
}
impl ForecastOptions {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.min_seasons < MIN_SEASONS {
            bail!("at least {MIN_SEASONS} seasons must be required, got {}", self.min_seasons);
        }
        if !(self.confidence_level > 0. && self.confidence_level < 1.) {
            bail!("confidence level must lie in (0, 1), got {}", self.confidence_level);
        }
        if !(self.noise_floor.is_finite() && self.noise_floor > 0.) {
            bail!("noise floor must be positive, got {}", self.noise_floor);
        }
        if self.fit_budget_ms == 0 {
            bail!("fit budget must be positive");
        }
        Ok(())
    }

    pub fn fit_budget(&self) -> Duration {
        Duration::from_millis(self.fit_budget_ms)
    }
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            min_seasons: MIN_SEASONS,
            confidence_level: 0.95,
            changepoints: 0,
            noise_floor: 0.01,
            fit_budget_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub season: i32,
    pub center: f64,
    pub lower: f64,
    pub upper: f64,
}
impl Prediction {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// What the regression reports about its own fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub regressors: Vec<Regressor>,
    pub coefficients: Vec<f64>,
    pub std_errors: Option<Vec<f64>>,
    pub r_squared: Option<f64>,
    /// The noise scale σ behind the bands, after flooring.
    pub residual_std_error: f64,
    pub degrees_of_freedom: usize,
    /// Seasons at which the trend was allowed to change slope.
    pub changepoints: Vec<i32>,
    pub quantile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub metric: Metric,
    pub player_key: PlayerKey,
    /// The input points, in input order.
    pub history: Vec<SeasonPoint>,
    /// One unclipped prediction per historical season, ascending.
    pub fitted: Vec<Prediction>,
    pub future: Vec<Prediction>,
    pub confidence_level: f64,
    pub diagnostics: FitDiagnostics,
}
impl ForecastResult {
    /// Clamps the future predictions into `bound`. History and fitted values are left as is.
    pub fn clip_future(mut self, bound: &MetricBound) -> Self {
        for prediction in &mut self.future {
            *prediction = bound.clip(prediction);
        }
        self
    }
}

#[derive(Debug)]
pub struct Forecaster {
    options: ForecastOptions,
}
impl Forecaster {
    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    /// Projects `series` over the `periods` seasons following its last. The result is unclipped.
    pub fn forecast(
        &self,
        series: &SeasonSeries,
        metric: Metric,
        periods: usize,
    ) -> Result<ForecastResult, ForecastError> {
        if !(1..=MAX_HORIZON).contains(&periods) {
            return Err(ForecastError::InvalidParameter(format!(
                "periods must lie in 1..={MAX_HORIZON}, got {periods}"
            )));
        }
        if series.metric != metric {
            return Err(DataIntegrity::MetricMismatch {
                expected: metric,
                actual: series.metric,
            }
            .into());
        }
        let sorted = series.sorted()?;
        if sorted.len() < self.options.min_seasons {
            return Err(ForecastError::InsufficientHistory {
                player: series.player_key.clone(),
                metric,
                required: self.options.min_seasons,
                available: sorted.len(),
                seasons: sorted.iter().map(|point| point.season).collect(),
            });
        }
        let last_season = sorted[sorted.len() - 1].season;
        if i32::try_from(periods)
            .ok()
            .and_then(|periods| last_season.checked_add(periods))
            .is_none()
        {
            return Err(ForecastError::InvalidParameter(format!(
                "{periods} season(s) past {last_season} exceed the season range"
            )));
        }

        let failed = |cause: ComputationFailure| ForecastError::ForecastComputation {
            player: series.player_key.clone(),
            metric,
            samples: sorted.len(),
            cause,
        };
        let timed = Timed::result(|| self.fit(&sorted, periods)).map_err(&failed)?;
        let budget = self.options.fit_budget();
        if timed.exceeds(budget) {
            return Err(failed(ComputationFailure::Budget {
                elapsed: timed.elapsed,
                budget,
            }));
        }
        debug!(
            "fitted {} {metric} over {} seasons in {:?}",
            series.player_key,
            sorted.len(),
            timed.elapsed
        );

        let Projection {
            fitted,
            future,
            diagnostics,
        } = timed.value;
        Ok(ForecastResult {
            metric,
            player_key: series.player_key.clone(),
            history: series.points.clone(),
            fitted,
            future,
            confidence_level: self.options.confidence_level,
            diagnostics,
        })
    }

    fn fit(&self, sorted: &[SeasonPoint], periods: usize) -> Result<Projection, ComputationFailure> {
        let first_season = sorted[0].season;
        let last_season = sorted[sorted.len() - 1].season;
        if sorted.iter().all(|point| point.value == sorted[0].value) {
            return Err(ComputationFailure::NoVariation);
        }

        let samples = sorted
            .iter()
            .map(|point| ((point.season - first_season) as f64, point.value))
            .collect::<Vec<_>>();
        let knots = select_knots(&samples, self.options.changepoints);
        let mut regressors = vec![Regressor::Intercept, Regressor::Trend];
        regressors.extend(knots.iter().map(|&knot| Regressor::Hinge(knot)));
        let model = RegressionModel::fit(&samples, regressors)?;

        let sigma = noise_scale(&model, &samples, self.options.noise_floor);
        let quantile = two_sided_quantile(self.options.confidence_level, model.degrees_of_freedom)?;
        let sigma_sq = sigma.powi(2);

        let predict = |season: i32, variance: f64| -> Result<Prediction, ComputationFailure> {
            let center = model.predictor.predict((season - first_season) as f64);
            let half_width = quantile * variance.sqrt();
            if !center.is_finite() || !half_width.is_finite() {
                return Err(ComputationFailure::NonFinite(season));
            }
            Ok(Prediction {
                season,
                center,
                lower: center - half_width,
                upper: center + half_width,
            })
        };

        let fitted = sorted
            .iter()
            .map(|point| {
                let t = (point.season - first_season) as f64;
                predict(point.season, sigma_sq * (1. + model.leverage(t)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let samples_len = samples.len() as f64;
        let mut running_variance = 0_f64;
        let mut future = Vec::with_capacity(periods);
        for horizon in 1..=periods {
            let season = last_season + horizon as i32;
            let t = (season - first_season) as f64;
            running_variance = running_variance.max(sigma_sq * (1. + model.leverage(t)));
            let variance = running_variance + sigma_sq * horizon as f64 / samples_len;
            future.push(predict(season, variance)?);
        }

        let diagnostics = FitDiagnostics {
            changepoints: knots
                .iter()
                .map(|&knot| first_season + knot as i32)
                .collect(),
            regressors: model.predictor.regressors.clone(),
            coefficients: model.predictor.coefficients.clone(),
            std_errors: model.std_errors.clone(),
            r_squared: model.r_squared,
            residual_std_error: sigma,
            degrees_of_freedom: model.degrees_of_freedom,
            quantile,
        };
        Ok(Projection {
            fitted,
            future,
            diagnostics,
        })
    }
}

impl TryFrom<ForecastOptions> for Forecaster {
    type Error = anyhow::Error;

    fn try_from(options: ForecastOptions) -> Result<Self, Self::Error> {
        options.validate()?;
        Ok(Self { options })
    }
}

struct Projection {
    fitted: Vec<Prediction>,
    future: Vec<Prediction>,
    diagnostics: FitDiagnostics,
}

/// Picks up to `requested` knots among the observed time indices past the first, within the
/// leading [`CHANGEPOINT_RANGE`] of the history, leaving at least one residual degree of freedom.
fn select_knots(samples: &[(f64, f64)], requested: usize) -> Vec<f64> {
    let span = samples[samples.len() - 1].0;
    let candidates = samples[1..]
        .iter()
        .map(|&(t, _)| t)
        .filter(|&t| t <= CHANGEPOINT_RANGE * span)
        .collect::<Vec<_>>();
    let count = requested
        .min(samples.len().saturating_sub(3))
        .min(candidates.len());
    (0..count)
        .map(|i| candidates[i * candidates.len() / count])
        .collect()
}

/// The residual standard error, or the sample standard deviation when the fit is exact,
/// floored at a fraction of the mean magnitude.
fn noise_scale(model: &RegressionModel, samples: &[(f64, f64)], noise_floor: f64) -> f64 {
    let n = samples.len() as f64;
    let sigma = model.residual_std_error.unwrap_or_else(|| {
        let mean = samples.iter().map(|&(_, y)| y).sum::<f64>() / n;
        let sum_sq = samples.iter().map(|&(_, y)| (y - mean).powi(2)).sum::<f64>();
        (sum_sq / (n - 1.)).sqrt()
    });
    let mean_magnitude = samples.iter().map(|&(_, y)| y.abs()).sum::<f64>() / n;
    f64::max(sigma, noise_floor * mean_magnitude)
}

fn two_sided_quantile(confidence_level: f64, degrees_of_freedom: usize) -> Result<f64, ComputationFailure> {
    let probability = (1. + confidence_level) / 2.;
    let quantile = if degrees_of_freedom > 0 {
        StudentsT::new(0., 1., degrees_of_freedom as f64)
            .map_err(|err| ComputationFailure::Quantile(err.to_string()))?
            .inverse_cdf(probability)
    } else {
        Normal::new(0., 1.)
            .map_err(|err| ComputationFailure::Quantile(err.to_string()))?
            .inverse_cdf(probability)
    };
    if quantile.is_finite() && quantile > 0. {
        Ok(quantile)
    } else {
        Err(ComputationFailure::Quantile(format!(
            "{quantile} at p = {probability} with {degrees_of_freedom} degrees of freedom"
        )))
    }
}

#[cfg(test)]
mod tests;
