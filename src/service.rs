//! Orchestrates forecasts of several metrics for one player.
//!
//! A request is validated as a whole; after that, each metric succeeds or fails on its own and
//! the batch always carries one outcome per distinct requested metric. Only a malformed request
//! or a cache failure aborts the batch.

use std::fmt;
use std::fmt::Formatter;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{info, warn};

use crate::cache::{CacheKey, ForecastCache};
use crate::config::Config;
use crate::eligibility::has_min_seasons;
use crate::error::ForecastError;
use crate::forecast::{ForecastResult, Forecaster};
use crate::metric::{Metric, MetricBound, MetricCatalog};
use crate::player::PlayerKey;
use crate::series::SeasonSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    #[strum(serialize = "insufficient history")]
    InsufficientHistory,
    #[strum(serialize = "computation failed")]
    ComputationFailed,
    #[strum(serialize = "invalid data")]
    InvalidData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub metric: Metric,
    pub reason: UnavailableReason,
    pub detail: String,
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "not available: {}", self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricOutcome {
    Forecast(ForecastResult),
    Unavailable(ErrorDescriptor),
}
impl MetricOutcome {
    pub fn forecast(&self) -> Option<&ForecastResult> {
        match self {
            MetricOutcome::Forecast(result) => Some(result),
            MetricOutcome::Unavailable(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<&ErrorDescriptor> {
        match self {
            MetricOutcome::Forecast(_) => None,
            MetricOutcome::Unavailable(descriptor) => Some(descriptor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBatch {
    pub player_key: PlayerKey,
    pub periods: usize,
    pub outcomes: FxHashMap<Metric, MetricOutcome>,
}
impl ForecastBatch {
    pub fn forecasts(&self) -> impl Iterator<Item = &ForecastResult> {
        self.outcomes.values().filter_map(MetricOutcome::forecast)
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &ErrorDescriptor> {
        self.outcomes.values().filter_map(MetricOutcome::unavailable)
    }
}

#[derive(Debug)]
pub struct ForecastService {
    forecaster: Forecaster,
    catalog: MetricCatalog,
    cache: ForecastCache,
    max_periods: usize,
    parallel: bool,
}
impl ForecastService {
    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }

    pub fn forecast_player(
        &self,
        player_key: &PlayerKey,
        series_by_metric: &FxHashMap<Metric, SeasonSeries>,
        metrics: impl IntoIterator<Item = Metric>,
        periods: usize,
    ) -> Result<ForecastBatch, ForecastError> {
        if !(1..=self.max_periods).contains(&periods) {
            return Err(ForecastError::InvalidParameter(format!(
                "periods must lie in 1..={}, got {periods}",
                self.max_periods
            )));
        }

        let mut distinct = FxHashSet::default();
        let mut requests = vec![];
        for metric in metrics {
            if distinct.insert(metric) {
                let bound = self.catalog.bound(player_key.role, metric)?;
                let series = series_by_metric.get(&metric);
                if let Some(series) = series {
                    if series.player_key != *player_key {
                        return Err(ForecastError::InvalidParameter(format!(
                            "{metric} series belongs to {}, not {player_key}",
                            series.player_key
                        )));
                    }
                }
                requests.push((metric, bound, series));
            }
        }
        if requests.is_empty() {
            return Err(ForecastError::InvalidParameter("no metrics requested".into()));
        }

        let forecast = |&(metric, bound, series): &(Metric, &MetricBound, Option<&SeasonSeries>)| {
            self.forecast_metric(player_key, metric, bound, series, periods)
                .map(|outcome| (metric, outcome))
        };
        let outcomes = if self.parallel {
            requests
                .par_iter()
                .map(forecast)
                .collect::<Result<FxHashMap<_, _>, _>>()?
        } else {
            requests
                .iter()
                .map(forecast)
                .collect::<Result<FxHashMap<_, _>, _>>()?
        };

        let batch = ForecastBatch {
            player_key: player_key.clone(),
            periods,
            outcomes,
        };
        info!(
            "forecast {player_key} over {periods} season(s): {} available, {} unavailable",
            batch.forecasts().count(),
            batch.unavailable().count()
        );
        Ok(batch)
    }

    fn forecast_metric(
        &self,
        player_key: &PlayerKey,
        metric: Metric,
        bound: &MetricBound,
        series: Option<&SeasonSeries>,
        periods: usize,
    ) -> Result<MetricOutcome, ForecastError> {
        let min_seasons = self.forecaster.options().min_seasons;
        let series = match series {
            Some(series) if has_min_seasons(series, min_seasons) => series,
            _ => {
                let seasons = series.map(SeasonSeries::seasons).unwrap_or_default();
                return Ok(MetricOutcome::Unavailable(ErrorDescriptor {
                    metric,
                    reason: UnavailableReason::InsufficientHistory,
                    detail: format!(
                        "{} of {min_seasons} required seasons {seasons:?}",
                        seasons.len()
                    ),
                }));
            }
        };

        let cached = self.cache.get_or_try_insert(CacheKey::of(series, periods), || {
            self.forecaster
                .forecast(series, metric, periods)
                .map(|result| result.clip_future(bound))
        });
        let (reason, err) = match cached {
            Ok(cached) => return Ok(MetricOutcome::Forecast(cached.value)),
            Err(err @ ForecastError::InsufficientHistory { .. }) => {
                (UnavailableReason::InsufficientHistory, err)
            }
            Err(err @ ForecastError::ForecastComputation { .. }) => {
                (UnavailableReason::ComputationFailed, err)
            }
            Err(err @ ForecastError::DataIntegrity(_)) => (UnavailableReason::InvalidData, err),
            Err(err @ (ForecastError::InvalidParameter(_) | ForecastError::Cache(_))) => {
                return Err(err)
            }
        };
        warn!(
            "no forecast of {player_key} {metric} over {} season(s): {err}",
            series.len()
        );
        Ok(MetricOutcome::Unavailable(ErrorDescriptor {
            metric,
            reason,
            detail: err.to_string(),
        }))
    }
}

impl TryFrom<&Config> for ForecastService {
    type Error = anyhow::Error;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            forecaster: Forecaster::try_from(config.forecast.clone())?,
            catalog: MetricCatalog::standard(),
            cache: ForecastCache::with_ttl(config.cache_ttl()),
            max_periods: config.max_periods,
            parallel: config.parallel,
        })
    }
}
