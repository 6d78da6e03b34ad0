//! Error types surfaced by forecasting.

use std::time::Duration;

use thiserror::Error;

use crate::cache::CachePoisoned;
use crate::linear::regression::RegressionError;
use crate::metric::Metric;
use crate::player::PlayerKey;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient history for {player} {metric}: {available} of {required} required seasons {seasons:?}")]
    InsufficientHistory {
        player: PlayerKey,
        metric: Metric,
        required: usize,
        available: usize,
        seasons: Vec<i32>,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("forecast of {player} {metric} over {samples} season(s) failed: {cause}")]
    ForecastComputation {
        player: PlayerKey,
        metric: Metric,
        samples: usize,
        #[source]
        cause: ComputationFailure,
    },

    #[error("{0}")]
    DataIntegrity(#[from] DataIntegrity),

    #[error("{0}")]
    Cache(#[from] CachePoisoned),
}

#[derive(Debug, Error)]
pub enum ComputationFailure {
    #[error("all observations are identical")]
    NoVariation,

    #[error("{0}")]
    Regression(#[from] RegressionError),

    #[error("no quantile for the confidence interval: {0}")]
    Quantile(String),

    #[error("non-finite prediction for season {0}")]
    NonFinite(i32),

    #[error("fit took {elapsed:?}, exceeding the budget of {budget:?}")]
    Budget { elapsed: Duration, budget: Duration },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrity {
    #[error("duplicate season {season} for {metric}")]
    DuplicateSeason { metric: Metric, season: i32 },

    #[error("non-finite {metric} value in season {season}")]
    NonFinite { metric: Metric, season: i32 },

    #[error("series for {actual} supplied where {expected} was requested")]
    MetricMismatch { expected: Metric, actual: Metric },

    #[error("malformed value '{value}' in column {column} of row {row}")]
    MalformedCell {
        row: usize,
        column: String,
        value: String,
    },
}
