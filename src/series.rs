//! A player's per-season history for a single metric.

use std::hash::Hasher;

use rustc_hash::{FxHashSet, FxHasher};
use serde::{Deserialize, Serialize};

use crate::error::DataIntegrity;
use crate::metric::Metric;
use crate::player::PlayerKey;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonPoint {
    pub season: i32,
    pub value: f64,
}

impl From<(i32, f64)> for SeasonPoint {
    fn from((season, value): (i32, f64)) -> Self {
        Self { season, value }
    }
}

/// Observations in input order; seasons need not be ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSeries {
    pub player_key: PlayerKey,
    pub metric: Metric,
    pub points: Vec<SeasonPoint>,
}
impl SeasonSeries {
    pub fn new(player_key: PlayerKey, metric: Metric, points: impl IntoIterator<Item = impl Into<SeasonPoint>>) -> Self {
        Self {
            player_key,
            metric,
            points: points.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn distinct_seasons(&self) -> usize {
        self.points
            .iter()
            .map(|point| point.season)
            .collect::<FxHashSet<_>>()
            .len()
    }

    /// Distinct seasons, ascending.
    pub fn seasons(&self) -> Vec<i32> {
        let mut seasons = self.points.iter().map(|point| point.season).collect::<Vec<_>>();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }

    pub fn last_season(&self) -> Option<i32> {
        self.points.iter().map(|point| point.season).max()
    }

    /// A season-ascending copy, rejecting duplicate seasons and non-finite values.
    pub fn sorted(&self) -> Result<Vec<SeasonPoint>, DataIntegrity> {
        let mut sorted = self.points.clone();
        sorted.sort_by_key(|point| point.season);
        for (index, point) in sorted.iter().enumerate() {
            if !point.value.is_finite() {
                return Err(DataIntegrity::NonFinite {
                    metric: self.metric,
                    season: point.season,
                });
            }
            if index > 0 && sorted[index - 1].season == point.season {
                return Err(DataIntegrity::DuplicateSeason {
                    metric: self.metric,
                    season: point.season,
                });
            }
        }
        Ok(sorted)
    }

    /// Deterministic hash of the season-ordered `(season, value bits)` pairs. Any change to a
    /// season or a value yields a different fingerprint with overwhelming probability; input
    /// order does not matter.
    pub fn fingerprint(&self) -> u64 {
        let mut ordered = self
            .points
            .iter()
            .map(|point| (point.season, point.value.to_bits()))
            .collect::<Vec<_>>();
        ordered.sort_unstable();
        let mut hasher = FxHasher::default();
        hasher.write_usize(ordered.len());
        for (season, bits) in ordered {
            hasher.write_i32(season);
            hasher.write_u64(bits);
        }
        hasher.finish()
    }
}
