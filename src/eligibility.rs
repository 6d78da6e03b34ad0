//! Minimum-history predicates and the anchor-season gate.

use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::series::SeasonSeries;

/// Whether `series` spans at least `min_seasons` distinct seasons.
pub fn has_min_seasons(series: &SeasonSeries, min_seasons: usize) -> bool {
    series.distinct_seasons() >= min_seasons
}

/// Whether every one of `required` appears among `seasons`.
pub fn has_required_seasons(seasons: &[i32], required: &[i32]) -> bool {
    let present = seasons.iter().collect::<FxHashSet<_>>();
    required.iter().all(|season| present.contains(season))
}

/// The seasons a player must have appeared in to be offered a forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AnchorSeasons {
    Pinned { seasons: Vec<i32> },
    /// The `count` most recently completed seasons, where a season completes at the end of
    /// `season_end_month`.
    Recent { count: usize, season_end_month: u32 },
}
impl AnchorSeasons {
    pub fn resolve(&self, today: NaiveDate) -> Vec<i32> {
        match self {
            AnchorSeasons::Pinned { seasons } => seasons.clone(),
            AnchorSeasons::Recent {
                count,
                season_end_month,
            } => {
                let last = last_completed_season(today, *season_end_month);
                (0..*count).rev().map(|back| last - back as i32).collect()
            }
        }
    }
}

impl Default for AnchorSeasons {
    fn default() -> Self {
        AnchorSeasons::Recent {
            count: 2,
            season_end_month: 10,
        }
    }
}

pub fn last_completed_season(today: NaiveDate, season_end_month: u32) -> i32 {
    if today.month() > season_end_month {
        today.year()
    } else {
        today.year() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub available: Vec<i32>,
    pub required: Vec<i32>,
    pub missing: Vec<i32>,
    pub has_min_seasons: bool,
}
impl EligibilityReport {
    pub fn is_eligible(&self) -> bool {
        self.has_min_seasons && self.missing.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    pub min_seasons: usize,
    pub anchors: AnchorSeasons,
}
impl EligibilityPolicy {
    pub fn evaluate(&self, seasons: &[i32], today: NaiveDate) -> EligibilityReport {
        let mut available = seasons.to_vec();
        available.sort_unstable();
        available.dedup();
        let required = self.anchors.resolve(today);
        let missing = required
            .iter()
            .filter(|season| !has_required_seasons(&available, &[**season]))
            .copied()
            .collect();
        EligibilityReport {
            has_min_seasons: available.len() >= self.min_seasons,
            available,
            required,
            missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::metric::Metric;
    use crate::player::{PlayerKey, Role};

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn min_seasons() {
        let series = SeasonSeries::new(
            PlayerKey::new(Role::Batter, "7654321"),
            Metric::Hits,
            [(2022, 170.), (2023, 181.)],
        );
        assert!(has_min_seasons(&series, 2));
        assert!(!has_min_seasons(&series, 3));
    }

    #[test]
    fn required_seasons() {
        assert!(has_required_seasons(&[2021, 2022, 2023], &[2022, 2023]));
        assert!(!has_required_seasons(&[2021, 2023], &[2022, 2023]));
        assert!(has_required_seasons(&[2021], &[]));
    }

    #[test]
    fn last_completed() {
        assert_eq!(2023, last_completed_season(date(2024, 3, 1), 10));
        assert_eq!(2023, last_completed_season(date(2023, 10, 31), 10));
        assert_eq!(2023, last_completed_season(date(2023, 11, 1), 10));
    }

    #[test]
    fn resolve_anchors() {
        let today = date(2024, 6, 15);
        assert_eq!(vec![2022, 2023], AnchorSeasons::default().resolve(today));
        assert_eq!(
            vec![2019],
            AnchorSeasons::Pinned {
                seasons: vec![2019]
            }
            .resolve(today)
        );
    }

    #[test]
    fn evaluate() {
        let policy = EligibilityPolicy {
            min_seasons: 2,
            anchors: AnchorSeasons::default(),
        };
        let today = date(2024, 6, 15);

        let report = policy.evaluate(&[2023, 2021, 2022], today);
        assert!(report.is_eligible());
        assert_eq!(vec![2021, 2022, 2023], report.available);

        let report = policy.evaluate(&[2021, 2023], today);
        assert!(!report.is_eligible());
        assert_eq!(vec![2022], report.missing);

        let report = policy.evaluate(&[2023], date(2023, 12, 1));
        assert_eq!(vec![2022, 2023], report.required);
        assert_eq!(vec![2022], report.missing);
        assert!(!report.has_min_seasons);
    }

    #[test]
    fn serde_json() {
        let anchors: AnchorSeasons =
            serde_json::from_str(r#"{"kind": "Pinned", "seasons": [2023, 2024]}"#).unwrap();
        assert_eq!(
            AnchorSeasons::Pinned {
                seasons: vec![2023, 2024]
            },
            anchors
        );
    }
}
