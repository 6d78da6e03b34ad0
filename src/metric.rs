//! The supported statistics and their per-role validity bounds.

use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::ForecastError;
use crate::forecast::Prediction;
use crate::player::Role;

/// A statistic, named after its column in the tabular data.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum Metric {
    BattingAverage,
    OnBasePercentage,
    SluggingPercentage,
    #[strum(serialize = "OPS")]
    #[serde(rename = "OPS")]
    Ops,
    HomeRuns,
    Hits,
    #[strum(serialize = "RBIs")]
    #[serde(rename = "RBIs")]
    Rbis,
    StolenBases,
    Walks,
    StrikeOuts,
    EarnedRunAverage,
    Whip,
    Wins,
    Losses,
    InningsPitched,
    HitsAllowed,
}
impl Metric {
    /// Parses a column name, rejecting anything outside the enumeration.
    pub fn parse(name: &str) -> Result<Self, ForecastError> {
        Self::from_str(name.trim())
            .map_err(|_| ForecastError::InvalidParameter(format!("unknown metric '{name}'")))
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::BattingAverage => "batting average",
            Metric::OnBasePercentage => "on-base percentage",
            Metric::SluggingPercentage => "slugging percentage",
            Metric::Ops => "on-base plus slugging",
            Metric::HomeRuns => "home runs",
            Metric::Hits => "hits",
            Metric::Rbis => "runs batted in",
            Metric::StolenBases => "stolen bases",
            Metric::Walks => "walks",
            Metric::StrikeOuts => "strikeouts",
            Metric::EarnedRunAverage => "earned run average",
            Metric::Whip => "walks plus hits per inning pitched",
            Metric::Wins => "wins",
            Metric::Losses => "losses",
            Metric::InningsPitched => "innings pitched",
            Metric::HitsAllowed => "hits allowed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBound {
    pub metric: Metric,
    pub lower: f64,
    pub upper: f64,
    pub decimal_precision: usize,
}
impl MetricBound {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    /// Clamps all three components of a prediction. Since clamping is monotone, the ordering
    /// `lower <= center <= upper` survives.
    pub fn clip(&self, prediction: &Prediction) -> Prediction {
        Prediction {
            season: prediction.season,
            center: self.clamp(prediction.center),
            lower: self.clamp(prediction.lower),
            upper: self.clamp(prediction.upper),
        }
    }

    pub fn format(&self, value: f64) -> String {
        format!("{value:.prec$}", prec = self.decimal_precision)
    }
}

const BATTER_BOUNDS: [(Metric, f64, f64, usize); 10] = [
    (Metric::BattingAverage, 0., 0.4, 3),
    (Metric::OnBasePercentage, 0., 0.7, 3),
    (Metric::SluggingPercentage, 0., 0.8, 3),
    (Metric::Ops, 0., 1.4, 3),
    (Metric::HomeRuns, 0., 80., 0),
    (Metric::Hits, 0., 250., 0),
    (Metric::Rbis, 0., 200., 0),
    (Metric::StolenBases, 0., 100., 0),
    (Metric::Walks, 0., 150., 0),
    (Metric::StrikeOuts, 0., 250., 0),
];

const PITCHER_BOUNDS: [(Metric, f64, f64, usize); 8] = [
    (Metric::EarnedRunAverage, 0., 5., 2),
    (Metric::Whip, 0., 4., 2),
    (Metric::Wins, 0., 35., 0),
    (Metric::Losses, 0., 30., 0),
    (Metric::StrikeOuts, 0., 400., 0),
    (Metric::InningsPitched, 0., 300., 1),
    (Metric::Walks, 0., 150., 0),
    (Metric::HitsAllowed, 0., 300., 0),
];

/// Per-role metric bounds. Built once and shared read-only.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    batter: Vec<MetricBound>,
    pitcher: Vec<MetricBound>,
    index: FxHashMap<(Role, Metric), usize>,
}
impl MetricCatalog {
    pub fn standard() -> Self {
        fn bounds(table: &[(Metric, f64, f64, usize)]) -> Vec<MetricBound> {
            table
                .iter()
                .map(|&(metric, lower, upper, decimal_precision)| MetricBound {
                    metric,
                    lower,
                    upper,
                    decimal_precision,
                })
                .collect()
        }

        let batter = bounds(&BATTER_BOUNDS);
        let pitcher = bounds(&PITCHER_BOUNDS);
        let mut index = FxHashMap::default();
        for (role, bounds) in [(Role::Batter, &batter), (Role::Pitcher, &pitcher)] {
            for (position, bound) in bounds.iter().enumerate() {
                index.insert((role, bound.metric), position);
            }
        }
        Self {
            batter,
            pitcher,
            index,
        }
    }

    /// The bounds of every metric tracked for `role`, in catalog order.
    pub fn bounds(&self, role: Role) -> &[MetricBound] {
        match role {
            Role::Batter => &self.batter,
            Role::Pitcher => &self.pitcher,
        }
    }

    pub fn metrics(&self, role: Role) -> impl Iterator<Item = Metric> + '_ {
        self.bounds(role).iter().map(|bound| bound.metric)
    }

    pub fn bound(&self, role: Role, metric: Metric) -> Result<&MetricBound, ForecastError> {
        self.index
            .get(&(role, metric))
            .map(|&position| &self.bounds(role)[position])
            .ok_or_else(|| {
                ForecastError::InvalidParameter(format!("metric {metric} is not tracked for a {role}"))
            })
    }
}
