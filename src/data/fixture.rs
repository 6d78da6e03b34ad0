//! Deterministic sample players for running without data files.

use std::ops::RangeInclusive;

use rustc_hash::FxHashMap;
use tinyrand::{Rand, Seeded, StdRand};

use crate::data::{PlayerRecord, SeasonRow};
use crate::metric::Metric;
use crate::player::{PlayerKey, Role};

const BATTERS: [(&str, &str); 3] = [
    ("1234567", "Mike Trout"),
    ("7654321", "Aaron Judge"),
    ("9876543", "Shohei Ohtani"),
];

const PITCHERS: [(&str, &str); 3] = [
    ("1234568", "Clayton Kershaw"),
    ("7654322", "Jacob deGrom"),
    ("9876544", "Gerrit Cole"),
];

/// `(metric, lower, upper, decimals)`; values are drawn uniformly from `[lower, upper)` and
/// rounded, or truncated when `decimals` is zero.
const BATTER_RANGES: [(Metric, f64, f64, i32); 10] = [
    (Metric::BattingAverage, 0.250, 0.350, 3),
    (Metric::OnBasePercentage, 0.330, 0.450, 3),
    (Metric::SluggingPercentage, 0.400, 0.650, 3),
    (Metric::Ops, 0.750, 1.050, 3),
    (Metric::Hits, 120., 220., 0),
    (Metric::Rbis, 70., 130., 0),
    (Metric::HomeRuns, 15., 45., 0),
    (Metric::StolenBases, 0., 30., 0),
    (Metric::Walks, 40., 100., 0),
    (Metric::StrikeOuts, 80., 200., 0),
];

const PITCHER_RANGES: [(Metric, f64, f64, i32); 8] = [
    (Metric::EarnedRunAverage, 2.0, 4.5, 2),
    (Metric::Whip, 0.9, 1.3, 2),
    (Metric::Wins, 10., 20., 0),
    (Metric::Losses, 5., 15., 0),
    (Metric::StrikeOuts, 150., 300., 0),
    (Metric::Walks, 30., 90., 0),
    (Metric::HitsAllowed, 120., 200., 0),
    (Metric::InningsPitched, 150., 220., 1),
];

/// Three batters and three pitchers with an observation for every metric in every season.
pub fn generate(seed: u64, seasons: RangeInclusive<i32>) -> Vec<PlayerRecord> {
    let mut rand = StdRand::seed(seed);
    let mut records = vec![];
    for (role, players, ranges) in [
        (Role::Batter, &BATTERS, &BATTER_RANGES[..]),
        (Role::Pitcher, &PITCHERS, &PITCHER_RANGES[..]),
    ] {
        for &(id, name) in players {
            let rows = seasons
                .clone()
                .map(|season| SeasonRow {
                    season,
                    values: ranges
                        .iter()
                        .map(|&(metric, lower, upper, decimals)| {
                            (metric, draw(&mut rand, lower, upper, decimals))
                        })
                        .collect::<FxHashMap<_, _>>(),
                })
                .collect();
            records.push(PlayerRecord {
                key: PlayerKey::new(role, id),
                name: name.into(),
                rows,
            });
        }
    }
    records
}

fn draw(rand: &mut impl Rand, lower: f64, upper: f64, decimals: i32) -> f64 {
    let unit = rand.next_u64() as f64 / u64::MAX as f64;
    let value = lower + (upper - lower) * unit;
    if decimals == 0 {
        value.trunc()
    } else {
        let scale = 10_f64.powi(decimals);
        (value * scale).round() / scale
    }
}
