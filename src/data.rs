//! Loading of per-season player statistics.
//!
//! Each role's data is a table with `PlayerID`, `PlayerName` and `Season` columns followed by one
//! column per metric. Blank, `NA` and `NaN` cells mean the player has no observation for that
//! season; they are left out of the series rather than coerced to zero. Any other unparseable
//! cell rejects the whole table.

use std::io;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::info;

use crate::csv::CsvReader;
use crate::error::DataIntegrity;
use crate::metric::Metric;
use crate::player::{PlayerKey, Role};
use crate::series::SeasonSeries;

pub mod fixture;

const PLAYER_ID: &str = "PlayerID";
const PLAYER_NAME: &str = "PlayerName";
const SEASON: &str = "Season";
const MISSING_MARKERS: [&str; 3] = ["", "NA", "NaN"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DataSource {
    FileBacked {
        batters: PathBuf,
        pitchers: PathBuf,
    },
    SyntheticFixture {
        seed: u64,
        first_season: i32,
        last_season: i32,
    },
}
impl DataSource {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let DataSource::SyntheticFixture {
            first_season,
            last_season,
            ..
        } = self
        {
            if first_season > last_season {
                anyhow::bail!("synthetic seasons {first_season}..={last_season} are empty");
            }
        }
        Ok(())
    }
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::SyntheticFixture {
            seed: 0,
            first_season: 2000,
            last_season: 2023,
        }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("{} has no {column} column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("row {row} of {} has {actual} cells, expected {expected}", path.display())]
    RowLength {
        path: PathBuf,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} repeats season {season} for player {player}")]
    DuplicateRow { row: usize, player: String, season: i32 },

    #[error("{0}")]
    Integrity(#[from] DataIntegrity),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRow {
    pub season: i32,
    /// Observed values only; a missing metric had no observation that season.
    pub values: FxHashMap<Metric, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub key: PlayerKey,
    pub name: String,
    /// Ascending by season.
    pub rows: Vec<SeasonRow>,
}
impl PlayerRecord {
    pub fn seasons(&self) -> Vec<i32> {
        self.rows.iter().map(|row| row.season).collect()
    }

    pub fn series(&self, metric: Metric) -> SeasonSeries {
        SeasonSeries::new(
            self.key.clone(),
            metric,
            self.rows
                .iter()
                .filter_map(|row| row.values.get(&metric).map(|&value| (row.season, value))),
        )
    }

    pub fn series_by_metric(
        &self,
        metrics: impl IntoIterator<Item = Metric>,
    ) -> FxHashMap<Metric, SeasonSeries> {
        metrics
            .into_iter()
            .map(|metric| (metric, self.series(metric)))
            .collect()
    }
}

/// Parses one role's table from `reader`; `path` only labels errors.
pub fn read_records(role: Role, path: &Path, reader: impl BufRead) -> Result<Vec<PlayerRecord>, DataError> {
    let io_error = |source| DataError::Io {
        path: path.into(),
        source,
    };
    let mut csv = CsvReader::new(reader);
    let header = csv
        .next()
        .ok_or_else(|| DataError::Empty { path: path.into() })?
        .map_err(io_error)?;

    let column = |name: &'static str| {
        header
            .iter()
            .position(|cell| cell == name)
            .ok_or_else(|| DataError::MissingColumn {
                path: path.into(),
                column: name,
            })
    };
    let (id_col, name_col, season_col) = (column(PLAYER_ID)?, column(PLAYER_NAME)?, column(SEASON)?);
    let metric_cols = header
        .iter()
        .enumerate()
        .filter_map(|(col, cell)| Metric::from_str(cell).ok().map(|metric| (col, metric)))
        .collect::<Vec<_>>();

    let mut records: Vec<PlayerRecord> = vec![];
    let mut positions = FxHashMap::<String, usize>::default();
    let mut seen = FxHashSet::<(String, i32)>::default();
    for (index, record) in csv.enumerate() {
        let row = index + 2;
        let cells = record.map_err(io_error)?;
        if cells.len() != header.len() {
            return Err(DataError::RowLength {
                path: path.into(),
                row,
                expected: header.len(),
                actual: cells.len(),
            });
        }

        let malformed = |col: usize| DataIntegrity::MalformedCell {
            row,
            column: header[col].clone(),
            value: cells[col].clone(),
        };
        let id = &cells[id_col];
        if id.is_empty() {
            return Err(malformed(id_col).into());
        }
        let season = cells[season_col]
            .parse::<i32>()
            .map_err(|_| malformed(season_col))?;
        if !seen.insert((id.clone(), season)) {
            return Err(DataError::DuplicateRow {
                row,
                player: id.clone(),
                season,
            });
        }

        let mut values = FxHashMap::default();
        for &(col, metric) in &metric_cols {
            if let Some(value) = parse_cell(&cells[col]).map_err(|_| malformed(col))? {
                values.insert(metric, value);
            }
        }

        let position = *positions.entry(id.clone()).or_insert_with(|| {
            records.push(PlayerRecord {
                key: PlayerKey::new(role, id.clone()),
                name: cells[name_col].clone(),
                rows: vec![],
            });
            records.len() - 1
        });
        records[position].rows.push(SeasonRow { season, values });
    }

    for record in &mut records {
        record.rows.sort_by_key(|row| row.season);
    }
    Ok(records)
}

/// `Ok(None)` for a missing observation; `Err` for anything that is neither missing nor a finite
/// number.
fn parse_cell(cell: &str) -> Result<Option<f64>, ()> {
    if MISSING_MARKERS.contains(&cell) {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(()),
    }
}

/// All players of both roles, indexed by key.
#[derive(Debug, Default)]
pub struct DataRepository {
    batters: Vec<PlayerRecord>,
    pitchers: Vec<PlayerRecord>,
    index: FxHashMap<PlayerKey, usize>,
}
impl DataRepository {
    pub fn load(source: &DataSource) -> Result<Self, DataError> {
        let repository = match source {
            DataSource::FileBacked { batters, pitchers } => {
                let mut records = read_file(Role::Batter, batters)?;
                records.extend(read_file(Role::Pitcher, pitchers)?);
                Self::from_records(records)
            }
            DataSource::SyntheticFixture {
                seed,
                first_season,
                last_season,
            } => Self::from_records(fixture::generate(*seed, *first_season..=*last_season)),
        };
        info!(
            "loaded {} batters and {} pitchers over seasons {:?}",
            repository.batters.len(),
            repository.pitchers.len(),
            repository.seasons()
        );
        Ok(repository)
    }

    pub fn from_records(records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let mut repository = Self::default();
        for record in records {
            let players = match record.key.role {
                Role::Batter => &mut repository.batters,
                Role::Pitcher => &mut repository.pitchers,
            };
            repository.index.insert(record.key.clone(), players.len());
            players.push(record);
        }
        repository
    }

    pub fn players(&self, role: Role) -> &[PlayerRecord] {
        match role {
            Role::Batter => &self.batters,
            Role::Pitcher => &self.pitchers,
        }
    }

    pub fn player(&self, key: &PlayerKey) -> Option<&PlayerRecord> {
        self.index
            .get(key)
            .map(|&position| &self.players(key.role)[position])
    }

    /// Players of `role` whose name contains `name`, ignoring case.
    pub fn find_by_name(&self, role: Role, name: &str) -> Vec<&PlayerRecord> {
        let needle = name.trim().to_lowercase();
        self.players(role)
            .iter()
            .filter(|record| record.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Every season observed for any player, ascending.
    pub fn seasons(&self) -> Vec<i32> {
        let mut seasons = Role::iter()
            .flat_map(|role| self.players(role))
            .flat_map(|record| record.seasons())
            .collect::<Vec<_>>();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }
}

fn read_file(role: Role, path: &Path) -> Result<Vec<PlayerRecord>, DataError> {
    let reader = crate::file::open_buffered(path).map_err(|source| DataError::Io {
        path: path.into(),
        source,
    })?;
    read_records(role, path, reader)
}
