//! Process configuration, read from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::data::DataSource;
use crate::eligibility::AnchorSeasons;
use crate::file::FromJsonFile;
use crate::forecast::{ForecastOptions, MAX_HORIZON};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataSource,
    pub cache_ttl_secs: u64,
    pub max_periods: usize,
    pub default_periods: usize,
    pub parallel: bool,
    pub forecast: ForecastOptions,
    pub eligibility: AnchorSeasons,
}
impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let config = Config::from_json_file(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.data.validate()?;
        self.forecast.validate()?;
        if !(1..=MAX_HORIZON).contains(&self.max_periods) {
            bail!("max periods must lie in 1..={MAX_HORIZON}, got {}", self.max_periods);
        }
        if !(1..=self.max_periods).contains(&self.default_periods) {
            bail!(
                "default periods must lie in 1..={}, got {}",
                self.max_periods,
                self.default_periods
            );
        }
        if let AnchorSeasons::Recent {
            count,
            season_end_month,
        } = &self.eligibility
        {
            if *count == 0 {
                bail!("at least one recent season must be required");
            }
            if !(1..=12).contains(season_end_month) {
                bail!("season end month must lie in 1..=12, got {season_end_month}");
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataSource::default(),
            cache_ttl_secs: 3_600,
            max_periods: 5,
            default_periods: 5,
            parallel: true,
            forecast: ForecastOptions::default(),
            eligibility: AnchorSeasons::default(),
        }
    }
}
