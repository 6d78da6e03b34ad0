//! Season-by-season forecasting of baseball player statistics.
//!
//! A player's history for a metric is fitted with a trend regression and projected a few seasons
//! ahead with widening uncertainty bands. Forecasts are clipped into each metric's valid range
//! and memoized per player, metric, horizon and input fingerprint.

pub mod cache;
pub mod config;
pub mod csv;
pub mod data;
pub mod eligibility;
pub mod error;
pub mod file;
pub mod forecast;
pub mod linear;
pub mod metric;
pub mod player;
pub mod print;
pub mod series;
pub mod service;
pub mod timed;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
