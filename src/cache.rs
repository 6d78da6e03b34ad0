//! Time-bounded memoization of forecast results.
//!
//! Entries are keyed by player, metric, horizon and the fingerprint of the input series, so a
//! change to any observation misses. Each key owns a slot whose lock is held while its value is
//! computed; concurrent requests for the same key therefore run a single fit and read its result.
//! Inserting a new key sweeps out expired slots, and a failed computation removes its own slot, so
//! the map holds little more than the fresh entries.

use std::ops::{Add, AddAssign};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::forecast::ForecastResult;
use crate::metric::Metric;
use crate::player::PlayerKey;
use crate::series::SeasonSeries;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3_600);

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub player_key: PlayerKey,
    pub metric: Metric,
    pub periods: usize,
    pub fingerprint: u64,
}
impl CacheKey {
    pub fn of(series: &SeasonSeries, periods: usize) -> Self {
        Self {
            player_key: series.player_key.clone(),
            metric: series.metric,
            periods,
            fingerprint: series.fingerprint(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: ForecastResult,
    pub created_at: Instant,
}
impl CacheEntry {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// A value together with whether it was served from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub hit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    hits: usize,
    misses: usize,
}
impl CacheStats {
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl Add<bool> for CacheStats {
    type Output = CacheStats;

    fn add(mut self, cache_hit: bool) -> Self::Output {
        self += cache_hit;
        self
    }
}

impl AddAssign<bool> for CacheStats {
    fn add_assign(&mut self, cache_hit: bool) {
        if cache_hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

impl AddAssign for CacheStats {
    fn add_assign(&mut self, rhs: Self) {
        self.hits += rhs.hits;
        self.misses += rhs.misses;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache lock poisoned while {0}")]
pub struct CachePoisoned(pub &'static str);

type Slot = Arc<Mutex<Option<CacheEntry>>>;

#[derive(Debug)]
pub struct ForecastCache {
    ttl: Duration,
    slots: Mutex<FxHashMap<CacheKey, Slot>>,
    stats: Mutex<CacheStats>,
}
impl ForecastCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::default(),
            stats: Mutex::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serves a fresh entry for `key` or computes, stores and returns a new one. Failed
    /// computations are not stored.
    pub fn get_or_try_insert<E: From<CachePoisoned>>(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<ForecastResult, E>,
    ) -> Result<Cached<ForecastResult>, E> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| CachePoisoned("locating a slot"))?;
            match slots.get(&key) {
                Some(slot) => slot.clone(),
                None => {
                    let evicted = evict(&mut slots, self.ttl);
                    if evicted > 0 {
                        debug!("evicted {evicted} expired slot(s)");
                    }
                    slots.entry(key.clone()).or_default().clone()
                }
            }
        };

        let mut entry = slot.lock().map_err(|_| CachePoisoned("reading a slot"))?;
        let fresh = entry
            .as_ref()
            .filter(|existing| existing.is_fresh(self.ttl))
            .map(|existing| existing.value.clone());
        let cached = match fresh {
            Some(value) => {
                debug!("cache hit for {} {}", key.player_key, key.metric);
                Cached { value, hit: true }
            }
            None => {
                debug!("cache miss for {} {}", key.player_key, key.metric);
                let value = match compute() {
                    Ok(value) => value,
                    Err(err) => {
                        let vacant = entry.is_none();
                        drop(entry);
                        if vacant {
                            self.release(&key, &slot)?;
                        }
                        return Err(err);
                    }
                };
                *entry = Some(CacheEntry {
                    value: value.clone(),
                    created_at: Instant::now(),
                });
                Cached { value, hit: false }
            }
        };
        drop(entry);

        *self
            .stats
            .lock()
            .map_err(|_| CachePoisoned("updating stats"))? += cached.hit;
        Ok(cached)
    }

    /// Removes the slot for `key` if it is still `slot`, still empty and held by no other request.
    fn release(&self, key: &CacheKey, slot: &Slot) -> Result<(), CachePoisoned> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| CachePoisoned("releasing a slot"))?;
        let owned = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
        if owned && slot.try_lock().is_ok_and(|entry| entry.is_none()) {
            slots.remove(key);
        }
        Ok(())
    }

    /// Drops expired and empty slots, returning how many were removed. Slots that are being
    /// computed or awaited are kept.
    pub fn purge_expired(&self) -> Result<usize, CachePoisoned> {
        let mut slots = self.slots.lock().map_err(|_| CachePoisoned("purging"))?;
        Ok(evict(&mut slots, self.ttl))
    }

    pub fn len(&self) -> Result<usize, CachePoisoned> {
        Ok(self.slots.lock().map_err(|_| CachePoisoned("counting"))?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CachePoisoned> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> Result<CacheStats, CachePoisoned> {
        Ok(self
            .stats
            .lock()
            .map_err(|_| CachePoisoned("reading stats"))?
            .clone())
    }
}

/// Retains only the slots that are fresh or in use. A slot referenced solely by the map cannot
/// gain a holder while the map is locked.
fn evict(slots: &mut FxHashMap<CacheKey, Slot>, ttl: Duration) -> usize {
    let before = slots.len();
    slots.retain(|_, slot| {
        if Arc::strong_count(slot) > 1 {
            return true;
        }
        match slot.try_lock() {
            Ok(entry) => entry.as_ref().is_some_and(|entry| entry.is_fresh(ttl)),
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        }
    });
    before - slots.len()
}

impl Default for ForecastCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use crate::error::ForecastError;
    use crate::forecast::{ForecastOptions, Forecaster};
    use crate::player::Role;

    use super::*;

    fn series(last: f64) -> SeasonSeries {
        SeasonSeries::new(
            PlayerKey::new(Role::Pitcher, "9876544"),
            Metric::StrikeOuts,
            [(2021, 243.), (2022, 257.), (2023, last)],
        )
    }

    fn compute(series: &SeasonSeries) -> Result<ForecastResult, ForecastError> {
        Forecaster::try_from(ForecastOptions::default())
            .unwrap()
            .forecast(series, series.metric, 2)
    }

    #[test]
    fn add_bool() {
        assert_eq!(CacheStats { hits: 1, misses: 0 }, CacheStats::default() + true);
        assert_eq!(CacheStats { hits: 0, misses: 1 }, CacheStats::default() + false);
    }

    #[test]
    fn add_assign_self() {
        let mut stats = CacheStats { hits: 4, misses: 5 };
        stats += CacheStats { hits: 3, misses: 1 };
        assert_eq!(CacheStats { hits: 7, misses: 6 }, stats);
    }

    #[test]
    fn miss_then_hit() {
        let cache = ForecastCache::default();
        let series = series(222.);
        let computed = AtomicUsize::new(0);
        let counting = || {
            computed.fetch_add(1, Ordering::SeqCst);
            compute(&series)
        };

        let first = cache.get_or_try_insert(CacheKey::of(&series, 2), counting).unwrap();
        assert!(!first.hit);
        let second = cache.get_or_try_insert(CacheKey::of(&series, 2), counting).unwrap();
        assert!(second.hit);
        assert_eq!(first.value, second.value);
        assert_eq!(1, computed.load(Ordering::SeqCst));
        assert_eq!(CacheStats { hits: 1, misses: 1 }, cache.stats().unwrap());
        assert_eq!(1, cache.len().unwrap());
    }

    #[test]
    fn fingerprint_change_misses() {
        let cache = ForecastCache::default();
        let before = series(222.);
        let revised = series(223.);
        cache
            .get_or_try_insert(CacheKey::of(&before, 2), || compute(&before))
            .unwrap();
        let cached = cache
            .get_or_try_insert(CacheKey::of(&revised, 2), || compute(&revised))
            .unwrap();
        assert!(!cached.hit);
        assert_eq!(2, cache.len().unwrap());
    }

    #[test]
    fn zero_ttl_recomputes() {
        let cache = ForecastCache::with_ttl(Duration::ZERO);
        let series = series(222.);
        for _ in 0..2 {
            let cached = cache
                .get_or_try_insert(CacheKey::of(&series, 2), || compute(&series))
                .unwrap();
            assert!(!cached.hit);
        }
        assert_eq!(CacheStats { hits: 0, misses: 2 }, cache.stats().unwrap());
        assert_eq!(1, cache.purge_expired().unwrap());
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn failures_are_not_stored() {
        let cache = ForecastCache::default();
        let series = series(222.);
        let err = cache
            .get_or_try_insert(CacheKey::of(&series, 2), || {
                Err(ForecastError::InvalidParameter("boom".into()))
            })
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
        assert!(cache.is_empty().unwrap());

        let cached = cache
            .get_or_try_insert(CacheKey::of(&series, 2), || compute(&series))
            .unwrap();
        assert!(!cached.hit);
    }

    #[test]
    fn new_keys_evict_expired_slots() {
        let cache = ForecastCache::with_ttl(Duration::ZERO);
        for last in 0..20 {
            let series = series(200. + last as f64);
            cache
                .get_or_try_insert(CacheKey::of(&series, 2), || compute(&series))
                .unwrap();
            assert_eq!(1, cache.len().unwrap());
        }
        assert_eq!(CacheStats { hits: 0, misses: 20 }, cache.stats().unwrap());
    }

    #[test]
    fn fresh_slots_survive_eviction() {
        let cache = ForecastCache::default();
        for last in 0..5 {
            let series = series(200. + last as f64);
            cache
                .get_or_try_insert(CacheKey::of(&series, 2), || compute(&series))
                .unwrap();
        }
        assert_eq!(5, cache.len().unwrap());
        assert_eq!(0, cache.purge_expired().unwrap());
    }

    #[test]
    fn concurrent_requests_compute_once() {
        let cache = ForecastCache::default();
        let series = series(222.);
        let computed = AtomicUsize::new(0);
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    cache
                        .get_or_try_insert(CacheKey::of(&series, 2), || {
                            computed.fetch_add(1, Ordering::SeqCst);
                            compute(&series)
                        })
                        .unwrap();
                });
            }
        });
        assert_eq!(1, computed.load(Ordering::SeqCst));
        assert_eq!(CacheStats { hits: 7, misses: 1 }, cache.stats().unwrap());
    }
}
