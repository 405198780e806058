//! Helpers shared by the feed adapters.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use boat_ride_core::route::{METRES_PER_NM, haversine_m};
use chrono::NaiveDateTime;

/// Great-circle distance in nautical miles.
pub(crate) fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_m(lat1, lon1, lat2, lon2) / METRES_PER_NM
}

/// Index of the timestamp closest to `t`; the earliest wins a tie.
pub(crate) fn nearest_index<I>(times: I, t: NaiveDateTime) -> Option<usize>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    times
        .into_iter()
        .enumerate()
        .min_by_key(|(_, ti)| (*ti - t).num_seconds().abs())
        .map(|(i, _)| i)
}

/// Look `key` up in `cache`, loading and storing it on a miss.
///
/// The lock is not held while loading. Failed loads are not cached.
pub(crate) fn memoize<K, V, E>(
    cache: &Mutex<HashMap<K, V>>,
    key: K,
    load: impl FnOnce() -> Result<V, E>,
) -> Result<V, E>
where
    K: Eq + Hash,
    V: Clone,
{
    if let Some(hit) = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(hit.clone());
    }
    let value = load()?;
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, value.clone());
    Ok(value)
}
