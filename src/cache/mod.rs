//! A key -> value store with TTL-based eviction, built on [`crate::time::TimeQueue`].
//!
//! Publish-side track state uses this to retain recently sent objects: a
//! late subscriber's `largest-object` filter and a `FETCH` both need to
//! read objects that were sent before the subscriber arrived, within
//! whatever retention window the application configured.

use std::collections::BTreeMap;

use crate::time::{TimeQueue, TimeQueueError};

/// A key/value cache where every entry carries its own TTL.
///
/// Keyed by an ordered type (typically `(u64, u64)` group/object
/// coordinates, or a track hash) so that [`Cache::range`] can serve
/// contiguous lookups for fetches.
pub struct Cache<K: Ord + Clone, V> {
    map: BTreeMap<K, V>,
    expiry: TimeQueue<K>,
}

impl<K: Ord + Clone, V> Cache<K, V> {
    pub fn new(duration_ms: u64, interval_ms: u64) -> Result<Self, TimeQueueError> {
        Ok(Self {
            map: BTreeMap::new(),
            expiry: TimeQueue::new(duration_ms, interval_ms)?,
        })
    }

    /// Advance the eviction clock, dropping any keys whose retention
    /// window has elapsed. Called implicitly by every other method.
    pub fn advance(&mut self, now_ms: u64) {
        for key in self.expiry.advance(now_ms) {
            self.map.remove(&key);
        }
    }

    pub fn insert(&mut self, now_ms: u64, key: K, value: V, ttl_ms: u64) -> Result<(), TimeQueueError> {
        self.advance(now_ms);
        self.expiry.push(now_ms, key.clone(), ttl_ms, 0)?;
        self.map.insert(key, value);
        Ok(())
    }

    /// O(log n) single-key lookup.
    pub fn get(&mut self, now_ms: u64, key: &K) -> Option<&V> {
        self.advance(now_ms);
        self.map.get(key)
    }

    pub fn contains(&mut self, now_ms: u64, key: &K) -> bool {
        self.advance(now_ms);
        self.map.contains_key(key)
    }

    pub fn first(&mut self, now_ms: u64) -> Option<(&K, &V)> {
        self.advance(now_ms);
        self.map.iter().next()
    }

    pub fn last(&mut self, now_ms: u64) -> Option<(&K, &V)> {
        self.advance(now_ms);
        self.map.iter().next_back()
    }

    pub fn len(&mut self, now_ms: u64) -> usize {
        self.advance(now_ms);
        self.map.len()
    }

    pub fn is_empty(&mut self, now_ms: u64) -> bool {
        self.len(now_ms) == 0
    }

    /// Every entry with a key in `[start, end]`, in key order. Used to
    /// serve `FETCH` (§4.6): unlike [`Cache::get`] this tolerates gaps,
    /// since a fetch range legitimately skips over never-sent coordinates.
    pub fn range(&mut self, now_ms: u64, start: K, end: K) -> Vec<(K, &V)> {
        self.advance(now_ms);
        self.map.range(start..=end).map(|(k, v)| (k.clone(), v)).collect()
    }
}

impl<V> Cache<u64, V> {
    /// A contiguous range of integer keys `[start, end]`, returned dense
    /// only if every key in the range is present; `None` if any are
    /// missing (expired or never inserted).
    pub fn range_dense(&mut self, now_ms: u64, start: u64, end: u64) -> Option<Vec<(u64, &V)>> {
        self.advance(now_ms);
        if start > end {
            return Some(Vec::new());
        }
        let mut out = Vec::with_capacity((end - start + 1) as usize);
        for key in start..=end {
            let value = self.map.get(&key)?;
            out.push((key, value));
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_expire() {
        let mut cache: Cache<u64, Vec<u8>> = Cache::new(1000, 100).unwrap();
        cache.insert(0, 5, vec![1, 2, 3], 300).unwrap();
        assert_eq!(cache.get(50, &5), Some(&vec![1, 2, 3]));
        assert_eq!(cache.get(5000, &5), None);
    }

    #[test]
    fn range_dense_requires_every_key() {
        let mut cache: Cache<u64, u8> = Cache::new(1000, 100).unwrap();
        cache.insert(0, 1, 1, 900).unwrap();
        cache.insert(0, 2, 2, 900).unwrap();
        // key 3 missing -> no dense range
        assert!(cache.range_dense(10, 1, 3).is_none());
        assert!(cache.range_dense(10, 1, 2).is_some());
    }

    #[test]
    fn first_last_track_retention() {
        let mut cache: Cache<u64, u8> = Cache::new(1000, 100).unwrap();
        cache.insert(0, 10, 10, 900).unwrap();
        cache.insert(0, 20, 20, 900).unwrap();
        assert_eq!(cache.first(10).map(|(k, _)| *k), Some(10));
        assert_eq!(cache.last(10).map(|(k, _)| *k), Some(20));
    }
}
