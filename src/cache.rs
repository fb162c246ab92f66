//! Keyed store with per-entry expiry. The pipeline itself is cache-agnostic
//! and safely re-runnable; the hosting process owns refresh policy and uses
//! this around the collaborator fetches so a re-render within the TTL doesn't
//! hammer the remote service.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// A value that has outlived the TTL is evicted on access, not in the
    /// background.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some((_, expires)) => *expires <= Instant::now(),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(value, _)| value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now() + self.ttl));
    }

    /// Fetch-through: compute and store on miss or expiry.
    pub fn get_or_insert_with(&mut self, key: K, produce: impl FnOnce() -> V) -> &V
    where
        K: Clone,
    {
        if self.get(&key).is_none() {
            let value = produce();
            self.insert(key.clone(), value);
        }
        &self.entries[&key].0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_returned() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("sales", 1);
        assert_eq!(cache.get(&"sales"), Some(&1));
    }

    #[test]
    fn expired_entries_are_evicted_on_access() {
        let mut cache = TtlCache::new(Duration::from_secs(0));
        cache.insert("sales", 1);
        assert_eq!(cache.get(&"sales"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn get_or_insert_with_computes_once_while_fresh() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_insert_with("sales", || {
                calls += 1;
                42
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn get_or_insert_with_recomputes_after_expiry() {
        let mut cache = TtlCache::new(Duration::from_secs(0));
        let mut calls = 0;
        for _ in 0..2 {
            cache.get_or_insert_with("sales", || {
                calls += 1;
                42
            });
        }
        assert_eq!(calls, 2);
    }
}
