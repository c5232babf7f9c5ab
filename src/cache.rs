//! Short-lived in-memory cache for store queries.
//!
//! Owned by the component that fetches (the activity store) and never
//! reached by the streak / forecast core. Bounded by an LRU capacity;
//! expired entries are dropped on read and swept on every insert.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;

/// Capacity used when zero entries are requested
const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
  Some(n) => n,
  None => unreachable!(),
};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
  fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

pub struct TtlCache<K, V> {
  ttl: Duration,
  entries: Mutex<LruCache<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  pub fn new(ttl: Duration, max_entries: usize) -> Self {
    let capacity = NonZeroUsize::new(max_entries).unwrap_or(DEFAULT_CAPACITY);
    Self {
      ttl,
      entries: Mutex::new(LruCache::new(capacity)),
    }
  }

  pub fn get(&self, key: &K) -> Option<V> {
    self.get_at(key, Utc::now())
  }

  /// Lookup against an explicit clock; an expired hit is evicted
  pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
    let mut entries = self.lock();
    let expired = match entries.get(key) {
      Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
      Some(_) => true,
      None => false,
    };
    if expired {
      entries.pop(key);
    }
    None
  }

  pub fn insert(&self, key: K, value: V) {
    self.insert_at(key, value, Utc::now());
  }

  /// Store `value` until `now + ttl`. Nothing is cached when that instant
  /// is not representable.
  pub fn insert_at(&self, key: K, value: V, now: DateTime<Utc>) {
    let Some(expires_at) = now.checked_add_signed(self.ttl) else {
      return;
    };
    let mut entries = self.lock();
    Self::sweep(&mut entries, now);
    // Least recently used entry goes once capacity is reached
    entries.push(key, CacheEntry { value, expires_at });
  }

  /// Drop every entry whose key matches; returns how many were removed
  pub fn invalidate_where<F>(&self, predicate: F) -> usize
  where
    F: Fn(&K) -> bool,
  {
    let mut entries = self.lock();
    let keys: Vec<K> = entries
      .iter()
      .filter(|(k, _)| predicate(k))
      .map(|(k, _)| k.clone())
      .collect();
    for key in &keys {
      entries.pop(key);
    }
    keys.len()
  }

  pub fn purge_expired(&self) -> usize {
    Self::sweep(&mut self.lock(), Utc::now())
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn capacity(&self) -> usize {
    self.lock().cap().get()
  }

  fn sweep(entries: &mut LruCache<K, CacheEntry<V>>, now: DateTime<Utc>) -> usize {
    let expired: Vec<K> = entries
      .iter()
      .filter(|(_, e)| e.is_expired(now))
      .map(|(k, _)| k.clone())
      .collect();
    for key in &expired {
      entries.pop(key);
    }
    expired.len()
  }

  fn lock(&self) -> MutexGuard<'_, LruCache<K, CacheEntry<V>>> {
    // A panic mid-insert leaves the map usable
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
