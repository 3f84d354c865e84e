use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe in-memory cache whose entries expire after a fixed TTL
///
/// Expiry is checked on read; `purge_expired` reclaims memory explicitly.
/// Clones share the same storage.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    data: Arc<RwLock<HashMap<K, Entry<V>>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a fresh value for `key`
    pub fn get(&self, key: &K) -> Result<Option<V>, String> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &K, now: Instant) -> Result<Option<V>, String> {
        let data = self.data.read().map_err(|e| e.to_string())?;

        Ok(data
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    /// Store `value`, replacing any previous entry and restarting its TTL
    pub fn insert(&self, key: K, value: V) -> Result<(), String> {
        self.insert_at(key, value, Instant::now())
    }

    fn insert_at(&self, key: K, value: V, now: Instant) -> Result<(), String> {
        let mut data = self.data.write().map_err(|e| e.to_string())?;
        data.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    /// Drop one entry; returns whether it was present
    pub fn invalidate(&self, key: &K) -> Result<bool, String> {
        let mut data = self.data.write().map_err(|e| e.to_string())?;
        Ok(data.remove(key).is_some())
    }

    /// Clear all entries
    pub fn clear(&self) -> Result<(), String> {
        let mut data = self.data.write().map_err(|e| e.to_string())?;
        data.clear();
        Ok(())
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> Result<usize, String> {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> Result<usize, String> {
        let mut data = self.data.write().map_err(|e| e.to_string())?;
        let before = data.len();
        data.retain(|_, entry| entry.expires_at > now);
        Ok(before - data.len())
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> Result<usize, String> {
        let data = self.data.read().map_err(|e| e.to_string())?;
        Ok(data.len())
    }

    pub fn is_empty(&self) -> Result<bool, String> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_fresh_value() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("SPY", 1).unwrap();

        assert_eq!(cache.get(&"SPY").unwrap(), Some(1));
        assert_eq!(cache.get(&"QQQ").unwrap(), None);
    }

    #[test]
    fn test_entry_expires() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.insert_at("SPY", 1, now).unwrap();

        assert_eq!(cache.get_at(&"SPY", now + Duration::from_secs(59)).unwrap(), Some(1));
        assert_eq!(cache.get_at(&"SPY", now + Duration::from_secs(60)).unwrap(), None);
        // Expired entries linger until purged
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_insert_restarts_ttl() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let now = Instant::now();
        cache.insert_at("SPY", 1, now).unwrap();
        cache.insert_at("SPY", 2, now + Duration::from_secs(8)).unwrap();

        assert_eq!(cache.get_at(&"SPY", now + Duration::from_secs(15)).unwrap(), Some(2));
    }

    #[test]
    fn test_invalidate() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("SPY", 1).unwrap();
        cache.insert("QQQ", 2).unwrap();

        assert!(cache.invalidate(&"SPY").unwrap());
        assert!(!cache.invalidate(&"SPY").unwrap());
        assert_eq!(cache.get(&"SPY").unwrap(), None);
        assert_eq!(cache.get(&"QQQ").unwrap(), Some(2));
    }

    #[test]
    fn test_purge_expired() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let now = Instant::now();
        cache.insert_at("old", 1, now).unwrap();
        cache.insert_at("new", 2, now + Duration::from_secs(9)).unwrap();

        let removed = cache.purge_expired_at(now + Duration::from_secs(12)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("SPY", 1).unwrap();
        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_clones_share_storage() {
        use std::thread;

        let cache = TtlCache::new(Duration::from_secs(60));
        let cache_clone = cache.clone();

        let handle = thread::spawn(move || {
            for i in 0..50 {
                cache_clone.insert(i, i * 2).unwrap();
            }
        });
        handle.join().unwrap();

        assert_eq!(cache.len().unwrap(), 50);
        assert_eq!(cache.get(&7).unwrap(), Some(14));
    }
}
