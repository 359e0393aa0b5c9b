//! In-process key/value cache with per-entry TTL.
//!
//! The store stays the source of truth; the cache only accelerates the
//! read-heavy "habits for today" path. A miss or an evicted entry never
//! produces a wrong answer, only a slower one.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// TTL for cached habit-completion windows (1 hour).
pub const HABITS_CACHE_TTL: Duration = Duration::from_secs(3600);
/// TTL for cached user-stats views (30 minutes).
pub const STATS_CACHE_TTL: Duration = Duration::from_secs(1800);

const MAX_CACHE_ENTRIES: usize = 256; // Limit memory usage

struct CacheEntry {
    data: Value,
    created_at: Instant,
    ttl: Duration,
}

/// Shared TTL cache, injected through `AppState` rather than held as a
/// process global so tests can construct isolated instances.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value if present and not expired. Expired entries
    /// are pruned on the way out so they are only paid for once.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < entry.ttl => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, data: Value, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() >= MAX_CACHE_ENTRIES && !entries.contains_key(key) {
                // Evict the oldest entry to stay bounded
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.created_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                }
            }
            entries.insert(
                key.to_string(),
                CacheEntry {
                    data,
                    created_at: Instant::now(),
                    ttl,
                },
            );
        }
    }

    pub fn delete(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Drop every entry for a user. Keys are namespaced `{prefix}:{user_id}:...`
    /// so a completion event can invalidate all affected windows at once.
    pub fn delete_user_entries(&self, user_id: i32) {
        let marker = format!(":{}:", user_id);
        let suffix = format!(":{}", user_id);
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|k, _| !k.contains(&marker) && !k.ends_with(&suffix));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_returns_value_within_ttl() {
        let cache = Cache::new();
        cache.set("k", json!({"a": 1}), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = Cache::new();
        cache.set("k", json!(1), Duration::from_secs(0));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn delete_user_entries_removes_all_windows() {
        let cache = Cache::new();
        cache.set("habits:7:2024-01-01:2024-12-31", json!(1), Duration::from_secs(60));
        cache.set("stats:7", json!(2), Duration::from_secs(60));
        cache.set("stats:8", json!(3), Duration::from_secs(60));
        cache.delete_user_entries(7);
        assert_eq!(cache.get("habits:7:2024-01-01:2024-12-31"), None);
        assert_eq!(cache.get("stats:7"), None);
        assert_eq!(cache.get("stats:8"), Some(json!(3)));
    }
}
