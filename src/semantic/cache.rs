use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

struct CacheEntry {
    value: String,
    created_at: DateTime<Utc>,
}

/// Fixed-TTL response cache for semantic provider calls.
///
/// Keys combine task, provider and input text so a fallback provider never
/// serves another provider's cached answer. Expired entries are evicted
/// lazily on the next lookup; concurrent requests may race on
/// insert/lookup, which at worst costs one extra provider call.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache key for a (task, provider, input) triple
    pub fn key(task: &str, provider: &str, input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(task.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(provider.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(input.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if Utc::now() - entry.created_at < self.ttl => {
                debug!("Cache hit for {}", &key[..8.min(key.len())]);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, value: String) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Utc::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
