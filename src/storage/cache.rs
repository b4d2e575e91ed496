use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub expires_at: DateTime<Utc>,
}

/// 带过期时间的内存缓存，用于同一批次内重复出现的来源页面
#[derive(Clone)]
pub struct Cache<T: Clone> {
    store: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
    ttl: Duration,
}

impl<T: Clone> Cache<T> {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let store = self.store.read().ok()?;
        store
            .get(key)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.data.clone())
    }

    pub fn set(&self, key: String, data: T) {
        if let Ok(mut store) = self.store.write() {
            store.insert(
                key,
                CacheEntry {
                    data,
                    expires_at: Utc::now() + self.ttl,
                },
            );
        }
    }

    pub fn clear_expired(&self) {
        if let Ok(mut store) = self.store.write() {
            let now = Utc::now();
            store.retain(|_, entry| entry.expires_at > now);
        }
    }

    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }
}
