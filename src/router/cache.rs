//! Bounded response cache
//!
//! Keys are `(model id, SHA-256 of the prompt, temperature bits)`, so the
//! cache never holds prompt text. Oldest-inserted entries are evicted once
//! capacity is reached; entries older than the TTL read as misses.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Cache key for one completion request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    model_id: String,
    prompt_digest: Vec<u8>,
    temperature_bits: u64,
}

impl CacheKey {
    pub fn new(model_id: &str, prompt: &str, temperature: f64) -> Self {
        // -0.0 and 0.0 must share a key
        let temperature = if temperature == 0.0 { 0.0 } else { temperature };
        Self {
            model_id: model_id.to_string(),
            prompt_digest: Sha256::digest(prompt.as_bytes()).to_vec(),
            temperature_bits: temperature.to_bits(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResponse {
    text: String,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CachedResponse>,
    order: VecDeque<CacheKey>,
}

impl CacheInner {
    fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

/// Provider response cache
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity,
            ttl,
        }
    }

    /// Cached text for the key, dropping it if expired
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let mut inner = self.inner.lock().await;
        let stored_at = inner.entries.get(key)?.stored_at;

        if let Some(ttl) = self.ttl {
            if stored_at.elapsed() >= ttl {
                inner.remove(key);
                return None;
            }
        }

        inner.entries.get(key).map(|entry| entry.text.clone())
    }

    /// Store a response, evicting the oldest entries beyond capacity
    pub async fn insert(&self, key: CacheKey, text: String) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock().await;
        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CachedResponse {
                text,
                stored_at: Instant::now(),
            },
        );

        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache = ResponseCache::new(8, None);
        let key = CacheKey::new("glm-5:cloud", "hi", 0.7);
        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), "hello".to_string()).await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("hello"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_insert_and_get() {
        let cache = std::sync::Arc::new(ResponseCache::new(64, None));

        let handles: Vec<_> = (0..32)
            .map(|n| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let key = CacheKey::new("m", &format!("prompt {}", n), 0.7);
                    cache.insert(key.clone(), format!("answer {}", n)).await;
                    cache.get(&key).await
                })
            })
            .collect();

        for (n, handle) in futures::future::join_all(handles).await.into_iter().enumerate() {
            assert_eq!(handle.unwrap(), Some(format!("answer {}", n)));
        }
        assert_eq!(cache.len().await, 32);
    }

    #[tokio::test]
    async fn test_key_components_matter() {
        let cache = ResponseCache::new(8, None);
        cache
            .insert(CacheKey::new("m", "hi", 0.7), "x".to_string())
            .await;
        assert!(cache.get(&CacheKey::new("other", "hi", 0.7)).await.is_none());
        assert!(cache.get(&CacheKey::new("m", "hi!", 0.7)).await.is_none());
        assert!(cache.get(&CacheKey::new("m", "hi", 0.2)).await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = ResponseCache::new(2, None);
        let a = CacheKey::new("m", "a", 0.7);
        let b = CacheKey::new("m", "b", 0.7);
        let c = CacheKey::new("m", "c", 0.7);

        cache.insert(a.clone(), "A".into()).await;
        cache.insert(b.clone(), "B".into()).await;
        cache.insert(c.clone(), "C".into()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&a).await.is_none());
        assert_eq!(cache.get(&b).await.as_deref(), Some("B"));
        assert_eq!(cache.get(&c).await.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn test_reinsert_refreshes_position() {
        let cache = ResponseCache::new(2, None);
        let a = CacheKey::new("m", "a", 0.7);
        let b = CacheKey::new("m", "b", 0.7);
        let c = CacheKey::new("m", "c", 0.7);

        cache.insert(a.clone(), "A".into()).await;
        cache.insert(b.clone(), "B".into()).await;
        cache.insert(a.clone(), "A2".into()).await;
        cache.insert(c.clone(), "C".into()).await;

        assert!(cache.get(&b).await.is_none());
        assert_eq!(cache.get(&a).await.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let cache = ResponseCache::new(8, Some(Duration::from_millis(20)));
        let key = CacheKey::new("m", "hi", 0.7);
        cache.insert(key.clone(), "old".into()).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_capacity_disables_cache() {
        let cache = ResponseCache::new(0, None);
        let key = CacheKey::new("m", "hi", 0.7);
        cache.insert(key.clone(), "x".into()).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[test]
    fn test_signed_zero_temperature() {
        assert_eq!(CacheKey::new("m", "p", 0.0), CacheKey::new("m", "p", -0.0));
    }
}
