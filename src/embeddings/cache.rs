use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Thread-safe LRU cache for question embeddings
///
/// Users tend to re-ask the same questions; caching the embedding saves an
/// API round trip per repeat. Bounded by LRU eviction.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` embeddings (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.cache.lock().unwrap().get(text).cloned()
    }

    pub fn put(&self, text: String, embedding: Vec<f32>) {
        self.cache.lock().unwrap().put(text, embedding);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }
}
