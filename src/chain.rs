//! Bounded memo of delta-chain depths
//!
//! Records, per content hash, how many delta hops separate it from the
//! nearest full blob. Best-effort and process-local: a cold cache just
//! recomputes depths lazily, and staleness only influences the write-time
//! blob-vs-delta decision, never read correctness.

use crate::hash::ContentHash;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// LRU memo from hash to chain depth.
pub struct ChainLengthCache {
    cache: Mutex<LruCache<ContentHash, u32>>,
}

impl ChainLengthCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Memoized depth for `hash`, if present.
    pub fn get(&self, hash: &ContentHash) -> Option<u32> {
        self.cache.lock().get(hash).copied()
    }

    /// Record the depth for `hash`, evicting the least recently used entry
    /// on overflow.
    pub fn put(&self, hash: ContentHash, depth: u32) {
        self.cache.lock().put(hash, depth);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u32) -> ContentHash {
        ContentHash::digest(&format!("entry-{}", n))
    }

    #[test]
    fn test_put_get() {
        let cache = ChainLengthCache::new(16);
        cache.put(hash(1), 3);
        assert_eq!(cache.get(&hash(1)), Some(3));
        assert_eq!(cache.get(&hash(2)), None);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = ChainLengthCache::new(2);
        cache.put(hash(1), 1);
        cache.put(hash(2), 2);
        cache.put(hash(3), 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&hash(1)), None);
        assert_eq!(cache.get(&hash(3)), Some(3));
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ChainLengthCache::new(2);
        cache.put(hash(1), 1);
        cache.put(hash(2), 2);
        cache.get(&hash(1));
        cache.put(hash(3), 3);
        assert_eq!(cache.get(&hash(1)), Some(1));
        assert_eq!(cache.get(&hash(2)), None);
    }
}
