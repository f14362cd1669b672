//! In-memory cache of filled outputs, used to chain fills

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// A filled PDF kept for later reuse as a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPdf {
    pub data: Vec<u8>,
    /// File name the output was served under
    pub file_name: String,
}

impl CachedPdf {
    fn size(&self) -> usize {
        self.data.len()
    }
}

struct CacheInner {
    lru: LruCache<String, CachedPdf>,
    total_bytes: usize,
}

/// Output cache bounded by entry count and total bytes
pub struct OutputCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
}

impl OutputCache {
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Store an output under a fresh key and return the key.
    ///
    /// Returns `None` when the output alone exceeds the byte budget; nothing
    /// is evicted in that case.
    pub fn insert(&self, entry: CachedPdf) -> Option<String> {
        let size = entry.size();
        if size > self.max_bytes {
            tracing::debug!(size, max_bytes = self.max_bytes, "Output too large to cache");
            return None;
        }

        let mut inner = self.inner.lock();

        let key = loop {
            let candidate = uuid::Uuid::new_v4().to_string();
            if !inner.lru.contains(&candidate) {
                break candidate;
            }
        };

        while inner.total_bytes + size > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((evicted, old)) => {
                    tracing::debug!(key = %evicted, "Evicted cached output");
                    inner.total_bytes = inner.total_bytes.saturating_sub(old.size());
                }
                None => break,
            }
        }

        if let Some((_, old)) = inner.lru.push(key.clone(), entry) {
            // push returns the entry displaced by the capacity limit
            inner.total_bytes = inner.total_bytes.saturating_sub(old.size());
        }
        inner.total_bytes += size;

        Some(key)
    }

    pub fn get(&self, key: &str) -> Option<CachedPdf> {
        self.inner.lock().lru.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}
