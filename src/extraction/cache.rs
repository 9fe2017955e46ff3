/*!
 * Per-page extraction cache.
 *
 * Keyed by document checksum plus page index, so re-running a batch or
 * pointing the tool at a renamed copy of the same file skips extraction and
 * OCR entirely. Log lines carry only the key, never extracted text.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::ExtractedText;

// Cache key: document identity plus page position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    checksum: String,
    page_index: usize,
}

/// Thread-safe cache of extraction results
pub struct ExtractionCache {
    cache: Arc<RwLock<HashMap<CacheKey, ExtractedText>>>,
    hits: Arc<RwLock<usize>>,
    misses: Arc<RwLock<usize>>,
    enabled: bool,
}

impl ExtractionCache {
    /// Create an enabled cache
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Create a cache with an explicit enabled flag
    pub fn with_enabled(enabled: bool) -> Self {
        ExtractionCache {
            cache: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
            enabled,
        }
    }

    /// Look up a cached result
    pub fn get(&self, checksum: &str, page_index: usize) -> Option<ExtractedText> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey {
            checksum: checksum.to_string(),
            page_index,
        };

        let cache = self.cache.read();
        match cache.get(&key) {
            Some(extracted) => {
                let mut hits = self.hits.write();
                *hits += 1;

                debug!("Cache hit for page {} of {}", page_index, &checksum[..8]);
                Some(extracted.clone())
            }
            None => {
                let mut misses = self.misses.write();
                *misses += 1;
                None
            }
        }
    }

    /// Store a result
    pub fn store(&self, checksum: &str, page_index: usize, extracted: &ExtractedText) {
        if !self.enabled {
            return;
        }

        let key = CacheKey {
            checksum: checksum.to_string(),
            page_index,
        };
        let mut cache = self.cache.write();
        cache.insert(key, extracted.clone());
    }

    /// Hit and miss counts plus the hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }

    /// Drop all cached entries and reset the counters
    pub fn clear(&self) {
        self.cache.write().clear();
        *self.hits.write() = 0;
        *self.misses.write() = 0;
    }

    /// Number of cached pages
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether lookups and stores are active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ExtractionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ExtractionCache {
    fn clone(&self) -> Self {
        ExtractionCache {
            cache: Arc::clone(&self.cache),
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
            enabled: self.enabled,
        }
    }
}
