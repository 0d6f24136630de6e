//! Bounded cache of per-word encodings.
//!
//! Encoding is deterministic, so the cache is a pure memoization layer: a
//! racing miss/insert pair for the same word writes equivalent values and
//! the last write wins. The lock is only held for the map operation itself,
//! never across the merge loop, and a poisoned lock degrades to a miss.
//!
//! Keys are the original word text (not its visible-char expansion — the
//! same expansion can arise from different pre-tokenizer splits), and only
//! short words are stored: long words are rare enough that caching them
//! would evict the high-frequency short ones.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use super::word::Token;

/// Longest word (in bytes) the cache will store.
pub const MAX_CACHE_KEY_LEN: usize = 15;

/// Default number of cached words.
pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// Thread-safe LRU map from word text to its encoded tokens.
///
/// Cached token offsets are relative to the word start; callers re-base them
/// into the surrounding text.
pub struct WordCache {
    entries: Mutex<LruCache<String, Vec<Token>>>,
}

impl std::fmt::Debug for WordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordCache").field("len", &self.len()).finish()
    }
}

impl WordCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached encoding for `word`, if present.
    pub fn get(&self, word: &str) -> Option<Vec<Token>> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.get(word).cloned()
        } else {
            None
        }
    }

    /// Store an encoding, evicting the least recently used entry when full.
    /// Words longer than [`MAX_CACHE_KEY_LEN`] are not stored.
    pub fn put(&self, word: &str, tokens: &[Token]) {
        if word.len() > MAX_CACHE_KEY_LEN {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(word.to_string(), tokens.to_vec());
        }
    }

    /// Number of cached words.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
