//! Content-addressed module cache.
//!
//! Keeps every distinct raw observation (keyed by its [`ContentFingerprint`])
//! together with its normalized form, up to a fixed capacity. When full, the
//! least recently observed entry is evicted. Re-observing an identical record
//! refreshes its recency instead of adding a second slot.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{Module, RawModule};

/// Deterministic hash of a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// SHA-256 of the record's JSON encoding, hex encoded.
    pub fn of(raw: &RawModule) -> Result<Self> {
        let bytes = serde_json::to_vec(raw)?;
        Ok(Self(hex::encode(Sha256::digest(&bytes))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    raw: RawModule,
    module: Module,
}

/// Bounded LRU map from fingerprint to observation.
#[derive(Debug)]
pub struct ContentCache {
    entries: LruCache<ContentFingerprint, Entry>,
}

/// What an insert did to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New fingerprint stored
    Added,
    /// Fingerprint already present; recency refreshed
    Touched,
    /// New fingerprint stored after dropping the oldest
    Evicted(ContentFingerprint),
}

impl ContentCache {
    /// Create an empty cache. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, fingerprint: &ContentFingerprint) -> bool {
        self.entries.contains(fingerprint)
    }

    /// Raw record stored under a fingerprint, without touching its recency.
    pub fn get(&self, fingerprint: &ContentFingerprint) -> Option<&RawModule> {
        self.entries.peek(fingerprint).map(|e| &e.raw)
    }

    /// Insert or refresh an observation.
    pub fn insert(
        &mut self,
        fingerprint: ContentFingerprint,
        raw: RawModule,
        module: Module,
    ) -> InsertOutcome {
        let entry = Entry { raw, module };
        if self.entries.contains(&fingerprint) {
            self.entries.put(fingerprint, entry);
            return InsertOutcome::Touched;
        }

        match self.entries.push(fingerprint, entry) {
            Some((evicted, _)) => InsertOutcome::Evicted(evicted),
            None => InsertOutcome::Added,
        }
    }

    /// Modules in recency order, least recently observed first.
    pub fn modules(&self) -> Vec<Module> {
        self.entries
            .iter()
            .rev()
            .map(|(_, e)| e.module.clone())
            .collect()
    }
}
