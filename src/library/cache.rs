//! LibraryCache - explicit, owner-scoped library lookup cache
//!
//! The cache belongs to whoever constructs it (normally one engine). It is
//! never process-global. Entries stay until `invalidate` or `clear` is
//! called, so administrative changes must be followed by an invalidation.
//!
//! Every `invalidate`/`clear` bumps a generation counter. A miss only stores
//! what it read if no invalidation ran while it was reading, so a lookup
//! racing an invalidation can never re-insert the value that was dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockWriteGuard};

use super::{Library, LibraryGate};
use crate::errors::LifecycleResult;

/// Hit/miss counters of a [`LibraryCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Caching wrapper around any [`LibraryGate`].
pub struct LibraryCache<G> {
    inner: G,
    entries: RwLock<HashMap<String, Library>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<G: LibraryGate> LibraryCache<G> {
    /// Wraps `inner` with an empty cache.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The wrapped gate.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Drops the cached entry for one library.
    pub fn invalidate(&self, name: &str) {
        let mut entries = self.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.remove(name);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        let mut entries = self.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    /// Number of cached libraries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Library>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<G: LibraryGate> LibraryGate for LibraryCache<G> {
    fn exists(&self, name: &str) -> bool {
        self.find_by_name(name).is_ok()
    }

    fn find_by_name(&self, name: &str) -> LifecycleResult<Library> {
        if let Some(library) = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(library.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::Acquire);
        // Misses are not cached: a library provisioned later must become visible.
        let library = self.inner.find_by_name(name)?;

        let mut entries = self.write();
        if self.generation.load(Ordering::Acquire) == generation {
            entries.insert(name.to_string(), library.clone());
        }
        Ok(library)
    }
}
