//! The module cache: one load attempt per canonical key, ever.
//!
//! Two tables, both keyed by [`ModuleKey`] and both write-once:
//!
//! - **entries** — the single-flight table. An entry is a
//!   [`Shared`] future resolving to the loaded record (or the terminal
//!   failure). Entries are registered *before* they can be polled — futures
//!   are lazy, and registration happens inside [`ModuleCache::get_or_create`]
//!   before the caller ever awaits — so a re-entrant request for a key whose
//!   creation is still in flight observes the registered entry instead of
//!   recursing into creation. That ordering is the whole cycle-safety story.
//! - **records** — the link-graph table, populated at parse time (before the
//!   module's dependencies resolve). Each record carries its outgoing link
//!   edges once linking completes; graph-readiness walks and activation-time
//!   edge lookups both read this table, and it is what a cyclic importer's
//!   edges point at.
//!
//! Locks guard map access only and are never held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use lattice_engine::{ModuleGraph, ModuleHandle};
use lattice_types::ModuleKey;

use crate::error::LoadError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A cache entry: the eventual outcome of one module's load, shareable
/// across every job and import call that reaches the key.
pub type ModuleFuture = Shared<BoxFuture<'static, Result<Arc<ModuleRecord>, LoadError>>>;

/// A loaded module: canonical key plus the engine's opaque handle.
///
/// Owned by the cache entry that created it; jobs only observe it. At most
/// one record exists per key per cache lifetime.
pub struct ModuleRecord {
    key: ModuleKey,
    handle: Arc<dyn ModuleHandle>,
    edges: OnceLock<Vec<ModuleKey>>,
}

impl ModuleRecord {
    #[must_use]
    pub fn new(key: ModuleKey, handle: Arc<dyn ModuleHandle>) -> Self {
        Self {
            key,
            handle,
            edges: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn handle(&self) -> &Arc<dyn ModuleHandle> {
        &self.handle
    }

    /// Record the keys this module links to. Write-once; a second write is
    /// ignored.
    pub fn set_edges(&self, edges: Vec<ModuleKey>) {
        let _ = self.edges.set(edges);
    }

    /// Canonical keys of the module's direct dependencies. Empty until
    /// linking completes.
    #[must_use]
    pub fn edges(&self) -> &[ModuleKey] {
        self.edges.get().map_or(&[], Vec::as_slice)
    }
}

impl std::fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRecord").field("key", &self.key).finish_non_exhaustive()
    }
}

/// Process-scoped (per-loader) single-flight map from canonical key to load
/// outcome. Shared by every job a loader composes.
#[derive(Default)]
pub struct ModuleCache {
    entries: Mutex<HashMap<ModuleKey, ModuleFuture>>,
    records: Mutex<HashMap<ModuleKey, Arc<ModuleRecord>>>,
}

impl ModuleCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `key`, creating (and registering) it first if
    /// absent. First writer wins; `create` is invoked at most once per key
    /// for the cache's lifetime, and a failed entry stays failed.
    pub fn get_or_create<F>(&self, key: &ModuleKey, create: F) -> ModuleFuture
    where
        F: FnOnce() -> BoxFuture<'static, Result<Arc<ModuleRecord>, LoadError>>,
    {
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get(key) {
            tracing::debug!("cache hit for {key}");
            return entry.clone();
        }
        tracing::debug!("cache miss for {key}, registering load");
        let entry = create().shared();
        entries.insert(key.clone(), entry.clone());
        entry
    }

    /// Register a parsed record. Called by the creation path before the
    /// module's dependencies are resolved, so cyclic link edges can already
    /// see it. First writer wins.
    pub fn register_record(&self, record: &Arc<ModuleRecord>) {
        lock(&self.records)
            .entry(record.key().clone())
            .or_insert_with(|| Arc::clone(record));
    }

    /// Record lookup for activation-time link-edge walks.
    #[must_use]
    pub fn record(&self, key: &ModuleKey) -> Option<Arc<ModuleRecord>> {
        lock(&self.records).get(key).cloned()
    }

    /// The already-registered entry for `key`, if any load has begun.
    #[must_use]
    pub fn entry(&self, key: &ModuleKey) -> Option<ModuleFuture> {
        lock(&self.entries).get(key).cloned()
    }
}

impl ModuleGraph for ModuleCache {
    fn handle(&self, key: &ModuleKey) -> Option<Arc<dyn ModuleHandle>> {
        self.record(key).map(|record| Arc::clone(record.handle()))
    }
}
