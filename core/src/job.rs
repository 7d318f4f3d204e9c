//! One top-level load: graph walk, readiness wait, root activation.
//!
//! A job is composed per `import` call and shares the loader's cache and
//! resolver. It keeps no graph state of its own: readiness is derived from
//! the cache, which every concurrent job writes into, so a job that joins a
//! load mid-flight still observes modules discovered by another job's
//! creation path. Per-module readiness and deduplication belong to the
//! cache.
//!
//! The creation path (cache miss) is: fetch → parse → register record →
//! link. Linking resolves each declared specifier through the same job and
//! the same cache, which *registers* the dependency's future without
//! awaiting it — a cyclic dependency therefore finds the in-flight entry
//! (and the parse-time record) for its ancestor instead of recursing. The
//! job then walks link edges outward from the root, awaiting each reachable
//! entry, before touching instantiate or evaluate.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::try_join_all;

use lattice_engine::{LinkEdge, ModuleEngine, ModuleGraph};
use lattice_providers::{SourceError, SourceProvider};
use lattice_types::{ModuleKey, Namespace};

use crate::cache::{ModuleCache, ModuleFuture, ModuleRecord};
use crate::error::LoadError;
use crate::foreign::ForeignLoader;
use crate::loader::ActivatedModule;
use crate::resolver::{ModuleRequest, ResolveError, SpecifierResolver};

struct JobInner {
    cache: Arc<ModuleCache>,
    resolver: Arc<SpecifierResolver>,
    engine: Arc<dyn ModuleEngine>,
    provider: Arc<dyn SourceProvider>,
    foreign: Option<Arc<dyn ForeignLoader>>,
    fetch_timeout: Option<Duration>,
}

/// Orchestrates one top-level load request.
#[derive(Clone)]
pub(crate) struct ModuleJob {
    inner: Arc<JobInner>,
}

impl ModuleJob {
    pub(crate) fn new(
        cache: Arc<ModuleCache>,
        resolver: Arc<SpecifierResolver>,
        engine: Arc<dyn ModuleEngine>,
        provider: Arc<dyn SourceProvider>,
        foreign: Option<Arc<dyn ForeignLoader>>,
        fetch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(JobInner {
                cache,
                resolver,
                engine,
                provider,
                foreign,
                fetch_timeout,
            }),
        }
    }

    /// Load the graph reachable from `specifier`, then activate its root.
    pub(crate) async fn run(
        &self,
        referrer: &ModuleKey,
        specifier: &str,
    ) -> Result<ActivatedModule, LoadError> {
        let (root_key, root_entry) = self.request_module(referrer, specifier)?;
        let root = root_entry.await?;
        self.await_graph(&root_key).await?;

        tracing::debug!("graph ready, activating {root_key}");
        let graph: &dyn ModuleGraph = self.inner.cache.as_ref();
        root.handle()
            .instantiate(graph)
            .map_err(|source| LoadError::Link {
                key: root_key.clone(),
                source,
            })?;
        let namespace =
            root.handle()
                .evaluate(graph)
                .map_err(|source| LoadError::Evaluation {
                    key: root_key.clone(),
                    source,
                })?;
        Ok(ActivatedModule::new(root_key, namespace))
    }

    /// Resolve one specifier and obtain (or register) its cache entry.
    /// Synchronous: nothing is awaited here, which is what keeps cyclic
    /// linking from recursing.
    fn request_module(
        &self,
        referrer: &ModuleKey,
        specifier: &str,
    ) -> Result<(ModuleKey, ModuleFuture), LoadError> {
        let request = self.inner.resolver.resolve(referrer, specifier)?;
        let key = request.key().clone();
        let entry = self.inner.cache.get_or_create(&key, {
            let job = self.clone();
            move || async move { job.create_module(request).await }.boxed()
        });
        Ok((key, entry))
    }

    /// Creation path for a cache miss. Runs inside the registered entry.
    async fn create_module(&self, request: ModuleRequest) -> Result<Arc<ModuleRecord>, LoadError> {
        match request {
            ModuleRequest::Source { key } => self.create_source_module(key).await,
            ModuleRequest::Foreign { key, locator } => self.create_foreign_module(key, &locator),
        }
    }

    async fn create_source_module(&self, key: ModuleKey) -> Result<Arc<ModuleRecord>, LoadError> {
        let bytes = self.fetch(&key).await?;
        let handle = self
            .inner
            .engine
            .parse(&bytes, &key)
            .map_err(|source| LoadError::Parse {
                key: key.clone(),
                source,
            })?;
        let record = Arc::new(ModuleRecord::new(key, handle));
        // Visible to cyclic importers from here on.
        self.inner.cache.register_record(&record);
        self.link(&record)?;
        Ok(record)
    }

    /// Wrap a foreign system's value as a synthetic single-default-export
    /// module. `require` is synchronous by the adapter contract.
    fn create_foreign_module(
        &self,
        key: ModuleKey,
        locator: &str,
    ) -> Result<Arc<ModuleRecord>, LoadError> {
        let foreign =
            self.inner
                .foreign
                .as_ref()
                .ok_or_else(|| ResolveError::ForeignUnavailable {
                    specifier: key.to_string(),
                })?;
        tracing::debug!("requiring foreign module '{locator}'");
        let value = foreign
            .require(locator)
            .map_err(|source| LoadError::Foreign {
                key: key.clone(),
                source,
            })?;
        let handle = self
            .inner
            .engine
            .synthesize(&key, Namespace::single_default(value));
        let record = Arc::new(ModuleRecord::new(key, handle));
        self.inner.cache.register_record(&record);
        self.link(&record)?;
        Ok(record)
    }

    async fn fetch(&self, key: &ModuleKey) -> Result<Vec<u8>, LoadError> {
        let locator = key.as_url();
        let fetched = self.inner.provider.fetch(locator);
        let outcome = match self.inner.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, fetched).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SourceError::TimedOut {
                    locator: locator.to_string(),
                }),
            },
            None => fetched.await,
        };
        outcome.map_err(|source| LoadError::NotFound {
            key: key.clone(),
            source,
        })
    }

    /// Resolve each declared specifier through the cache (registering, not
    /// awaiting), record the outgoing keys on the record, and hand the
    /// resulting edges to the engine.
    fn link(&self, record: &Arc<ModuleRecord>) -> Result<(), LoadError> {
        let mut edges = Vec::new();
        for specifier in record.handle().requests() {
            let (dep_key, _entry) = self.request_module(record.key(), &specifier)?;
            edges.push(LinkEdge::new(specifier, dep_key));
        }
        record.set_edges(edges.iter().map(|edge| edge.key.clone()).collect());
        record
            .handle()
            .link(edges)
            .map_err(|source| LoadError::Link {
                key: record.key().clone(),
                source,
            })
    }

    /// Await every module transitively reachable from `root`, wave by wave.
    ///
    /// The walk reads the cache's shared state rather than anything
    /// job-local, so modules discovered by a *different* job's creation
    /// closure are still waited on. An entry resolves only after linking
    /// records its edges, which makes each wave's edge set complete by the
    /// time it is read, and the settled set keeps cycles finite.
    async fn await_graph(&self, root: &ModuleKey) -> Result<(), LoadError> {
        let mut settled: HashSet<ModuleKey> = HashSet::new();
        let mut frontier = vec![root.clone()];
        while !frontier.is_empty() {
            // Every frontier key was registered as an entry during its
            // referrer's link, before that referrer's entry could resolve.
            let wave: Vec<ModuleFuture> = frontier
                .drain(..)
                .filter(|key| settled.insert(key.clone()))
                .filter_map(|key| self.inner.cache.entry(&key))
                .collect();
            if wave.is_empty() {
                return Ok(());
            }
            tracing::debug!("awaiting {} module(s)", wave.len());
            for record in try_join_all(wave).await? {
                frontier.extend(
                    record
                        .edges()
                        .iter()
                        .filter(|key| !settled.contains(*key))
                        .cloned(),
                );
            }
        }
        Ok(())
    }
}
