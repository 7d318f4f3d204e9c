//! The loader façade.

use std::sync::Arc;
use std::time::Duration;

use lattice_engine::ModuleEngine;
use lattice_providers::SourceProvider;
use lattice_types::{KeyError, ModuleKey, Namespace};

use crate::cache::ModuleCache;
use crate::error::LoadError;
use crate::foreign::ForeignLoader;
use crate::job::ModuleJob;
use crate::resolver::SpecifierResolver;

/// What a successful `import` resolves to: the root module's canonical key
/// and its namespace projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivatedModule {
    key: ModuleKey,
    namespace: Namespace,
}

impl ActivatedModule {
    pub(crate) fn new(key: ModuleKey, namespace: Namespace) -> Self {
        Self { key, namespace }
    }

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[must_use]
    pub fn into_namespace(self) -> Namespace {
        self.namespace
    }
}

/// Owns one module cache and a specifier resolver; composes a fresh module
/// job per import call over them.
///
/// Two imports of the same canonical key through one loader share one load:
/// the second call finds the first call's cache entry. Loaders are
/// independent — a new loader is a new cache lifetime and a fresh
/// resolution attempt for previously failed keys.
pub struct Loader {
    cache: Arc<ModuleCache>,
    resolver: Arc<SpecifierResolver>,
    engine: Arc<dyn ModuleEngine>,
    provider: Arc<dyn SourceProvider>,
    foreign: Option<Arc<dyn ForeignLoader>>,
    base: ModuleKey,
    fetch_timeout: Option<Duration>,
}

impl Loader {
    /// Start building a loader over the two required collaborators.
    pub fn builder(
        engine: Arc<dyn ModuleEngine>,
        provider: Arc<dyn SourceProvider>,
    ) -> LoaderBuilder {
        LoaderBuilder {
            engine,
            provider,
            foreign: None,
            base: None,
            fetch_timeout: None,
        }
    }

    /// The base identity relative specifiers resolve against when no
    /// explicit referrer is supplied.
    #[must_use]
    pub fn base(&self) -> &ModuleKey {
        &self.base
    }

    /// Load, link, and activate the graph rooted at `specifier`, resolved
    /// against the loader's base identity.
    pub async fn import(&self, specifier: &str) -> Result<ActivatedModule, LoadError> {
        let base = self.base.clone();
        self.import_from(specifier, &base).await
    }

    /// Like [`Loader::import`] with an explicit referrer identity — the
    /// adapter point for foreign callers importing through this loader.
    pub async fn import_from(
        &self,
        specifier: &str,
        referrer: &ModuleKey,
    ) -> Result<ActivatedModule, LoadError> {
        tracing::debug!("import '{specifier}' (referrer {referrer})");
        let job = ModuleJob::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.resolver),
            Arc::clone(&self.engine),
            Arc::clone(&self.provider),
            self.foreign.clone(),
            self.fetch_timeout,
        );
        job.run(referrer, specifier).await
    }
}

/// Assembles a [`Loader`]; construction is initialization, there is no
/// second phase.
pub struct LoaderBuilder {
    engine: Arc<dyn ModuleEngine>,
    provider: Arc<dyn SourceProvider>,
    foreign: Option<Arc<dyn ForeignLoader>>,
    base: Option<ModuleKey>,
    fetch_timeout: Option<Duration>,
}

impl LoaderBuilder {
    /// Base identity for relative resolution. Defaults to the process
    /// working directory as a directory URL.
    #[must_use]
    pub fn base(mut self, base: ModuleKey) -> Self {
        self.base = Some(base);
        self
    }

    /// Foreign-module adapter for `legacy:` specifiers.
    #[must_use]
    pub fn foreign(mut self, foreign: Arc<dyn ForeignLoader>) -> Self {
        self.foreign = Some(foreign);
        self
    }

    /// Bound each source fetch; an expired fetch fails its module like any
    /// other acquisition error. Unset means wait indefinitely.
    #[must_use]
    pub fn fetch_timeout(mut self, limit: Duration) -> Self {
        self.fetch_timeout = Some(limit);
        self
    }

    pub fn build(self) -> Result<Loader, LoadError> {
        let base = match self.base {
            Some(base) => base,
            None => {
                let cwd = std::env::current_dir().map_err(|e| KeyError::NoBase {
                    reason: e.to_string(),
                })?;
                ModuleKey::from_directory(&cwd)?
            }
        };
        let resolver = Arc::new(SpecifierResolver::new(self.foreign.clone()));
        Ok(Loader {
            cache: Arc::new(ModuleCache::new()),
            resolver,
            engine: self.engine,
            provider: self.provider,
            foreign: self.foreign,
            base,
            fetch_timeout: self.fetch_timeout,
        })
    }
}
