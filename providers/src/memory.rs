//! In-memory source provider.

use std::collections::HashMap;
use std::sync::Mutex;

use url::Url;

use crate::{SourceError, SourceFuture, SourceProvider};

/// Serves module source from a preloaded map.
///
/// Besides embedding, this is the workhorse of the loader test suites: it
/// counts fetches per locator, which is how "the provider is invoked at most
/// once per key" is asserted.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    sources: HashMap<Url, Vec<u8>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(mut self, locator: Url, source: impl Into<Vec<u8>>) -> Self {
        self.sources.insert(locator, source.into());
        self
    }

    pub fn insert(&mut self, locator: Url, source: impl Into<Vec<u8>>) {
        self.sources.insert(locator, source.into());
    }

    /// How many times `fetch` has been called for `locator`.
    #[must_use]
    pub fn fetch_count(&self, locator: &Url) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(locator.as_str())
            .copied()
            .unwrap_or(0)
    }

    fn record_fetch(&self, locator: &Url) {
        let mut fetches = self
            .fetches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *fetches.entry(locator.as_str().to_string()).or_insert(0) += 1;
    }
}

impl SourceProvider for MemoryProvider {
    fn fetch(&self, locator: &Url) -> SourceFuture<'_> {
        self.record_fetch(locator);
        let result = self.sources.get(locator).cloned().ok_or_else(|| {
            SourceError::NotFound {
                locator: locator.to_string(),
            }
        });
        Box::pin(async move { result })
    }
}
