//! Source acquisition boundary for the Lattice loader.
//!
//! The loader core never touches a filesystem or any other medium directly;
//! it asks a [`SourceProvider`] for the bytes behind a locator. Providers are
//! dyn-dispatched, so the fetch method returns a boxed future
//! ([`SourceFuture`]) rather than using `async fn`.
//!
//! Two implementations ship with the workspace:
//!
//! - [`FsProvider`] — reads `file:` locators from the local filesystem.
//! - [`MemoryProvider`] — serves a preloaded map, for tests and embedding.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use url::Url;

mod fs;
mod memory;

pub use fs::FsProvider;
pub use memory::MemoryProvider;

/// Boxed future returned by [`SourceProvider::fetch`].
pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, SourceError>> + Send + 'a>>;

/// Failure to acquire module source.
///
/// Clonable by design: a single acquisition failure is fanned out to every
/// request waiting on the same module, so the error must be shareable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source not found: {locator}")]
    NotFound { locator: String },
    #[error("unsupported locator {locator}: {reason}")]
    Unsupported { locator: String, reason: String },
    #[error("failed to read {locator}: {reason}")]
    Io { locator: String, reason: String },
    #[error("timed out fetching {locator}")]
    TimedOut { locator: String },
}

impl SourceError {
    #[must_use]
    pub fn locator(&self) -> &str {
        match self {
            Self::NotFound { locator }
            | Self::Unsupported { locator, .. }
            | Self::Io { locator, .. }
            | Self::TimedOut { locator } => locator,
        }
    }
}

/// A medium that can produce module source bytes for a locator.
pub trait SourceProvider: Send + Sync {
    fn fetch(&self, locator: &Url) -> SourceFuture<'_>;
}
