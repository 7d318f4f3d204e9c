//! Foreign-module adapter seam.
//!
//! A "foreign" module belongs to a legacy, synchronous module system that
//! knows nothing about this loader. The adapter contract is two calls: map a
//! request string to the foreign system's canonical locator, and produce the
//! module's value for a locator. The core wraps the value as a synthetic
//! single-`default`-export module and links it like any other dependency;
//! the cache guarantees `require` runs at most once per locator per loader
//! lifetime.
//!
//! The adapter is injected at [`Loader`](crate::Loader) construction, and
//! foreign callers that want to import *through* this loader supply their
//! own referrer identity to [`Loader::import_from`](crate::Loader) — there
//! is no retroactive mutation of the foreign system's module objects.

use thiserror::Error;

use lattice_types::{ModuleKey, Value};

/// Failure inside the foreign module system.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForeignError {
    #[error("foreign module '{request}' not found")]
    NotFound { request: String },
    #[error("foreign load of '{locator}' failed: {reason}")]
    Failed { locator: String, reason: String },
}

/// A legacy synchronous module system the loader can import from.
///
/// Both methods are synchronous by contract: the foreign system predates
/// the async loader and resolves/loads inline.
pub trait ForeignLoader: Send + Sync {
    /// Map a request string (the body of a `legacy:` specifier) and the
    /// referrer's identity to the foreign system's canonical locator.
    ///
    /// Locator equality defines foreign-module identity: two spellings that
    /// resolve to the same locator share one cache entry.
    fn resolve_locator(&self, request: &str, referrer: &ModuleKey)
    -> Result<String, ForeignError>;

    /// Load the module behind a locator and return its exported value.
    fn require(&self, locator: &str) -> Result<Value, ForeignError>;
}
