//! Shared foundation types for the Lattice module loader.
//!
//! Two concerns live here:
//!
//! - [`ModuleKey`] — the canonical identity of a module. Equality of keys is
//!   the *sole* criterion for "same module"; everything downstream (caching,
//!   single-flight deduplication, cycle detection) hangs off it.
//! - [`Value`] and [`Namespace`] — the observable projection of an activated
//!   module: what a caller of `import` actually gets back.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use url::Url;

mod value;

pub use value::{Namespace, Value};

/// Failure to derive a canonical module key.
#[derive(Debug, Clone, Error)]
pub enum KeyError {
    #[error("invalid module key '{input}': {reason}")]
    Parse { input: String, reason: String },
    #[error("cannot derive a directory base key from '{path}'")]
    NotADirectory { path: String },
    #[error("cannot resolve '{specifier}' against '{base}'")]
    Join { base: String, specifier: String },
    #[error("cannot determine a default base identity: {reason}")]
    NoBase { reason: String },
}

/// Canonical, comparable identity of a module.
///
/// A thin newtype over a normalized [`Url`]. Keys are derived
/// deterministically from (referrer key, specifier string): the same pair
/// always yields the same key, and URL normalization collapses spelling
/// variants (`a/./b`, `a/x/../b`) onto one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(Url);

impl ModuleKey {
    /// Parse an absolute URL into a key.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let url = Url::parse(input).map_err(|e| KeyError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(url))
    }

    /// Key for a filesystem directory, with the trailing slash that makes it
    /// usable as a base for relative resolution.
    pub fn from_directory(path: &Path) -> Result<Self, KeyError> {
        Url::from_directory_path(path)
            .map(Self)
            .map_err(|()| KeyError::NotADirectory {
                path: path.display().to_string(),
            })
    }

    /// Key for a single file on the filesystem.
    pub fn from_file_path(path: &Path) -> Result<Self, KeyError> {
        Url::from_file_path(path).map(Self).map_err(|()| KeyError::Parse {
            input: path.display().to_string(),
            reason: "not an absolute file path".to_string(),
        })
    }

    /// Resolve a specifier relative to this key.
    ///
    /// This is the canonical-key derivation: deterministic, normalizing, and
    /// free of I/O. Relative resolution never changes the scheme.
    pub fn join(&self, specifier: &str) -> Result<Self, KeyError> {
        self.0.join(specifier).map(Self).map_err(|_| KeyError::Join {
            base: self.0.to_string(),
            specifier: specifier.to_string(),
        })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Url> for ModuleKey {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
