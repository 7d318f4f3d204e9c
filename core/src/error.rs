//! The loader's error taxonomy.

use thiserror::Error;

use lattice_engine::EngineError;
use lattice_providers::SourceError;
use lattice_types::{KeyError, ModuleKey};

use crate::foreign::ForeignError;
use crate::resolver::ResolveError;

/// Terminal failure of a module load.
///
/// Clonable because a failure is shared: the cache fans one failed load out
/// to every job awaiting that module, and the entry stays failed for the
/// loader's lifetime.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The specifier could not be mapped to a canonical key.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Source acquisition failed (missing, unreadable, or timed out).
    #[error("module source unavailable for {key}: {source}")]
    NotFound {
        key: ModuleKey,
        #[source]
        source: SourceError,
    },

    /// The engine rejected the module source.
    #[error("failed to parse {key}: {source}")]
    Parse {
        key: ModuleKey,
        #[source]
        source: EngineError,
    },

    /// A declared dependency could not be satisfied.
    #[error("failed to link {key}: {source}")]
    Link {
        key: ModuleKey,
        #[source]
        source: EngineError,
    },

    /// The module body failed while running. Opaque to the loader.
    #[error("evaluation of {key} failed: {source}")]
    Evaluation {
        key: ModuleKey,
        #[source]
        source: EngineError,
    },

    /// The foreign-module adapter failed to produce a value.
    #[error("foreign module load failed for {key}: {source}")]
    Foreign {
        key: ModuleKey,
        #[source]
        source: ForeignError,
    },

    /// A base or derived identity was malformed.
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl LoadError {
    /// Key of the module the failure originated at, where one exists.
    #[must_use]
    pub fn key(&self) -> Option<&ModuleKey> {
        match self {
            Self::NotFound { key, .. }
            | Self::Parse { key, .. }
            | Self::Link { key, .. }
            | Self::Evaluation { key, .. }
            | Self::Foreign { key, .. } => Some(key),
            Self::Resolve(_) | Self::Key(_) => None,
        }
    }
}
