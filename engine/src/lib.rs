//! The module-engine seam of the Lattice loader.
//!
//! The loader core treats module semantics as opaque: it hands source bytes
//! to a [`ModuleEngine`], gets back a [`ModuleHandle`], and only ever asks
//! the handle four things — which dependency specifiers it declares
//! ([`ModuleHandle::requests`]), to record the resolved link edges
//! ([`ModuleHandle::link`]), and to activate ([`ModuleHandle::instantiate`],
//! [`ModuleHandle::evaluate`]) once the whole graph is linked.
//!
//! Activation takes a [`ModuleGraph`] capability: a key → handle lookup the
//! engine uses to walk link edges and order dependency activation itself.
//! The loader guarantees every reachable module is linked before it calls
//! `instantiate` on a root; the engine guarantees dependencies evaluate
//! before dependents and that re-entrant (cyclic) evaluation terminates.
//!
//! Synthetic modules ([`ModuleEngine::synthesize`]) lift a plain name→value
//! mapping into a linkable module — the hook the foreign-module adapter uses
//! to expose a legacy loader's value as a single `default` export.

use std::sync::Arc;

use thiserror::Error;

use lattice_types::{ModuleKey, Namespace};

mod synthetic;
mod text;

pub use synthetic::SyntheticModule;
pub use text::TextEngine;

/// Failure inside a module engine.
///
/// Clonable: a module's failure is observed by every job that reaches it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{key}:{line}: {reason}")]
    Parse {
        key: ModuleKey,
        line: usize,
        reason: String,
    },
    #[error("module {key} is not valid UTF-8: {reason}")]
    InvalidSource { key: ModuleKey, reason: String },
    #[error("module {key} has not been linked")]
    NotLinked { key: ModuleKey },
    #[error("module {key} was linked twice")]
    AlreadyLinked { key: ModuleKey },
    #[error("module {key} declares '{specifier}' but no link edge resolves it")]
    UnlinkedSpecifier { key: ModuleKey, specifier: String },
    #[error("no module record for {key} in the link graph")]
    MissingDependency { key: ModuleKey },
    #[error("module {key} evaluated before instantiation")]
    NotInstantiated { key: ModuleKey },
    #[error("'{from}' does not export '{name}'")]
    UnresolvedImport { name: String, from: String },
    #[error("undefined name '{name}'")]
    UndefinedName { name: String },
    #[error("'{name}' is not callable")]
    NotCallable { name: String },
}

/// Key → handle lookup over the already-loaded portion of the module graph.
///
/// Implemented by the loader's cache; handed to the engine at activation so
/// it can walk link edges without owning any loader state.
pub trait ModuleGraph: Send + Sync {
    fn handle(&self, key: &ModuleKey) -> Option<Arc<dyn ModuleHandle>>;
}

/// One resolved dependency edge: declared specifier → canonical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEdge {
    pub specifier: String,
    pub key: ModuleKey,
}

impl LinkEdge {
    #[must_use]
    pub fn new(specifier: impl Into<String>, key: ModuleKey) -> Self {
        Self {
            specifier: specifier.into(),
            key,
        }
    }
}

/// An opaque, linkable, activatable module produced by a [`ModuleEngine`].
///
/// Handles are shared (`Arc`) and internally synchronized; `instantiate` and
/// `evaluate` are idempotent — a second call observes the completed state
/// rather than re-running the module body.
pub trait ModuleHandle: Send + Sync + std::fmt::Debug {
    /// The canonical key the module was parsed or synthesized under.
    fn key(&self) -> &ModuleKey;

    /// Dependency specifiers declared by the module source, in declaration
    /// order. May contain duplicates.
    fn requests(&self) -> Vec<String>;

    /// Record the resolved link edges. Called exactly once per handle, after
    /// every declared specifier has been resolved to a canonical key.
    fn link(&self, edges: Vec<LinkEdge>) -> Result<(), EngineError>;

    /// Validate the link graph reachable from this module. Safe to call on
    /// cyclic graphs; re-entrant instantiation of an in-progress module is a
    /// no-op.
    fn instantiate(&self, graph: &dyn ModuleGraph) -> Result<(), EngineError>;

    /// Run the module body (dependencies first) and return the namespace
    /// projection. Each module's body runs at most once; cyclic re-entry
    /// observes the in-progress namespace.
    fn evaluate(&self, graph: &dyn ModuleGraph) -> Result<Namespace, EngineError>;
}

/// Produces module handles from source text or from a plain value mapping.
pub trait ModuleEngine: Send + Sync {
    fn parse(&self, source: &[u8], key: &ModuleKey) -> Result<Arc<dyn ModuleHandle>, EngineError>;

    /// First-class synthetic module: a fixed set of exports, no dependencies,
    /// no source text.
    fn synthesize(&self, key: &ModuleKey, exports: Namespace) -> Arc<dyn ModuleHandle>;
}
