//! Synthetic modules: a fixed namespace lifted into a linkable handle.

use lattice_types::{ModuleKey, Namespace};

use crate::{EngineError, LinkEdge, ModuleGraph, ModuleHandle};

/// A module with no source, no dependencies, and a fixed set of exports.
///
/// This is the first-class replacement for generating wrapper source text:
/// the foreign-module adapter turns a legacy loader's value into
/// `SyntheticModule` with a single `default` export and links it like any
/// other dependency.
#[derive(Debug, Clone)]
pub struct SyntheticModule {
    key: ModuleKey,
    exports: Namespace,
}

impl SyntheticModule {
    #[must_use]
    pub fn new(key: ModuleKey, exports: Namespace) -> Self {
        Self { key, exports }
    }
}

impl ModuleHandle for SyntheticModule {
    fn key(&self) -> &ModuleKey {
        &self.key
    }

    fn requests(&self) -> Vec<String> {
        Vec::new()
    }

    fn link(&self, edges: Vec<LinkEdge>) -> Result<(), EngineError> {
        // Nothing to record; a synthetic module declares no dependencies.
        debug_assert!(edges.is_empty());
        Ok(())
    }

    fn instantiate(&self, _graph: &dyn ModuleGraph) -> Result<(), EngineError> {
        Ok(())
    }

    fn evaluate(&self, _graph: &dyn ModuleGraph) -> Result<Namespace, EngineError> {
        Ok(self.exports.clone())
    }
}
