//! Module-graph resolution and loading coordination.
//!
//! # Architecture
//!
//! A [`Loader`] owns one [`ModuleCache`] and a [`SpecifierResolver`]. Every
//! `import` call composes a fresh module job over those shared pieces:
//!
//! - The **resolver** maps (referrer key, specifier) to a canonical
//!   [`ModuleRequest`] — pure classification, no I/O.
//! - The **cache** gives each canonical key exactly one load attempt
//!   (single-flight): concurrent and re-entrant requests for the same key
//!   observe the same in-flight or completed shared future, which is what
//!   makes cyclic graphs terminate instead of recursing.
//! - The **job** walks the dependency graph reachable from the root,
//!   registering every discovered module's future in its dependency set,
//!   then fixed-point-waits for the whole graph before activating the root
//!   (instantiate, then evaluate) through the module engine.
//!
//! Source acquisition, module semantics, and foreign-module interop are
//! collaborator contracts: [`lattice_providers::SourceProvider`],
//! [`lattice_engine::ModuleEngine`], and [`ForeignLoader`].
//!
//! # Failure model
//!
//! Any resolution, acquisition, parse, or link failure fails that module's
//! cache entry; every job that reaches the failed module rejects without
//! activating anything. Failure entries are terminal for the owning
//! loader's lifetime — a fresh `Loader` is a fresh resolution attempt.

mod cache;
mod error;
mod foreign;
mod job;
mod loader;
mod resolver;

pub use cache::{ModuleCache, ModuleFuture, ModuleRecord};
pub use error::LoadError;
pub use foreign::{ForeignError, ForeignLoader};
pub use loader::{ActivatedModule, Loader, LoaderBuilder};
pub use resolver::{FOREIGN_SCHEME, ModuleRequest, ResolveError, SpecifierResolver};

pub use lattice_engine;
pub use lattice_providers;
pub use lattice_types;
