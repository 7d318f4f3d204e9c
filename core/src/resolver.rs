//! Specifier resolution: (referrer key, specifier) → canonical module request.
//!
//! Pure classification. The resolver performs no I/O of its own; foreign
//! specifiers delegate locator resolution to the configured
//! [`ForeignLoader`], whose contract owns that step.

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use lattice_types::ModuleKey;

use crate::foreign::{ForeignError, ForeignLoader};

/// Scheme marking a specifier as belonging to the foreign module system.
pub const FOREIGN_SCHEME: &str = "legacy";

/// Failure to map a specifier to a canonical key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unsupported scheme '{scheme}' in specifier '{specifier}'")]
    UnsupportedScheme { scheme: String, specifier: String },
    #[error("cannot resolve '{specifier}' against '{referrer}'")]
    InvalidSpecifier { specifier: String, referrer: String },
    #[error("no foreign module loader configured for '{specifier}'")]
    ForeignUnavailable { specifier: String },
    #[error("foreign resolution of '{specifier}' failed: {source}")]
    Foreign {
        specifier: String,
        #[source]
        source: ForeignError,
    },
}

/// How to obtain and link the module behind one canonical key.
///
/// Produced exhaustively by [`SpecifierResolver::resolve`]; immutable once
/// created. The key alone decides identity — two requests with equal keys
/// describe the same module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleRequest {
    /// Fetchable source text; the locator is the key's URL itself.
    Source { key: ModuleKey },
    /// A foreign-system module, loaded through the adapter by locator.
    Foreign { key: ModuleKey, locator: String },
}

impl ModuleRequest {
    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        match self {
            Self::Source { key } | Self::Foreign { key, .. } => key,
        }
    }
}

/// Stateless classifier from specifier shape to [`ModuleRequest`].
pub struct SpecifierResolver {
    foreign: Option<Arc<dyn ForeignLoader>>,
}

impl SpecifierResolver {
    #[must_use]
    pub fn new(foreign: Option<Arc<dyn ForeignLoader>>) -> Self {
        Self { foreign }
    }

    /// Classify `specifier` and derive its canonical key relative to
    /// `referrer`.
    ///
    /// - Absolute `file:` URLs, and absolute URLs sharing the referrer's
    ///   scheme, are source requests as written (normalized).
    /// - `legacy:` URLs are foreign requests; the adapter canonicalizes the
    ///   locator so spelling variants converge on one key.
    /// - Any other absolute scheme is unsupported.
    /// - Everything else — `./`, `../`, absolute paths, bare names — is
    ///   resolved relative to the referrer by URL join.
    pub fn resolve(
        &self,
        referrer: &ModuleKey,
        specifier: &str,
    ) -> Result<ModuleRequest, ResolveError> {
        match Url::parse(specifier) {
            Ok(url) if url.scheme() == FOREIGN_SCHEME => self.resolve_foreign(referrer, &url),
            Ok(url) if url.scheme() == "file" || url.scheme() == referrer.scheme() => {
                Ok(ModuleRequest::Source { key: url.into() })
            }
            Ok(url) => Err(ResolveError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                specifier: specifier.to_string(),
            }),
            Err(_) => {
                let key = referrer
                    .join(specifier)
                    .map_err(|_| ResolveError::InvalidSpecifier {
                        specifier: specifier.to_string(),
                        referrer: referrer.to_string(),
                    })?;
                Ok(ModuleRequest::Source { key })
            }
        }
    }

    fn resolve_foreign(
        &self,
        referrer: &ModuleKey,
        url: &Url,
    ) -> Result<ModuleRequest, ResolveError> {
        let specifier = url.as_str();
        let foreign = self
            .foreign
            .as_ref()
            .ok_or_else(|| ResolveError::ForeignUnavailable {
                specifier: specifier.to_string(),
            })?;

        // The request text is everything after the scheme marker:
        // legacy://util → "util", legacy:///srv/lib.js → "/srv/lib.js".
        let mut request = String::new();
        if let Some(host) = url.host_str() {
            request.push_str(host);
        }
        request.push_str(url.path());

        let locator =
            foreign
                .resolve_locator(&request, referrer)
                .map_err(|source| ResolveError::Foreign {
                    specifier: specifier.to_string(),
                    source,
                })?;
        let key = ModuleKey::parse(&format!("{FOREIGN_SCHEME}://{locator}")).map_err(|_| {
            ResolveError::InvalidSpecifier {
                specifier: specifier.to_string(),
                referrer: referrer.to_string(),
            }
        })?;
        Ok(ModuleRequest::Foreign { key, locator })
    }
}
