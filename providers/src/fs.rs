//! Filesystem source provider.

use std::io;

use url::Url;

use crate::{SourceError, SourceFuture, SourceProvider};

/// Reads `file:` locators from the local filesystem via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProvider;

impl FsProvider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SourceProvider for FsProvider {
    fn fetch(&self, locator: &Url) -> SourceFuture<'_> {
        let locator = locator.clone();
        Box::pin(async move {
            if locator.scheme() != "file" {
                return Err(SourceError::Unsupported {
                    locator: locator.to_string(),
                    reason: format!("filesystem provider cannot fetch '{}' URLs", locator.scheme()),
                });
            }
            let path = locator.to_file_path().map_err(|()| SourceError::Unsupported {
                locator: locator.to_string(),
                reason: "not a local file path".to_string(),
            })?;
            tracing::debug!("reading module source from {}", path.display());
            tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SourceError::NotFound {
                    locator: locator.to_string(),
                },
                _ => SourceError::Io {
                    locator: locator.to_string(),
                    reason: e.to_string(),
                },
            })
        })
    }
}
