//! Read-only storage backend.
//!
//! Wraps another implementation and prevents mutations from executing, but
//! indicates success on return. Used for dry runs.

use async_trait::async_trait;
use std::path::Path;

use crate::{BackendHandle, StorageBackend, error::Result};

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all mutations, logging an
/// [`info event`](tracing::Event) for each one.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(key = %path.display(), bytes = data.len(), "Skipping write during dry run");
        Ok(())
    }

    async fn upload(&self, source: &Path, path: &Path) -> Result<()> {
        tracing::info!(key = %path.display(), source = %source.display(), "Skipping upload during dry run");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(key = %path.display(), "Skipping delete during dry run");
        Ok(())
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mutations_are_dropped() {
        let inner = Arc::new(MockBackend::with_files([("map.json", b"{}".to_vec())]));
        let backend = ReadOnlyBackend::new(inner.clone());
        backend.write(Path::new("map.json"), b"{\"modpacks\":{}}").await.unwrap();
        backend.delete(Path::new("map.json")).await.unwrap();
        backend.upload(Path::new("/nonexistent"), Path::new("a.jar")).await.unwrap();
        assert_eq!(backend.read(Path::new("map.json")).await.unwrap(), b"{}");
        assert!(inner.operations().await.is_empty());
    }
}
