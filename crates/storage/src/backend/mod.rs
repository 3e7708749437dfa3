//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for the mutations needed to publish a modpack manifest across
//! different backends (local filesystem, S3-compatible services, etc.).

mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::{MockBackend, Operation};
pub use self::ro::ReadOnlyBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for storage backends.
///
/// All storage operations are asynchronous so that network-backed
/// implementations don't need their own runtime. Callers in this workspace
/// await each operation in turn; nothing here is required to be safe under
/// concurrent mutation of the same key.
///
/// # Keys
/// All keys are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use packsync_storage::{backend::StorageBackend, error::Result};
///
/// async fn published_manifest(backend: &dyn StorageBackend) -> Result<Option<Vec<u8>>> {
///     match backend.read(Path::new("map.json")).await {
///         Ok(data) => Ok(Some(data)),
///         Err(e) if e.is_not_found() => Ok(None),
///         Err(e) => Err(e),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Read object contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write object contents, creating or overwriting it.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Upload the local file at `source` under the key `path`.
    ///
    /// Default implementation reads the whole file into memory and passes it
    /// to [`write()`](Self::write). Backends that can stream from disk should
    /// override it.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use packsync_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.upload(
    ///     Path::new("/srv/repo/modpacks/tfc/main_data/mods/tfc.jar"),
    ///     Path::new("modpacks/tfc/main_data/mods/tfc.jar"),
    /// ).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn upload(&self, source: &Path, path: &Path) -> Result<()> {
        let data = tokio::fs::read(source).await.map_err(|e| ErrorKind::from_io(e, source))?;
        self.write(path, &data).await
    }

    /// Delete an object.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist and the backend is able to tell.
    async fn delete(&self, path: &Path) -> Result<()>;
}
