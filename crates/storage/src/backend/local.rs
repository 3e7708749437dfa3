//! Local filesystem storage backend.
//!
//! Mirrors a bucket into a directory on disk. Handy for staging a publish and
//! for serving the files from a plain web server.

use crate::error::ErrorKind;
use crate::{StorageBackend, error::Result, path::validate as validate_path};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend.
///
/// All keys are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use packsync_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("mirror", "/srv/www/modpacks")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Validates the key and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    async fn ensure_parent(&self, absolute: &Path, path: &Path) -> Result<()> {
        // Keep behaviour consistent with S3-compatible storage, where
        // "directories" spring into existence.
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, path))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let target = self.absolute_path(path)?;
        Ok(fs::read(&target).await.map_err(|e| ErrorKind::from_io(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let target = self.absolute_path(path)?;
        self.ensure_parent(&target, path).await?;
        Ok(fs::write(&target, data).await.map_err(|e| ErrorKind::from_io(e, path))?)
    }

    async fn upload(&self, source: &Path, path: &Path) -> Result<()> {
        let target = self.absolute_path(path)?;
        self.ensure_parent(&target, path).await?;
        fs::copy(source, &target).await.map_err(|e| ErrorKind::from_io(e, source))?;
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let target = self.absolute_path(path)?;
        Ok(fs::remove_file(&target).await.map_err(|e| ErrorKind::from_io(e, path))?)
    }
}
