//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// A mutation performed against a [`MockBackend`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Write(PathBuf),
    Upload { source: PathBuf, key: PathBuf },
    Delete(PathBuf),
}

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Every mutation is
/// recorded so tests can assert exactly which uploads and deletes happened,
/// and keys can be marked as failing to exercise error paths.
///
/// # Examples
///
/// ```
/// use packsync_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("modpacks/tfc/main_data/old.jar", b"old"),
/// ]);
/// backend.delete(Path::new("modpacks/tfc/main_data/old.jar")).await?;
/// assert_eq!(backend.deletes().await.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    operations: RwLock<Vec<Operation>>,
    failing: HashSet<PathBuf>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            operations: RwLock::new(Vec::new()),
            failing: HashSet::new(),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Any mutation of `key` fails with a [`BackendError`](ErrorKind::BackendError).
    pub fn failing_on(mut self, key: impl AsRef<Path>) -> Self {
        let Ok(validated) = validate_path(key.as_ref()) else {
            panic!("MockBackend::failing_on: invalid path {}", key.as_ref().display());
        };
        self.failing.insert(validated);
        self
    }

    /// All mutations so far, in call order.
    pub async fn operations(&self) -> Vec<Operation> {
        self.operations.read().await.clone()
    }

    /// Keys uploaded so far, in call order.
    pub async fn uploads(&self) -> Vec<PathBuf> {
        self.operations
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                Operation::Upload { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Keys deleted so far, in call order.
    pub async fn deletes(&self) -> Vec<PathBuf> {
        self.operations
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                Operation::Delete(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Stored object keys, sorted.
    pub async fn keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<_> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_failure(&self, path: &Path) -> Result<()> {
        if self.failing.contains(path) {
            exn::bail!(ErrorKind::BackendError(format!("injected failure for `{}`", path.display())));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let data = self.storage.read().await.get(&path).cloned();
        data.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.check_failure(&path)?;
        self.operations.write().await.push(Operation::Write(path.clone()));
        self.storage.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn upload(&self, source: &Path, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.check_failure(&path)?;
        let data = tokio::fs::read(source).await.map_err(|e| ErrorKind::from_io(e, source))?;
        self.operations.write().await.push(Operation::Upload {
            source: source.to_path_buf(),
            key: path.clone(),
        });
        self.storage.write().await.insert(path, data);
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.check_failure(&path)?;
        let removed = self.storage.write().await.remove(&path);
        match removed {
            Some(_) => {
                self.operations.write().await.push(Operation::Delete(path));
                Ok(())
            },
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }
}
