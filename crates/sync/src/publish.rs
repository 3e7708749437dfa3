use crate::error::{ErrorKind, Operation, Result};
use exn::ResultExt;
use packsync_manifest::{Manifest, SyncPlan};
use packsync_storage::BackendHandle;
use packsync_storage::backend::ReadOnlyBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// What a publish run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The new manifest equals the previous one. Nothing was persisted.
    Unchanged,
    /// The manifest changed and was persisted after storage was reconciled.
    Changed { deleted: usize, uploaded: usize },
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Process exit status reporting this outcome: `0` when nothing changed,
    /// `1` when the manifest was rewritten.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Unchanged => 0,
            Self::Changed { .. } => 1,
        }
    }
}

/// Reconciles a storage backend with a new manifest, then persists it.
pub struct Publisher {
    backend: BackendHandle,
    repository_root: PathBuf,
    manifest_path: PathBuf,
    manifest_key: String,
    dry_run: bool,
}

impl Publisher {
    /// - `repository_root`: storage keys resolve to local files below it.
    /// - `manifest_path`: local manifest file, relative paths resolve against
    ///   `repository_root`.
    /// - `manifest_key`: object key the manifest is published under.
    pub fn new(
        backend: BackendHandle,
        repository_root: impl Into<PathBuf>,
        manifest_path: impl AsRef<Path>,
        manifest_key: impl Into<String>,
    ) -> Self {
        let repository_root = repository_root.into();
        let manifest_path = repository_root.join(manifest_path);
        Self {
            backend,
            repository_root,
            manifest_path,
            manifest_key: manifest_key.into(),
            dry_run: false,
        }
    }

    /// Log every mutation instead of performing it, and leave the local
    /// manifest file untouched.
    pub fn dry_run(mut self) -> Self {
        if !self.dry_run {
            self.backend = Arc::new(ReadOnlyBackend::new(self.backend));
            self.dry_run = true;
        }
        self
    }

    /// Path of the local manifest file.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// The manifest currently published under the manifest key, i.e. what
    /// storage holds right now. A missing or unreadable document counts as
    /// empty, so everything gets uploaded again.
    #[instrument(skip_all, fields(key = %self.manifest_key))]
    pub async fn published(&self) -> Result<Manifest> {
        let data = match self.backend.read(Path::new(&self.manifest_key)).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                tracing::info!("No published manifest; starting from an empty one");
                return Ok(Manifest::default());
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Fetch),
        };
        match Manifest::from_json(&data) {
            Ok(manifest) => Ok(manifest),
            Err(err) => {
                tracing::warn!(error = %err, "Published manifest unreadable; treating it as empty");
                Ok(Manifest::default())
            },
        }
    }

    /// Bring storage into agreement with `new`, given that it currently
    /// reflects `old` (usually [`published()`](Self::published)).
    ///
    /// 1. Every key only present in `old` is deleted. Keys already missing
    ///    from storage count as deleted.
    /// 2. Every key that is new or whose hash changed is uploaded from
    ///    `repository_root/<key>`.
    /// 3. If `new` differs from `old`, it is published under the manifest key
    ///    and then written to the local manifest file.
    ///
    /// The first failing mutation aborts the run. Mutations applied before it
    /// stay applied, and the manifest is not persisted, so the next run
    /// diffs against the same `old` and retries what is left.
    #[instrument(skip_all, fields(backend = self.backend.name(), dry_run = self.dry_run))]
    pub async fn publish(&self, new: &Manifest, old: &Manifest) -> Result<Outcome> {
        let plan = SyncPlan::between(new, old);
        tracing::info!(delete = plan.delete.len(), upload = plan.upload.len(), "Sync plan computed");

        for key in &plan.delete {
            self.delete(key).await?;
        }
        for key in &plan.upload {
            self.upload(key).await?;
        }

        if new == old {
            tracing::info!("Manifest unchanged");
            return Ok(Outcome::Unchanged);
        }
        self.persist(new).await?;
        Ok(Outcome::Changed {
            deleted: plan.delete.len(),
            uploaded: plan.upload.len(),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.backend.delete(Path::new(key)).await {
            Ok(()) => {
                tracing::info!(key, "Deleted");
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(key, "Already absent from storage");
                Ok(())
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::StorageOperationFailed {
                operation: Operation::Delete,
                key: key.to_string(),
            }),
        }
    }

    async fn upload(&self, key: &str) -> Result<()> {
        let source = self.repository_root.join(key);
        self.backend.upload(&source, Path::new(key)).await.or_raise(|| ErrorKind::StorageOperationFailed {
            operation: Operation::Upload,
            key: key.to_string(),
        })?;
        tracing::info!(key, "Uploaded");
        Ok(())
    }

    async fn persist(&self, manifest: &Manifest) -> Result<()> {
        // Remote first: it is the state the next run diffs against.
        let data = manifest.to_json().or_raise(|| ErrorKind::Persist)?;
        self.backend.write(Path::new(&self.manifest_key), &data).await.or_raise(|| ErrorKind::Persist)?;
        tracing::info!(key = %self.manifest_key, "Manifest published");
        if self.dry_run {
            tracing::info!(path = %self.manifest_path.display(), "Skipping local manifest write during dry run");
            return Ok(());
        }
        manifest.save(&self.manifest_path).or_raise(|| ErrorKind::Persist)?;
        tracing::info!(path = %self.manifest_path.display(), "Manifest written");
        Ok(())
    }
}
