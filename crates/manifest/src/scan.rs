//! Directory tree scanning.
//!
//! Produces one [`FileRecord`] per file below a directory. Paths handed to the
//! scanner are relative to a repository root, because the storage key of each
//! file *is* its path relative to that root.

use crate::error::{ErrorKind, Result};
use crate::hash::HashAlgorithm;
use crate::link::compose;
use crate::models::FileRecord;
use exn::{OptionExt, ResultExt};
use packsync_storage::to_key;
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use tracing::instrument;

enum WalkEntry {
    File(PathBuf),
    Descend,
    Skip,
}

/// Scans directories below a repository root.
#[derive(Debug, Clone)]
pub struct Scanner {
    repository_root: PathBuf,
    base_url: String,
    algorithm: HashAlgorithm,
}

impl Scanner {
    pub fn new(repository_root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            repository_root: repository_root.into(),
            base_url: base_url.into(),
            algorithm: HashAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn repository_root(&self) -> &Path {
        &self.repository_root
    }

    /// Scan every file below `root_dir`, which must be relative to the
    /// repository root.
    ///
    /// - A missing `root_dir` yields no records rather than an error.
    /// - Files come out in a deterministic order: each directory's files
    ///   sorted by name, then its sub-directories, also sorted by name.
    /// - A file that can't be hashed aborts the whole scan.
    #[instrument(skip(self), fields(root_dir = %root_dir.as_ref().display()))]
    pub fn scan(&self, root_dir: impl AsRef<Path>) -> Result<Vec<FileRecord>> {
        let root_dir = root_dir.as_ref();
        if root_dir.is_absolute() || root_dir.has_root() {
            exn::bail!(ErrorKind::InvalidArgument(format!("path must be relative: `{}`", root_dir.display())));
        }
        let start = self.repository_root.join(root_dir);
        if !start.is_dir() {
            tracing::debug!("Directory does not exist; nothing to scan");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut stack = vec![PathBuf::new()];
        while let Some(relative_dir) = stack.pop() {
            let current = start.join(&relative_dir);
            let mut entries = fs::read_dir(&current)
                .or_raise(|| ErrorKind::Io(current.clone()))?
                .collect::<std::io::Result<Vec<_>>>()
                .or_raise(|| ErrorKind::Io(current.clone()))?;
            entries.sort_by_key(DirEntry::file_name);

            let mut descend = Vec::new();
            for entry in entries {
                match Self::classify(&entry)? {
                    WalkEntry::File(path) => {
                        let dist = relative_dir.join(entry.file_name());
                        records.push(self.record(root_dir, &dist, &path)?);
                    },
                    WalkEntry::Descend => descend.push(relative_dir.join(entry.file_name())),
                    WalkEntry::Skip => {},
                }
            }
            // Reversed so the stack pops sub-directories in name order.
            stack.extend(descend.into_iter().rev());
        }
        tracing::debug!(files = records.len(), "Scan complete");
        Ok(records)
    }

    fn classify(entry: &DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let file_type = entry.file_type().or_raise(|| ErrorKind::Io(path.clone()))?;
        if file_type.is_dir() {
            return Ok(WalkEntry::Descend);
        }
        if file_type.is_file() {
            return Ok(WalkEntry::File(path));
        }
        // Symlinks to files are published like files; symlinked directories
        // are not followed.
        if file_type.is_symlink()
            && let Ok(metadata) = fs::metadata(&path)
            && metadata.is_file()
        {
            return Ok(WalkEntry::File(path));
        }
        tracing::debug!(path = %path.display(), "Skipping entry that is neither a file nor a directory");
        Ok(WalkEntry::Skip)
    }

    fn record(&self, root_dir: &Path, dist: &Path, path: &Path) -> Result<FileRecord> {
        let invalid = || ErrorKind::InvalidArgument(format!("unusable path: `{}`", path.display()));
        let file_name = path.file_name().and_then(|name| name.to_str()).ok_or_raise(invalid)?.to_string();
        let dist_path = to_key(dist).or_raise(invalid)?;
        let storage_key = to_key(root_dir.join(dist)).or_raise(invalid)?;
        let api_url = compose(&self.base_url, &storage_key)?;
        let content_hash = self.algorithm.hash_file(path)?;
        Ok(FileRecord {
            file_name,
            api_url,
            storage_key,
            content_hash,
            dist_path,
        })
    }
}

/// Scan `root_dir` relative to the current working directory.
pub fn scan(root_dir: impl AsRef<Path>, base_api_url: &str) -> Result<Vec<FileRecord>> {
    Scanner::new(".", base_api_url).scan(root_dir)
}
