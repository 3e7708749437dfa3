//! The manifest document and its persisted form.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRecord, Modpack};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Every modpack, keyed by directory name.
///
/// Equality is structural across all nested records; two manifests built
/// from an unchanged tree compare equal, which is what lets a run end
/// without republishing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub modpacks: BTreeMap<String, Modpack>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.modpacks.is_empty()
    }

    /// Every file record of every modpack.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.modpacks.values().flat_map(Modpack::records)
    }

    /// Storage key index: `storage_key` → `content_hash`, flattened across
    /// every group of every modpack.
    pub fn storage_index(&self) -> BTreeMap<&str, &str> {
        self.records().map(|record| (record.storage_key.as_str(), record.content_hash.as_str())).collect()
    }

    pub fn from_json(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Pretty-printed JSON. Maps are ordered, so the output is stable for a
    /// given manifest.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut data = serde_json::to_vec_pretty(self)?;
        data.push(b'\n');
        Ok(data)
    }

    /// Load a persisted manifest. A missing file is `Ok(None)`.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).or_raise(|| ErrorKind::ManifestParseFailed(path.to_path_buf())),
        };
        let manifest = Self::from_json(&data).or_raise(|| ErrorKind::ManifestParseFailed(path.to_path_buf()))?;
        Ok(Some(manifest))
    }

    /// Load the previously persisted manifest to compare against.
    ///
    /// Missing or unreadable manifests count as empty: the next publish
    /// rewrites it from the directory tree anyway.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                tracing::info!(path = %path.display(), "No previous manifest; starting from an empty one");
                Self::default()
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = ?err, "Previous manifest unreadable; treating it as empty");
                Self::default()
            },
        }
    }

    /// Write the manifest to `path`, replacing any previous file.
    ///
    /// Writes to a sibling temporary file first and renames it into place, so
    /// readers never see a half-written manifest.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let fail = || ErrorKind::ManifestWriteFailed(path.to_path_buf());
        let data = self.to_json().or_raise(fail)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).or_raise(fail)?;
        }
        let mut temporary = path.as_os_str().to_owned();
        temporary.push(".tmp");
        let temporary = Path::new(&temporary);
        let mut file = std::fs::File::create(temporary).or_raise(fail)?;
        file.write_all(&data).or_raise(fail)?;
        file.sync_all().or_raise(fail)?;
        drop(file);
        std::fs::rename(temporary, path).or_raise(fail)?;
        Ok(())
    }
}
