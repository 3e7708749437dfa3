//! Storage mutations between two manifests.

use crate::manifest::Manifest;
use std::collections::BTreeSet;

/// Keys to remove from and push to storage so that it matches a new
/// manifest. The two sets never overlap: a changed file keeps its key and is
/// only re-uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub delete: BTreeSet<String>,
    pub upload: BTreeSet<String>,
}

impl SyncPlan {
    /// Plan the move from `old` to `new`.
    ///
    /// - Keys only in `old` are deleted.
    /// - Keys new in `new`, or whose hash changed, are uploaded.
    /// - Keys with an unchanged hash are left alone.
    pub fn between(new: &Manifest, old: &Manifest) -> Self {
        let new_index = new.storage_index();
        let old_index = old.storage_index();
        let delete = old_index.keys().filter(|key| !new_index.contains_key(*key)).map(|key| key.to_string()).collect();
        let upload = new_index
            .iter()
            .filter(|(key, hash)| old_index.get(*key) != Some(*hash))
            .map(|(key, _)| key.to_string())
            .collect();
        Self { delete, upload }
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.upload.is_empty()
    }
}
