//! Manifest records.
//!
//! Field names on the wire are what the launcher already reads, hence the
//! renames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One physical file under a scanned directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Base name of the file.
    pub file_name: String,
    /// Canonical absolute download URL.
    pub api_url: String,
    /// Object key: path relative to the repository root, `/`-separated.
    #[serde(rename = "yan_obj_storage")]
    pub storage_key: String,
    /// Lowercase hex digest of the file contents.
    #[serde(rename = "hash")]
    pub content_hash: String,
    /// Path relative to the scanned directory, `/`-separated. Clients
    /// download the file to this location.
    #[serde(rename = "dist_file_path")]
    pub dist_path: String,
}

/// Parameters for installing and running a modpack's server and client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Visible name of this modpack configuration.
    pub config_name: String,
    pub minecraft_version: String,
    pub forge_version: String,
    pub minecraft_profile: String,
    pub minecraft_server_ip: String,
    pub minecraft_server_port: String,
}

/// A modpack: its configuration plus its file groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modpack {
    pub config: ServerConfig,
    /// Files every install needs.
    pub main_data: Vec<FileRecord>,
    /// Optional client-side groups, keyed by sub-directory name.
    #[serde(default)]
    pub client_additional_data: BTreeMap<String, Vec<FileRecord>>,
}

impl Modpack {
    /// Every file record of the modpack, main group first.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.main_data.iter().chain(self.client_additional_data.values().flatten())
    }
}
