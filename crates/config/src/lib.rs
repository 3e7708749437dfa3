//! Layered configuration for packsync.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults.
//! 2. A configuration file: either given explicitly, or the first of
//!    `packsync.{toml,yaml,yml,json}` found in the working directory and then
//!    in the platform configuration directory.
//! 3. Environment variables prefixed with `PACKSYNC_`, using `__` to descend
//!    into nested tables (`PACKSYNC_STORAGE__KEY_SECRET`). Credentials are
//!    expected to arrive this way.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PACKSYNC_";
const FILE_STEM: &str = "packsync";
const FILE_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

/// Where published files go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// A directory on disk; relative paths resolve against the repository root.
    Local { path: PathBuf },
    /// An S3-compatible bucket.
    S3 {
        bucket: String,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
        key_id: String,
        key_secret: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Directory that storage keys (and the manifest path) are relative to.
    pub repository_root: PathBuf,
    /// Directory holding one sub-directory per modpack, relative to the
    /// repository root.
    pub modpacks_dir: PathBuf,
    /// Absolute URL prefix clients download files from.
    pub base_url: String,
    /// Local manifest file, relative to the repository root.
    pub manifest_path: PathBuf,
    /// Object key the manifest is published under.
    pub manifest_key: String,
    pub hash_algorithm: String,
    pub storage: StorageConfig,
}

#[derive(Serialize)]
struct Defaults {
    repository_root: PathBuf,
    modpacks_dir: PathBuf,
    manifest_path: PathBuf,
    manifest_key: String,
    hash_algorithm: String,
}
impl Default for Defaults {
    fn default() -> Self {
        Self {
            repository_root: PathBuf::from("."),
            modpacks_dir: PathBuf::from("modpacks"),
            manifest_path: PathBuf::from("map.json"),
            manifest_key: "map.json".to_string(),
            hash_algorithm: "sha256".to_string(),
        }
    }
}

impl AppConfig {
    /// Build the layered [`Figment`] without extracting it.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Defaults::default()));
        let file = match explicit {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::Invalid(format!("configuration file `{}` does not exist", path.display())))
            },
            Some(path) => Some(path.to_path_buf()),
            None => discover(),
        };
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Loading configuration file");
            figment = merge_file(figment, &file)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(explicit)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()
    }

    fn validate(self) -> Result<Self> {
        let url = url::Url::parse(&self.base_url)
            .or_raise(|| ErrorKind::Invalid(format!("base_url `{}` is not an absolute URL", self.base_url)))?;
        if url.cannot_be_a_base() {
            exn::bail!(ErrorKind::Invalid(format!("base_url `{}` cannot be used as a base", self.base_url)));
        }
        if self.modpacks_dir.is_absolute() {
            exn::bail!(ErrorKind::Invalid("modpacks_dir must be relative to repository_root".to_string()));
        }
        if self.manifest_path.is_absolute() {
            exn::bail!(ErrorKind::Invalid("manifest_path must be relative to repository_root".to_string()));
        }
        if self.manifest_key.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("manifest_key must not be empty".to_string()));
        }
        if let StorageConfig::S3 { bucket, .. } = &self.storage
            && bucket.trim().is_empty()
        {
            exn::bail!(ErrorKind::Invalid("storage.bucket must not be empty".to_string()));
        }
        Ok(self)
    }
}

fn discover() -> Option<PathBuf> {
    let mut directories = vec![PathBuf::from(".")];
    if let Some(dirs) = ProjectDirs::from("", "", FILE_STEM) {
        directories.push(dirs.config_dir().to_path_buf());
    }
    directories
        .iter()
        .flat_map(|dir| FILE_EXTENSIONS.iter().map(move |ext| dir.join(format!("{FILE_STEM}.{ext}"))))
        .find(|candidate| candidate.is_file())
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!(
            "unsupported configuration format: `{}`",
            path.display()
        ))),
    })
}
