//! Folds every modpack directory into a [`Manifest`].
//!
//! Expected layout below the modpacks root:
//!
//! ```text
//! <modpack>/
//!   config.json
//!   main_data/...
//!   client_additional_data/<group>/...
//! ```

use crate::error::{ErrorKind, Result};
use crate::manifest::Manifest;
use crate::models::{Modpack, ServerConfig};
use crate::scan::Scanner;
use crate::schema::{Schema, SchemaValidator, Validator};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

pub const CONFIG_FILE: &str = "config.json";
pub const MAIN_DATA_DIR: &str = "main_data";
pub const CLIENT_ADDITIONAL_DATA_DIR: &str = "client_additional_data";

/// Builds manifests from a modpacks directory.
#[derive(Clone)]
pub struct Assembler {
    scanner: Scanner,
    validator: Arc<dyn Validator>,
    schema: Schema,
}

impl Assembler {
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            validator: Arc::new(SchemaValidator),
            schema: Schema::server_config(),
        }
    }

    /// Swap in another validator for modpack configuration files.
    pub fn with_validator(mut self, validator: impl Validator + 'static, schema: Schema) -> Self {
        self.validator = Arc::new(validator);
        self.schema = schema;
        self
    }

    /// Build the manifest for every modpack below `modpacks_root`, which is
    /// relative to the scanner's repository root.
    ///
    /// Any invalid configuration or unreadable file aborts the whole build;
    /// a partial manifest is never returned.
    #[instrument(skip(self), fields(modpacks_root = %modpacks_root.as_ref().display()))]
    pub fn assemble(&self, modpacks_root: impl AsRef<Path>) -> Result<Manifest> {
        let modpacks_root = modpacks_root.as_ref();
        if modpacks_root.is_absolute() || modpacks_root.has_root() {
            exn::bail!(ErrorKind::InvalidArgument(format!(
                "path must be relative: `{}`",
                modpacks_root.display()
            )));
        }
        let mut manifest = Manifest::default();
        let absolute_root = self.scanner.repository_root().join(modpacks_root);
        if !absolute_root.is_dir() {
            tracing::warn!("Modpacks directory does not exist; the manifest will be empty");
            return Ok(manifest);
        }
        for name in subdirectories(&absolute_root)? {
            let modpack = self.modpack(&modpacks_root.join(&name), &name)?;
            manifest.modpacks.insert(name, modpack);
        }
        tracing::info!(modpacks = manifest.modpacks.len(), "Manifest assembled");
        Ok(manifest)
    }

    #[instrument(skip(self, relative), level = "debug")]
    fn modpack(&self, relative: &Path, name: &str) -> Result<Modpack> {
        let absolute = self.scanner.repository_root().join(relative);
        let config = ServerConfig::load(name, absolute.join(CONFIG_FILE), self.validator.as_ref(), &self.schema)?;
        let main_data = self.scanner.scan(relative.join(MAIN_DATA_DIR))?;

        let additional_root = absolute.join(CLIENT_ADDITIONAL_DATA_DIR);
        fs::create_dir_all(&additional_root).or_raise(|| ErrorKind::Io(additional_root.clone()))?;
        let mut client_additional_data = BTreeMap::new();
        for group in subdirectories(&additional_root)? {
            let records = self.scanner.scan(relative.join(CLIENT_ADDITIONAL_DATA_DIR).join(&group))?;
            client_additional_data.insert(group, records);
        }
        tracing::debug!(
            main = main_data.len(),
            groups = client_additional_data.len(),
            "Modpack scanned"
        );
        Ok(Modpack { config, main_data, client_additional_data })
    }
}

/// Names of the immediate sub-directories of `dir`, sorted. Plain files are
/// ignored.
fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    let io = || ErrorKind::Io(dir.to_path_buf());
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).or_raise(io)? {
        let entry = entry.or_raise(io)?;
        let path: PathBuf = entry.path();
        if !path.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => {
                exn::bail!(ErrorKind::InvalidArgument(format!("directory name is not valid UTF-8: {name:?}")))
            },
        }
    }
    names.sort();
    Ok(names)
}

/// Build the manifest for `modpacks_root` relative to the current working
/// directory.
pub fn assemble(modpacks_root: impl AsRef<Path>, base_api_url: &str) -> Result<Manifest> {
    Assembler::new(Scanner::new(".", base_api_url)).assemble(modpacks_root)
}
