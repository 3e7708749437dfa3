//! Object storage for published modpack files.
//!
//! Every backend speaks in storage keys: forward-slash separated paths
//! relative to the bucket (or directory) root, as recorded in the manifest.

pub mod backend;
pub mod error;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::path::{to_key, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
