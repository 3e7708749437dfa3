//! Content-addressed manifest of distributable modpack files.
//!
//! The pieces, leaf first:
//!
//! - [`hash`]: streaming file digests.
//! - [`link`]: canonical download URLs from a base URL and a relative path.
//! - [`scan`]: one [`FileRecord`] per file under a directory tree.
//! - [`schema`] and [`ServerConfig`]: per-modpack configuration, validated
//!   before it is accepted.
//! - [`assemble`]: every modpack directory folded into a [`Manifest`].
//! - [`diff`]: the storage mutations separating two manifests.

pub mod assemble;
pub mod diff;
pub mod error;
pub mod hash;
pub mod link;
mod manifest;
mod models;
pub mod scan;
pub mod schema;

pub use crate::assemble::{Assembler, assemble};
pub use crate::diff::SyncPlan;
pub use crate::hash::HashAlgorithm;
pub use crate::link::compose;
pub use crate::manifest::Manifest;
pub use crate::models::{FileRecord, Modpack, ServerConfig};
pub use crate::scan::{Scanner, scan};
