//! Manifest Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Every variant keeps the underlying
//! cause as a child frame; nothing is flattened into a string.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A manifest error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Input Errors (fix the input, don't retry)
/// - [`ErrorKind::InvalidArgument`]
/// - [`ErrorKind::UnsupportedAlgorithm`]
/// - [`ErrorKind::ConfigParseFailed`]
/// - [`ErrorKind::ConfigValidationFailed`]
///
/// ### Filesystem Errors
/// - [`ErrorKind::HashingFailed`]
/// - [`ErrorKind::Io`]
/// - [`ErrorKind::ManifestParseFailed`]
/// - [`ErrorKind::ManifestWriteFailed`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A file could not be read or hashed.
    #[display("unable to hash `{}`", _0.display())]
    HashingFailed(#[error(not(source))] PathBuf),
    /// Hash algorithm identifier not recognised.
    #[display("unsupported hash algorithm: {_0}")]
    UnsupportedAlgorithm(#[error(not(source))] String),
    /// Malformed URL, empty path, or an absolute path where a relative one
    /// is required.
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
    /// A modpack's configuration file is missing or not well-formed JSON.
    #[display("unable to parse config file of modpack `{modpack}`")]
    ConfigParseFailed { modpack: String },
    /// A modpack's configuration is well-formed but breaks the schema.
    #[display("validation of config file of modpack `{modpack}` failed: {reason}")]
    ConfigValidationFailed { modpack: String, reason: String },
    /// Directory listing or creation failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// A persisted manifest exists but cannot be read back.
    #[display("unable to parse manifest `{}`", _0.display())]
    ManifestParseFailed(#[error(not(source))] PathBuf),
    #[display("unable to write manifest `{}`", _0.display())]
    ManifestWriteFailed(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HashingFailed(_) | Self::Io(_) | Self::ManifestWriteFailed(_))
    }
}
