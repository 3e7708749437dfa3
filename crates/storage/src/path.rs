//! Storage key validation.
//!
//! Keys come straight out of the manifest, so they are checked before any
//! backend touches them: no escaping the storage root, no null bytes.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage key for security and correctness.
/// Ensures that keys don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes on Unix; callers are
/// >           expected to hand over keys that already use `/`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use packsync_storage::validate_path;
/// assert!(validate_path("modpacks/vanilla/main_data/mods/a.jar").is_ok());
/// assert!(validate_path("../map.json").is_err());
/// assert_eq!(
///     validate_path("modpacks/./vanilla//main_data/").unwrap(),
///     Path::new("modpacks/vanilla/main_data")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(segments(path.as_ref())?.into_iter().collect())
}

/// Validates a key and renders it as a `/`-joined object key, independent of
/// the host separator.
pub fn to_key(path: impl AsRef<Path>) -> Result<String> {
    Ok(segments(path.as_ref())?.join("/"))
}

/// Resolves `.` and in-root `..`, drops empty and root components, and
/// refuses anything that is not plain UTF-8 below the root.
fn segments(path: &Path) -> Result<Vec<&str>> {
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf()));
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir | Component::RootDir => {},
            Component::ParentDir => {
                segments.pop().ok_or_else(invalid)?;
            },
            // Null bytes survive `Path::components()` but truncate C strings.
            Component::Normal(segment) => match segment.to_str() {
                Some(segment) if !segment.contains('\0') => segments.push(segment),
                _ => return Err(invalid()),
            },
            Component::Prefix(_) => return Err(invalid()),
        }
    }
    match segments.is_empty() {
        true => Err(invalid()),
        false => Ok(segments),
    }
}
