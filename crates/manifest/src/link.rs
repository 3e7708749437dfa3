//! Download URL composition.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;

/// Join `base_url` and `relative_path` into a single download URL.
///
/// The base gets exactly one trailing `/`, and backslashes in the relative
/// path become `/`, so the result doesn't depend on the host's path
/// separator. Query strings and fragments are not handled.
///
/// ```
/// use packsync_manifest::compose;
/// assert_eq!(compose("https://host/a", "b/c.txt").unwrap(), "https://host/a/b/c.txt");
/// assert_eq!(compose("https://host/a/", "b\\c.txt").unwrap(), "https://host/a/b/c.txt");
/// assert!(compose("not a url", "b/c.txt").is_err());
/// ```
pub fn compose(base_url: &str, relative_path: &str) -> Result<String> {
    let relative = relative_path.replace('\\', "/");
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        exn::bail!(ErrorKind::InvalidArgument("path to file in repository could not be empty".to_string()));
    }
    let parsed = url::Url::parse(base_url)
        .or_raise(|| ErrorKind::InvalidArgument(format!("`{base_url}` is not a valid absolute URL")))?;
    if parsed.cannot_be_a_base() {
        exn::bail!(ErrorKind::InvalidArgument(format!("`{base_url}` cannot be used as a base URL")));
    }
    Ok(format!("{}/{relative}", base_url.trim_end_matches('/')))
}
