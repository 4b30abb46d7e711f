use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static LOCAL_SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:file|data|content|asset|ph|assets-library):").unwrap()
});

static REMOTE_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").unwrap());

/// Tells local resources apart from ones that need fetching.
pub struct UriClassifier;

impl UriClassifier {
    /// Returns true for URIs that already point at something on the device.
    pub fn is_local(uri: &str) -> bool {
        LOCAL_SCHEME_RE.is_match(uri) || Path::new(uri).is_absolute()
    }

    /// Returns true for `http`/`https` URIs.
    pub fn is_remote(uri: &str) -> bool {
        REMOTE_SCHEME_RE.is_match(uri)
    }

    /// Resolves a local URI to a readable file path.
    ///
    /// Only `file:` URIs and absolute paths have one; `data:` and platform
    /// asset schemes return `None`.
    pub fn local_path(uri: &str) -> Option<PathBuf> {
        if let Some(rest) = uri.strip_prefix("file://") {
            return Some(PathBuf::from(rest));
        }
        let path = Path::new(uri);
        path.is_absolute().then(|| path.to_path_buf())
    }
}
