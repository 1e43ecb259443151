use std::collections::HashMap;

use zbus::zvariant::OwnedValue;

/// Opaque launch context passed end-to-end between a remote and the primary instance.
///
/// Carried verbatim through `Activate`, `Open` and `CommandLine`; this crate never interprets
/// its contents.
pub type PlatformData = HashMap<String, OwnedValue>;

/// A file reference produced from a URI handed to `Open`.
///
/// URI parsing and filesystem access are out of scope for this crate (see the spec's
/// out-of-scope collaborators); this type only keeps the original URI around and exposes the
/// local path when the scheme is `file`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRef {
    uri: String,
}

impl FileRef {
    pub fn for_uri(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The local filesystem path, if this is a `file://` URI with no host component.
    pub fn path(&self) -> Option<&std::path::Path> {
        let rest = self.uri.strip_prefix("file://")?;
        if rest.starts_with('/') {
            Some(std::path::Path::new(rest))
        } else {
            None
        }
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}
