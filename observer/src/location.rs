//! Watched location identity.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An opaque, comparable identifier for a filesystem location under
/// observation.
///
/// Equality and hashing are over the canonical identifier only; the
/// display name is derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchedLocation(PathBuf);

impl WatchedLocation {
    /// Create a watched location from a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// The underlying path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Human-readable name, derived from the final path component.
    pub fn display_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.display().to_string())
    }

    /// A location for a child item of this one.
    pub fn join(&self, segment: impl AsRef<Path>) -> Self {
        Self(self.0.join(segment))
    }
}

impl fmt::Display for WatchedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

impl From<PathBuf> for WatchedLocation {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for WatchedLocation {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl AsRef<Path> for WatchedLocation {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_is_final_component() {
        let location = WatchedLocation::new("/container/docs/report.txt");
        assert_eq!(location.display_name(), "report.txt");
    }

    #[test]
    fn test_identity_is_path_based() {
        let a = WatchedLocation::new("/container/a");
        let b = WatchedLocation::new("/container/a");
        let c = a.join("sub");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c.path(), Path::new("/container/a/sub"));
    }
}
