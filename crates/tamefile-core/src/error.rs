//! Scan failures and the non-fatal warnings collected along the way.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A scan that could not produce an inventory at all.
///
/// Problems below the root never surface here; they become [`ScanWarning`]s.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan root does not exist: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("scan root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("cannot read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid scan configuration: {message}")]
    InvalidConfig { message: String },
}

impl ScanError {
    /// Attach a path to an I/O failure, keeping the common kinds distinct.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Path the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path }
            | Self::PermissionDenied { path }
            | Self::NotADirectory { path }
            | Self::Io { path, .. } => Some(path),
            Self::InvalidConfig { .. } => None,
        }
    }

    /// Whether the root is missing or unusable as a directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NotADirectory { .. })
    }
}

/// Why an entry was left out of the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    PermissionDenied,
    BrokenSymlink,
    /// Directory listing failed.
    ReadError,
    /// `stat` failed.
    MetadataError,
}

/// An entry skipped during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub message: String,
    pub kind: WarningKind,
}

impl ScanWarning {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn broken_symlink(path: impl Into<PathBuf>, target: &str) -> Self {
        Self::new(
            path,
            format!("dangling link to {target}"),
            WarningKind::BrokenSymlink,
        )
    }

    /// Warning for an I/O failure. Permission failures are always reported as
    /// [`WarningKind::PermissionDenied`], whatever `fallback` says.
    pub fn from_io(path: impl Into<PathBuf>, error: &io::Error, fallback: WarningKind) -> Self {
        let kind = match error.kind() {
            io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            _ => fallback,
        };
        Self::new(path, error.to_string(), kind)
    }
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_kinds_map_to_variants() {
        let denied = ScanError::io("/srv", io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(matches!(denied, ScanError::PermissionDenied { .. }));
        assert!(!denied.is_not_found());

        let missing = ScanError::io("/srv", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(missing.is_not_found());
        assert_eq!(missing.path(), Some(Path::new("/srv")));

        let other = ScanError::io("/srv", io::Error::other("disk on fire"));
        assert!(matches!(other, ScanError::Io { .. }));
        assert!(std::error::Error::source(&other).is_some());
    }

    #[test]
    fn test_warning_kind_from_io() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        let warning = ScanWarning::from_io("/x", &denied, WarningKind::MetadataError);
        assert_eq!(warning.kind, WarningKind::PermissionDenied);

        let warning = ScanWarning::from_io("/x", &io::Error::other("boom"), WarningKind::ReadError);
        assert_eq!(warning.kind, WarningKind::ReadError);
        assert_eq!(warning.to_string(), "/x: boom");
    }

    #[test]
    fn test_broken_symlink_names_target() {
        let warning = ScanWarning::broken_symlink("/a/link", "/missing");
        assert_eq!(warning.kind, WarningKind::BrokenSymlink);
        assert!(warning.message.contains("/missing"));
    }
}
