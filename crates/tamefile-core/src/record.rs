//! File record type for the scanned inventory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One regular file discovered by a scan: its path and its size in bytes.
///
/// Records compare and hash structurally over `(path, size_bytes)`, so equal
/// records are interchangeable as set members or map keys. The type
/// deliberately has no `Ord` implementation; ranking is decided by the
/// selection code that consumes records, not by the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    path: PathBuf,
    size_bytes: u64,
}

impl FileRecord {
    /// Create a new record. The path is stored as given and never resolved.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// File name component of the path, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Consume the record, returning its parts.
    pub fn into_parts(self) -> (PathBuf, u64) {
        (self.path, self.size_bytes)
    }
}

impl<P: Into<PathBuf>> From<(P, u64)> for FileRecord {
    fn from((path, size_bytes): (P, u64)) -> Self {
        Self::new(path, size_bytes)
    }
}

/// Sum the sizes of a collection of records.
///
/// Saturates at `u64::MAX` instead of wrapping.
pub fn total_size<'a, I>(records: I) -> u64
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    records
        .into_iter()
        .fold(0u64, |acc, r| acc.saturating_add(r.size_bytes))
}
