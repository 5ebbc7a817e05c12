//! Hardlink accounting.
//!
//! Only the first link found carries the file's size in the inventory;
//! later links are recorded with size 0. Every link is remembered so that
//! callers can tell which paths share the data.

use std::fs::Metadata;
use std::path::Path;

use dashmap::DashMap;

use tamefile_core::HardlinkGroup;

/// Identity of a file's data on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub device: u64,
    pub inode: u64,
}

impl FileId {
    pub fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    /// Identity and link count of a multiply-linked file, or `None` when the
    /// file has a single link (or the platform has no inode numbers).
    #[cfg(unix)]
    pub fn of_linked(metadata: &Metadata) -> Option<(Self, u64)> {
        use std::os::unix::fs::MetadataExt;

        (metadata.nlink() > 1)
            .then(|| (Self::new(metadata.dev(), metadata.ino()), metadata.nlink()))
    }

    #[cfg(not(unix))]
    pub fn of_linked(_metadata: &Metadata) -> Option<(Self, u64)> {
        None
    }
}

/// Concurrent map of multiply-linked files to the links seen so far.
#[derive(Debug, Default)]
pub struct LinkTracker {
    links: DashMap<FileId, HardlinkGroup>,
}

impl LinkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes the entry at `path` contributes to the inventory.
    ///
    /// With `apparent_size` every link reports the full length. Links are
    /// recorded either way.
    pub fn counted_size(&self, path: &Path, metadata: &Metadata, apparent_size: bool) -> u64 {
        let Some((id, link_count)) = FileId::of_linked(metadata) else {
            return metadata.len();
        };
        let first = self.record(id, link_count, metadata.len(), path);
        if first || apparent_size {
            metadata.len()
        } else {
            0
        }
    }

    /// Remember a link. Returns `true` for the first link of `id`.
    pub fn record(&self, id: FileId, link_count: u64, size_bytes: u64, path: &Path) -> bool {
        let mut first = false;
        self.links
            .entry(id)
            .or_insert_with(|| {
                first = true;
                HardlinkGroup {
                    size_bytes,
                    link_count,
                    paths: Vec::new(),
                }
            })
            .paths
            .push(path.to_path_buf());
        first
    }

    /// Number of multiply-linked files seen so far.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// All groups, each with sorted paths, ordered by first path.
    pub fn into_groups(self) -> Vec<HardlinkGroup> {
        let mut groups: Vec<HardlinkGroup> = self
            .links
            .into_iter()
            .map(|(_, mut group)| {
                group.paths.sort();
                group
            })
            .collect();
        groups.sort_by(|a, b| a.paths.first().cmp(&b.paths.first()));
        groups
    }
}
