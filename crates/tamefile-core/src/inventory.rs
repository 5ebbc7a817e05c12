//! Scanned inventory container and statistics.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::error::ScanWarning;
use crate::record::FileRecord;

/// Summary statistics for a scanned inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryStats {
    /// Total size in bytes.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories, root included.
    pub total_dirs: u64,
    /// Total number of symbolic links.
    pub total_symlinks: u64,
    /// Maximum depth reached.
    pub max_depth: u32,
    /// Largest file (path, size).
    pub largest_file: Option<(PathBuf, u64)>,
}

impl InventoryStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, path: &Path, size: u64, depth: u32) {
        self.total_files += 1;
        self.total_size = self.total_size.saturating_add(size);
        self.max_depth = self.max_depth.max(depth);

        // Ties go to the smaller path so the result does not depend on walk order.
        let replaces = match &self.largest_file {
            None => true,
            Some((p, s)) => size > *s || (size == *s && path < p.as_path()),
        };
        if replaces {
            self.largest_file = Some((path.to_path_buf(), size));
        }
    }

    /// Record a directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a symlink.
    pub fn record_symlink(&mut self) {
        self.total_symlinks += 1;
    }
}

/// Paths sharing one inode.
///
/// Deleting a path only frees the data once every link is gone, including
/// links outside the scanned tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardlinkGroup {
    /// Size of the shared data.
    pub size_bytes: u64,
    /// Link count reported by the filesystem.
    pub link_count: u64,
    /// Links found during the scan, sorted.
    pub paths: Vec<PathBuf>,
}

impl HardlinkGroup {
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Links the scan never saw.
    pub fn links_outside(&self) -> u64 {
        self.link_count.saturating_sub(self.paths.len() as u64)
    }

    /// Links other than `path`.
    pub fn siblings<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a Path> + 'a {
        self.paths
            .iter()
            .map(PathBuf::as_path)
            .filter(move |p| *p != path)
    }
}

/// A fully materialized snapshot of one scanned directory tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// Root path that was scanned.
    pub root: PathBuf,

    /// Every regular file discovered.
    pub files: Vec<FileRecord>,

    /// Every directory discovered, root included.
    pub directories: Vec<PathBuf>,

    /// When this scan was performed.
    pub scanned_at: DateTime<Utc>,

    /// Duration of the scan.
    pub scan_duration: Duration,

    /// Scan configuration used.
    pub config: ScanConfig,

    /// Summary statistics.
    pub stats: InventoryStats,

    /// Warnings encountered during scan.
    pub warnings: Vec<ScanWarning>,

    /// Files with more than one link.
    #[serde(default)]
    pub hardlinks: Vec<HardlinkGroup>,
}

impl Inventory {
    /// Create a new inventory.
    pub fn new(
        root: PathBuf,
        files: Vec<FileRecord>,
        directories: Vec<PathBuf>,
        config: ScanConfig,
        stats: InventoryStats,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        Self {
            root,
            files,
            directories,
            scanned_at: Utc::now(),
            scan_duration,
            config,
            stats,
            warnings,
            hardlinks: Vec::new(),
        }
    }

    /// Attach the hardlink groups found while scanning.
    pub fn with_hardlinks(mut self, hardlinks: Vec<HardlinkGroup>) -> Self {
        self.hardlinks = hardlinks;
        self
    }

    /// Hardlink group a file belongs to, if it has other links.
    pub fn hardlink_group(&self, path: &Path) -> Option<&HardlinkGroup> {
        self.hardlinks.iter().find(|g| g.contains(path))
    }

    /// Build an inventory from in-memory records, deriving directories and stats.
    ///
    /// Every ancestor of a record below `root` is registered as a directory.
    pub fn from_records(root: impl Into<PathBuf>, files: Vec<FileRecord>) -> Self {
        let root = root.into();
        let mut stats = InventoryStats::new();
        let mut directories = vec![root.clone()];
        let mut seen: HashSet<PathBuf> = HashSet::from([root.clone()]);
        stats.record_dir(0);

        for file in &files {
            let relative = file.path().strip_prefix(&root).unwrap_or(file.path());
            let depth = relative.components().count() as u32;
            stats.record_file(file.path(), file.size_bytes(), depth);

            let mut ancestor = file.path().parent();
            while let Some(dir) = ancestor {
                if dir == root || !dir.starts_with(&root) {
                    break;
                }
                if seen.insert(dir.to_path_buf()) {
                    let dir_depth = dir.strip_prefix(&root).map_or(0, |p| p.components().count());
                    stats.record_dir(dir_depth as u32);
                    directories.push(dir.to_path_buf());
                }
                ancestor = dir.parent();
            }
        }

        let config = ScanConfig::new(&root);
        Self::new(root, files, directories, config, stats, Duration::ZERO, Vec::new())
    }

    /// Get the total size of all files.
    pub fn total_size(&self) -> u64 {
        self.stats.total_size
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.stats.total_files
    }

    /// Get the total number of directories.
    pub fn total_dirs(&self) -> u64 {
        self.stats.total_dirs
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the scan found no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
