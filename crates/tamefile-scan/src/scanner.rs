//! JWalk-based parallel directory scanner.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use tamefile_core::{
    FileRecord, Inventory, InventoryStats, ScanConfig, ScanError, ScanWarning, WarningKind,
};

use crate::inode::LinkTracker;
use crate::progress::ScanProgress;

/// How many files pass between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 1000;

/// Scanner producing a flat [`Inventory`] using jwalk for parallel traversal.
pub struct JwalkScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl JwalkScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan the configured root and return every regular file found under it.
    ///
    /// Entries that cannot be read are skipped and reported as warnings on
    /// the returned inventory; only problems with the root itself fail.
    pub fn scan(&self, config: &ScanConfig) -> Result<Inventory, ScanError> {
        let start = Instant::now();
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let root_metadata =
            std::fs::metadata(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
        let root_device = get_dev(&root_metadata);

        debug!(root = %root_path.display(), threads = config.threads, "starting scan");

        let mut state = CollectState::new(root_path.clone(), start);
        self.collect_entries(config, root_device, &mut state)?;

        let CollectState {
            mut files,
            directories,
            stats,
            warnings,
            links,
            ..
        } = state;

        files.sort_by(|a, b| a.path().cmp(b.path()));
        let scan_duration = start.elapsed();

        let _ = self.progress_tx.send(ScanProgress {
            finished: true,
            ..ScanProgress::snapshot(&stats, root_path.clone(), warnings.len(), scan_duration)
        });

        debug!(
            files = stats.total_files,
            dirs = stats.total_dirs,
            bytes = stats.total_size,
            warnings = warnings.len(),
            elapsed_ms = scan_duration.as_millis() as u64,
            "scan finished"
        );

        Ok(Inventory::new(
            root_path,
            files,
            directories,
            config.clone(),
            stats,
            scan_duration,
            warnings,
        )
        .with_hardlinks(links.into_groups()))
    }

    /// Walk the tree and collect files, directories and warnings.
    fn collect_entries(
        &self,
        config: &ScanConfig,
        root_device: u64,
        state: &mut CollectState,
    ) -> Result<(), ScanError> {
        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let matcher = config.ignore_matcher()?;

        let same_device_only = !config.cross_filesystems;

        // Pruning here keeps ignored directories and other mounts from being
        // descended into.
        let walker = WalkDir::new(&state.root)
            .parallelism(parallelism)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks)
            .min_depth(0)
            .max_depth(config.max_depth.map(|d| d as usize).unwrap_or(usize::MAX))
            .process_read_dir(move |_depth, _path, _state, children| {
                if !matcher.is_empty() {
                    children.retain(|child| {
                        child
                            .as_ref()
                            .map(|entry| !matcher.is_match(entry.file_name()))
                            .unwrap_or(true)
                    });
                }
                if same_device_only {
                    for entry in children.iter_mut().flatten() {
                        if entry.file_type().is_dir()
                            && entry
                                .metadata()
                                .is_ok_and(|m| get_dev(&m) != root_device)
                        {
                            entry.read_children_path = None;
                        }
                    }
                }
            });


        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let warning = match err.io_error() {
                        Some(io) => ScanWarning::from_io(path, io, WarningKind::ReadError),
                        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
                    };
                    state.warn(warning);
                    continue;
                }
            };

            let depth = entry.depth() as u32;
            if depth == 0 {
                // The root itself was already registered.
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                state.stats.record_symlink();
                if std::fs::metadata(&path).is_err() {
                    let target = std::fs::read_link(&path)
                        .map(|p| p.to_string_lossy().to_string())
                        .unwrap_or_default();
                    state.warn(ScanWarning::broken_symlink(&path, &target));
                }
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    let warning = match err.io_error() {
                        Some(io) => ScanWarning::from_io(&path, io, WarningKind::MetadataError),
                        None => {
                            ScanWarning::new(&path, err.to_string(), WarningKind::MetadataError)
                        }
                    };
                    state.warn(warning);
                    continue;
                }
            };

            if !config.cross_filesystems && get_dev(&metadata) != root_device {
                trace!(path = %path.display(), "skipping entry on another filesystem");
                continue;
            }

            if file_type.is_dir() {
                state.stats.record_dir(depth);
                state.directories.push(path);
            } else if file_type.is_file() {
                let size = state.links.counted_size(&path, &metadata, config.apparent_size);

                state.stats.record_file(&path, size, depth);
                state.files.push(FileRecord::new(path, size));

                if state.stats.total_files % PROGRESS_INTERVAL == 0 {
                    self.report_progress(state);
                }
            }
        }

        Ok(())
    }

    fn report_progress(&self, state: &CollectState) {
        let current_path = state
            .files
            .last()
            .map(|f| f.path().to_path_buf())
            .unwrap_or_else(|| state.root.clone());
        let _ = self.progress_tx.send(ScanProgress::snapshot(
            &state.stats,
            current_path,
            state.warnings.len(),
            state.start.elapsed(),
        ));
    }
}

impl Default for JwalkScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulator for one scan.
struct CollectState {
    root: PathBuf,
    start: Instant,
    files: Vec<FileRecord>,
    directories: Vec<PathBuf>,
    stats: InventoryStats,
    warnings: Vec<ScanWarning>,
    links: LinkTracker,
}

impl CollectState {
    fn new(root: PathBuf, start: Instant) -> Self {
        let mut stats = InventoryStats::new();
        stats.record_dir(0);
        Self {
            directories: vec![root.clone()],
            root,
            start,
            files: Vec::new(),
            stats,
            warnings: Vec::new(),
            links: LinkTracker::new(),
        }
    }

    fn warn(&mut self, warning: ScanWarning) {
        debug!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }
}

/// Device of an entry, used to stay on the root's filesystem.
#[cfg(unix)]
fn get_dev(metadata: &std::fs::Metadata) -> u64 {
    metadata.dev()
}

#[cfg(not(unix))]
fn get_dev(_metadata: &std::fs::Metadata) -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();

        temp
    }

    #[test]
    fn test_basic_scan() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let scanner = JwalkScanner::new();
        let inventory = scanner.scan(&config).unwrap();

        assert_eq!(inventory.stats.total_files, 4);
        // root, dir1, dir2, subdir
        assert_eq!(inventory.stats.total_dirs, 4);
        assert_eq!(inventory.directories.len(), 4);
        assert_eq!(inventory.total_size(), 5 + 17 + 4 + 17);
    }

    #[test]
    fn test_files_sorted_by_path() {
        let temp = create_test_tree();
        let inventory = JwalkScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();

        assert!(inventory.files.windows(2).all(|w| w[0].path() <= w[1].path()));
    }

    #[test]
    fn test_ignore_patterns_prune_directories() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_patterns(vec!["dir2".to_string()])
            .build()
            .unwrap();

        let inventory = JwalkScanner::new().scan(&config).unwrap();

        assert_eq!(inventory.stats.total_files, 3);
        assert!(!inventory
            .files
            .iter()
            .any(|f| f.path().components().any(|c| c.as_os_str() == "dir2")));
    }

    #[test]
    fn test_progress_is_broadcast_on_finish() {
        let temp = create_test_tree();
        let scanner = JwalkScanner::new();
        let mut rx = scanner.subscribe();

        scanner.scan(&ScanConfig::new(temp.path())).unwrap();

        let progress = rx.try_recv().unwrap();
        assert_eq!(progress.files, 4);
        assert_eq!(progress.dirs, 4);
        assert!(progress.finished);
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlinks_counted_once() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("original.bin"), vec![0u8; 100]).unwrap();
        fs::hard_link(root.join("original.bin"), root.join("link.bin")).unwrap();

        let inventory = JwalkScanner::new().scan(&ScanConfig::new(root)).unwrap();
        assert_eq!(inventory.files.len(), 2);
        assert_eq!(inventory.total_size(), 100);
        assert_eq!(inventory.hardlinks.len(), 1);
        let canonical = root.canonicalize().unwrap();
        assert_eq!(
            inventory.hardlinks[0].paths,
            vec![canonical.join("link.bin"), canonical.join("original.bin")]
        );

        let mut config = ScanConfig::new(root);
        config.apparent_size = true;
        let inventory = JwalkScanner::new().scan(&config).unwrap();
        assert_eq!(inventory.total_size(), 200);
    }

    #[test]
    fn test_same_device_scan_keeps_subdirectories() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .cross_filesystems(false)
            .build()
            .unwrap();

        let inventory = JwalkScanner::new().scan(&config).unwrap();
        assert_eq!(inventory.stats.total_files, 4);
        assert_eq!(inventory.stats.total_dirs, 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_warns() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("real.txt"), "data").unwrap();
        std::os::unix::fs::symlink(root.join("missing.txt"), root.join("dangling")).unwrap();

        let inventory = JwalkScanner::new().scan(&ScanConfig::new(root)).unwrap();

        assert_eq!(inventory.files.len(), 1);
        assert_eq!(inventory.stats.total_symlinks, 1);
        assert!(inventory
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::BrokenSymlink));
    }
}
