//! Progress snapshots broadcast while a scan runs.

use std::path::PathBuf;
use std::time::Duration;

use tamefile_core::InventoryStats;

/// Counters at one point of a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanProgress {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
    /// Last file recorded (the root on the final snapshot).
    pub current_path: PathBuf,
    pub warnings: u64,
    pub elapsed: Duration,
    /// Set on the last snapshot of a scan.
    pub finished: bool,
}

impl ScanProgress {
    pub(crate) fn snapshot(
        stats: &InventoryStats,
        current_path: PathBuf,
        warnings: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            files: stats.total_files,
            dirs: stats.total_dirs,
            bytes: stats.total_size,
            current_path,
            warnings: warnings as u64,
            elapsed,
            finished: false,
        }
    }

    pub fn files_per_second(&self) -> f64 {
        match self.elapsed.as_secs_f64() {
            secs if secs > 0.0 => self.files as f64 / secs,
            _ => 0.0,
        }
    }
}
