//! File system scanning engine for tamefile.
//!
//! Traverses a directory tree in parallel (jwalk on a rayon pool) and
//! materializes an [`Inventory`]: one [`FileRecord`] per regular file, the
//! list of directories, summary statistics, and non-fatal warnings for
//! entries that could not be read.
//!
//! ```rust,no_run
//! use tamefile_scan::{JwalkScanner, ScanConfig};
//!
//! let config = ScanConfig::new("/path/to/scan");
//! let inventory = JwalkScanner::new().scan(&config).unwrap();
//!
//! println!("{} files, {} bytes", inventory.total_files(), inventory.total_size());
//! ```
//!
//! Progress can be followed through [`JwalkScanner::subscribe`], which
//! hands out a tokio broadcast receiver of [`ScanProgress`] snapshots.

mod inode;
mod progress;
mod scanner;

pub use inode::{FileId, LinkTracker};
pub use progress::ScanProgress;
pub use scanner::JwalkScanner;

// Re-export core types for convenience
pub use tamefile_core::{
    FileRecord, Inventory, InventoryStats, ScanConfig, ScanError, ScanWarning, WarningKind,
};
