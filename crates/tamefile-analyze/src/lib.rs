//! Analysis algorithms for tamefile.
//!
//! - **Selection** - largest files, and the greedy set of files that frees
//!   a byte target
//! - **Duplicate detection** - group files by name, size, or BLAKE3 content
//! - **Tree layout** - flat node table and indented text tree
//!
//! ```rust,ignore
//! use tamefile_analyze::{files_to_free_space, largest};
//! use tamefile_scan::{JwalkScanner, ScanConfig};
//!
//! let inventory = JwalkScanner::new().scan(&ScanConfig::new("/path"))?;
//!
//! for file in largest(&inventory.files, 10) {
//!     println!("{} {}", file.size_bytes(), file.path().display());
//! }
//!
//! let candidates = files_to_free_space(&inventory.files, 5 * 1024 * 1024 * 1024);
//! ```

mod duplicates;
pub mod selection;
pub mod tree;

pub use duplicates::{
    ContentHash, DuplicateConfig, DuplicateConfigBuilder, DuplicateFinder, DuplicateGroup,
    DuplicateKey, DuplicateMethod, DuplicateReport,
};
pub use selection::{
    FreeSpacePlan, SharedSelection, compare_ranked, files_to_free_space, largest,
    plan_free_space, plan_free_space_in, ranked, ranking_key,
};
pub use tree::{
    DirectoryEntry, DirectoryTree, EntryKind, TreeFormat, TreeFormatBuilder, TreeNode,
    directory_entries, format_tree,
};

// Re-export core types
pub use tamefile_core::{FileRecord, HardlinkGroup, Inventory, total_size};

/// Format size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
