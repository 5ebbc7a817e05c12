//! Directory tree layout and text rendering.
//!
//! Two views of an [`Inventory`] for visualization:
//! - [`directory_entries`]: a flat node table (`id`, `parent`, `value`) of
//!   the kind treemap renderers consume.
//! - [`DirectoryTree`]: a nested tree with aggregate sizes, rendered as
//!   indented text by [`format_tree`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use derive_builder::Builder;
use serde::Serialize;

use tamefile_core::Inventory;

/// Type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One row of the flat node table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Full path of the entry.
    pub id: PathBuf,
    /// Path of the containing directory (`None` for the scan root).
    pub parent: Option<PathBuf>,
    /// File size, or aggregate size of everything below a directory.
    pub value: u64,
    /// File or directory.
    pub kind: EntryKind,
}

/// Aggregate size of every directory, keyed by path.
fn directory_sizes(inventory: &Inventory) -> HashMap<&Path, u64> {
    let mut sizes: HashMap<&Path, u64> = inventory
        .directories
        .iter()
        .map(|d| (d.as_path(), 0))
        .collect();

    for file in &inventory.files {
        let mut ancestor = file.path().parent();
        while let Some(dir) = ancestor {
            match sizes.get_mut(dir) {
                Some(size) => *size = size.saturating_add(file.size_bytes()),
                None => break,
            }
            if dir == inventory.root {
                break;
            }
            ancestor = dir.parent();
        }
    }

    sizes
}

/// Flatten an inventory into one entry per directory and file, sorted by path.
pub fn directory_entries(inventory: &Inventory) -> Vec<DirectoryEntry> {
    let sizes = directory_sizes(inventory);
    let parent_of = |path: &Path| {
        if path == inventory.root {
            None
        } else {
            path.parent().map(Path::to_path_buf)
        }
    };

    let mut entries: Vec<DirectoryEntry> = inventory
        .directories
        .iter()
        .map(|dir| DirectoryEntry {
            id: dir.clone(),
            parent: parent_of(dir),
            value: sizes.get(dir.as_path()).copied().unwrap_or(0),
            kind: EntryKind::Directory,
        })
        .chain(inventory.files.iter().map(|file| DirectoryEntry {
            id: file.path().to_path_buf(),
            parent: parent_of(file.path()),
            value: file.size_bytes(),
            kind: EntryKind::File,
        }))
        .collect();

    entries.sort_by(|a, b| a.id.cmp(&b.id));
    entries
}

/// A node of the nested directory tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    /// Entry name (the full path for the root).
    pub name: CompactString,
    /// Full path.
    pub path: PathBuf,
    /// Size in bytes (aggregate for directories).
    pub size: u64,
    /// File or directory.
    pub kind: EntryKind,
    /// Files below this node (1 for a file).
    pub file_count: u64,
    /// Children, largest first, ties by name.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Nested view of an inventory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryTree {
    /// Root node.
    pub root: TreeNode,
}

impl DirectoryTree {
    /// Build the tree from an inventory.
    pub fn build(inventory: &Inventory) -> Self {
        let mut children_by_parent: HashMap<PathBuf, Vec<(PathBuf, Option<u64>)>> = HashMap::new();
        for dir in &inventory.directories {
            if dir == &inventory.root {
                continue;
            }
            if let Some(parent) = dir.parent() {
                children_by_parent
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push((dir.clone(), None));
            }
        }
        for file in &inventory.files {
            if let Some(parent) = file.path().parent() {
                children_by_parent
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push((file.path().to_path_buf(), Some(file.size_bytes())));
            }
        }

        let mut root = build_node(&inventory.root, &mut children_by_parent);
        root.name = inventory.root.to_string_lossy().into();
        Self { root }
    }

    /// Total size of the tree.
    pub fn total_size(&self) -> u64 {
        self.root.size
    }
}

/// Recursively build a directory node, consuming its entries from the map.
fn build_node(
    path: &Path,
    children_by_parent: &mut HashMap<PathBuf, Vec<(PathBuf, Option<u64>)>>,
) -> TreeNode {
    let name: CompactString = path
        .file_name()
        .map(|n| n.to_string_lossy().into())
        .unwrap_or_else(|| path.to_string_lossy().into());

    let entries = children_by_parent.remove(path).unwrap_or_default();
    let mut children = Vec::with_capacity(entries.len());

    for (child_path, file_size) in entries {
        let child = match file_size {
            Some(size) => TreeNode {
                name: child_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into())
                    .unwrap_or_default(),
                path: child_path,
                size,
                kind: EntryKind::File,
                file_count: 1,
                children: Vec::new(),
            },
            None => build_node(&child_path, children_by_parent),
        };
        children.push(child);
    }

    children.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));

    TreeNode {
        name,
        path: path.to_path_buf(),
        size: children.iter().fold(0u64, |acc, c| acc.saturating_add(c.size)),
        kind: EntryKind::Directory,
        file_count: children.iter().map(|c| c.file_count).sum(),
        children,
    }
}

/// Options for [`format_tree`].
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct TreeFormat {
    /// Deepest level to print (root is 0; None = unlimited).
    #[builder(default)]
    pub max_depth: Option<u32>,

    /// Children shown per directory (None = all).
    #[builder(default)]
    pub top: Option<usize>,

    /// Width of the share-of-root bar (0 disables it).
    #[builder(default = "10")]
    pub bar_width: usize,
}

impl Default for TreeFormat {
    fn default() -> Self {
        Self {
            max_depth: None,
            top: None,
            bar_width: 10,
        }
    }
}

impl TreeFormat {
    /// Create a new format builder.
    pub fn builder() -> TreeFormatBuilder {
        TreeFormatBuilder::default()
    }
}

/// Render a tree as indented text, one line per node.
pub fn format_tree(tree: &DirectoryTree, format: &TreeFormat) -> String {
    let mut out = String::new();
    write_node(&mut out, &tree.root, 0, format, tree.root.size);
    out
}

fn write_node(out: &mut String, node: &TreeNode, depth: u32, format: &TreeFormat, root_size: u64) {
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        node.size as f64 / root_size as f64
    } else {
        0.0
    };
    let marker = if node.is_dir() { "▼ " } else { "  " };
    let suffix = if node.is_dir() && depth > 0 { "/" } else { "" };

    let _ = write!(
        out,
        "{indent}{marker}{}{suffix}  {}  {:.1}%",
        node.name,
        crate::format_size(node.size),
        ratio * 100.0
    );
    if format.bar_width > 0 {
        let _ = write!(out, " {}", make_bar(ratio, format.bar_width));
    }
    out.push('\n');

    if !node.is_dir() || format.max_depth.is_some_and(|max| depth >= max) {
        return;
    }

    let shown = format.top.unwrap_or(usize::MAX);
    for child in node.children.iter().take(shown) {
        write_node(out, child, depth + 1, format, root_size);
    }

    let remaining = node.children.len().saturating_sub(shown);
    if remaining > 0 {
        let indent = "  ".repeat((depth + 1) as usize);
        let _ = writeln!(out, "{indent}  ... and {remaining} more");
    }
}

/// Create a simple bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tamefile_core::FileRecord;

    fn sample() -> Inventory {
        Inventory::from_records(
            "/root",
            vec![
                FileRecord::new("/root/file1.txt", 5),
                FileRecord::new("/root/sub/file2.txt", 10),
            ],
        )
    }

    #[test]
    fn test_directory_sizes_aggregate() {
        let inventory = sample();
        let sizes = directory_sizes(&inventory);
        assert_eq!(sizes[Path::new("/root")], 15);
        assert_eq!(sizes[Path::new("/root/sub")], 10);
    }

    #[test]
    fn test_make_bar() {
        assert_eq!(make_bar(0.5, 4), "[██░░]");
        assert_eq!(make_bar(1.5, 2), "[██]");
    }

    #[test]
    fn test_tree_children_ranked() {
        let tree = DirectoryTree::build(&sample());
        let names: Vec<_> = tree.root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["sub", "file1.txt"]);
        assert_eq!(tree.root.file_count, 2);
        assert_eq!(tree.total_size(), 15);
    }

    #[test]
    fn test_format_depth_and_top_limits() {
        let tree = DirectoryTree::build(&sample());

        let format = TreeFormat::builder()
            .max_depth(Some(0u32))
            .bar_width(0usize)
            .build()
            .unwrap();
        let text = format_tree(&tree, &format);
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("▼ /root"));

        let format = TreeFormat::builder().top(Some(1usize)).build().unwrap();
        let text = format_tree(&tree, &format);
        assert!(text.contains("sub/"));
        assert!(text.contains("file2.txt"));
        assert!(text.contains("... and 1 more"));
        assert!(!text.contains("file1.txt"));
    }
}
