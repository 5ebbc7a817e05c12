//! Duplicate file detection.
//!
//! Files can be grouped three ways (see [`DuplicateMethod`]):
//! - by file name
//! - by size in bytes
//! - by content, using a three-phase pass:
//!   1. group by size (no I/O)
//!   2. partial BLAKE3 hash (head + tail) within size groups
//!   3. full BLAKE3 hash for partial-hash matches
//!
//! Only groups with at least two members are reported.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use blake3::Hasher;
use compact_str::CompactString;
use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use strum::{Display, EnumString};
use tracing::{debug, trace};

use tamefile_core::{FileRecord, Inventory, total_size};

/// How files are compared when looking for duplicates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateMethod {
    /// Same file name, anywhere in the tree.
    Name,
    /// Same size in bytes.
    Size,
    /// Same bytes (BLAKE3).
    #[default]
    Content,
}

/// BLAKE3 content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// The value shared by every file in a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "method", content = "value", rename_all = "lowercase")]
pub enum DuplicateKey {
    Name(CompactString),
    Size(u64),
    Content(ContentHash),
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKey::Name(name) => write!(f, "{name}"),
            DuplicateKey::Size(size) => write!(f, "{size} bytes"),
            DuplicateKey::Content(hash) => write!(f, "{hash}"),
        }
    }
}

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DuplicateConfig {
    /// Minimum file size to consider.
    #[builder(default = "0")]
    pub min_size: u64,

    /// Maximum file size to consider.
    #[builder(default = "u64::MAX")]
    pub max_size: u64,

    /// Compare a partial hash before hashing whole files.
    #[builder(default = "true")]
    pub quick_compare: bool,

    /// Number of bytes for partial hash from start of file.
    #[builder(default = "4096")]
    pub partial_hash_head: usize,

    /// Number of bytes for partial hash from end of file.
    #[builder(default = "4096")]
    pub partial_hash_tail: usize,

    /// Glob patterns; files whose name or full path matches are skipped.
    #[builder(default)]
    pub exclude_patterns: Vec<String>,

    /// Maximum number of groups to return (0 = unlimited).
    #[builder(default = "0")]
    pub max_groups: usize,
}

impl DuplicateConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(format!("min_size ({min}) exceeds max_size ({max})"));
            }
        }
        if let Some(ref patterns) = self.exclude_patterns {
            for pattern in patterns {
                Glob::new(pattern)
                    .map_err(|e| format!("Invalid exclude pattern '{pattern}': {e}"))?;
            }
        }
        Ok(())
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: u64::MAX,
            quick_compare: true,
            partial_hash_head: 4096,
            partial_hash_tail: 4096,
            exclude_patterns: Vec::new(),
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// A group of files sharing the same key.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// What the files have in common.
    pub key: DuplicateKey,

    /// Members of the group, sorted by path.
    pub files: Vec<FileRecord>,

    /// Bytes reclaimable by keeping only the largest member.
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    fn new(key: DuplicateKey, mut files: Vec<FileRecord>) -> Self {
        files.sort_by(|a, b| a.path().cmp(b.path()));
        let largest = files.iter().map(FileRecord::size_bytes).max().unwrap_or(0);
        let wasted_bytes = total_size(&files).saturating_sub(largest);
        Self {
            key,
            files,
            wasted_bytes,
        }
    }

    /// Get the number of files in the group.
    pub fn count(&self) -> usize {
        self.files.len()
    }

    /// How many files could go if one copy is kept.
    pub fn deletable_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Iterate over member paths.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(FileRecord::path)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    /// Comparison used.
    pub method: DuplicateMethod,

    /// Groups, sorted by wasted space descending then key.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all files in groups.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files analyzed.
    pub files_analyzed: u64,

    /// Number of files that belong to a group.
    pub files_with_duplicates: u64,

    /// Number of groups.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of files across all groups.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::count).sum()
    }

    /// Find the group for a given key.
    pub fn group(&self, key: &DuplicateKey) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| &g.key == key)
    }
}

/// Duplicate file finder.
pub struct DuplicateFinder {
    config: DuplicateConfig,
    exclude: GlobSet,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self::with_config(DuplicateConfig::default())
    }

    /// Create a new duplicate finder with custom config.
    ///
    /// Invalid exclude patterns are dropped; the builder rejects them up front.
    pub fn with_config(config: DuplicateConfig) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        let exclude = builder.build().unwrap_or_else(|_| GlobSet::empty());
        Self { config, exclude }
    }

    /// Find duplicates in a scanned inventory.
    pub fn find_duplicates(&self, inventory: &Inventory, method: DuplicateMethod) -> DuplicateReport {
        let candidates: Vec<&FileRecord> = inventory
            .files
            .iter()
            .filter(|f| {
                f.size_bytes() >= self.config.min_size && f.size_bytes() <= self.config.max_size
            })
            .filter(|f| !self.is_excluded(f))
            .collect();

        let files_analyzed = candidates.len() as u64;

        let mut groups = match method {
            DuplicateMethod::Name => self.group_by_name(candidates),
            DuplicateMethod::Size => self.group_by_size(candidates),
            DuplicateMethod::Content => self.group_by_content(candidates),
        };

        groups.sort_by(|a, b| {
            b.wasted_bytes
                .cmp(&a.wasted_bytes)
                .then_with(|| a.key.cmp(&b.key))
        });

        if self.config.max_groups > 0 && groups.len() > self.config.max_groups {
            groups.truncate(self.config.max_groups);
        }

        let total_duplicate_size = groups.iter().map(|g| total_size(&g.files)).sum();
        let total_wasted_space = groups.iter().map(|g| g.wasted_bytes).sum();
        let files_with_duplicates = groups.iter().map(|g| g.files.len() as u64).sum();
        let group_count = groups.len();

        debug!(%method, files_analyzed, group_count, total_wasted_space, "duplicate search finished");

        DuplicateReport {
            method,
            groups,
            total_duplicate_size,
            total_wasted_space,
            files_analyzed,
            files_with_duplicates,
            group_count,
        }
    }

    /// Shorthand for [`DuplicateMethod::Name`].
    pub fn by_name(&self, inventory: &Inventory) -> DuplicateReport {
        self.find_duplicates(inventory, DuplicateMethod::Name)
    }

    /// Shorthand for [`DuplicateMethod::Size`].
    pub fn by_size(&self, inventory: &Inventory) -> DuplicateReport {
        self.find_duplicates(inventory, DuplicateMethod::Size)
    }

    /// Shorthand for [`DuplicateMethod::Content`].
    pub fn by_content(&self, inventory: &Inventory) -> DuplicateReport {
        self.find_duplicates(inventory, DuplicateMethod::Content)
    }

    fn is_excluded(&self, file: &FileRecord) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        file.file_name().is_some_and(|name| self.exclude.is_match(name))
            || self.exclude.is_match(file.path())
    }

    fn group_by_name(&self, files: Vec<&FileRecord>) -> Vec<DuplicateGroup> {
        let mut groups: HashMap<CompactString, Vec<FileRecord>> = HashMap::new();
        for file in files {
            if let Some(name) = file.file_name() {
                groups.entry(name.into()).or_default().push(file.clone());
            }
        }
        groups
            .into_iter()
            .filter(|(_, v)| v.len() > 1)
            .map(|(name, v)| DuplicateGroup::new(DuplicateKey::Name(name), v))
            .collect()
    }

    fn size_buckets<'a>(&self, files: Vec<&'a FileRecord>) -> HashMap<u64, Vec<&'a FileRecord>> {
        let mut groups: HashMap<u64, Vec<&FileRecord>> = HashMap::new();
        for file in files {
            groups.entry(file.size_bytes()).or_default().push(file);
        }
        groups.retain(|_, v| v.len() > 1);
        groups
    }

    fn group_by_size(&self, files: Vec<&FileRecord>) -> Vec<DuplicateGroup> {
        self.size_buckets(files)
            .into_iter()
            .map(|(size, v)| {
                DuplicateGroup::new(DuplicateKey::Size(size), v.into_iter().cloned().collect())
            })
            .collect()
    }

    fn group_by_content(&self, files: Vec<&FileRecord>) -> Vec<DuplicateGroup> {
        let size_groups: Vec<Vec<&FileRecord>> = self.size_buckets(files).into_values().collect();

        size_groups
            .into_par_iter()
            .flat_map(|files| {
                if self.config.quick_compare {
                    self.narrow_by_head_tail(files)
                } else {
                    self.full_hash_groups(files)
                }
            })
            .collect()
    }

    /// Narrow a size group with a partial hash, then confirm with full hashes.
    fn narrow_by_head_tail(&self, files: Vec<&FileRecord>) -> Vec<DuplicateGroup> {
        let partial_hashes: Vec<(&FileRecord, Option<[u8; 32]>)> = files
            .par_iter()
            .map(|f| (*f, self.head_tail_hash(f.path())))
            .collect();

        let mut partial_groups: HashMap<[u8; 32], Vec<&FileRecord>> = HashMap::new();
        for (file, hash) in partial_hashes {
            match hash {
                Some(h) => partial_groups.entry(h).or_default().push(file),
                None => trace!(path = %file.path().display(), "unreadable, skipped"),
            }
        }

        partial_groups
            .into_values()
            .filter(|candidates| candidates.len() > 1)
            .flat_map(|candidates| self.full_hash_groups(candidates))
            .collect()
    }

    /// Group files by full content hash.
    fn full_hash_groups(&self, files: Vec<&FileRecord>) -> Vec<DuplicateGroup> {
        let hashes: Vec<(&FileRecord, Option<ContentHash>)> = files
            .par_iter()
            .map(|f| (*f, self.content_hash(f.path())))
            .collect();

        let mut groups: HashMap<ContentHash, Vec<FileRecord>> = HashMap::new();
        for (file, hash) in hashes {
            match hash {
                Some(h) => groups.entry(h).or_default().push(file.clone()),
                None => trace!(path = %file.path().display(), "unreadable, skipped"),
            }
        }

        groups
            .into_iter()
            .filter(|(_, v)| v.len() > 1)
            .map(|(hash, v)| DuplicateGroup::new(DuplicateKey::Content(hash), v))
            .collect()
    }

    /// Compute a partial hash (first + last N bytes).
    fn head_tail_hash(&self, path: &Path) -> Option<[u8; 32]> {
        let mut file = File::open(path).ok()?;
        let file_size = file.metadata().ok()?.len();

        let mut hasher = Hasher::new();

        let head_size = (self.config.partial_hash_head as u64).min(file_size);
        let mut head_buf = vec![0u8; head_size as usize];
        file.read_exact(&mut head_buf).ok()?;
        hasher.update(&head_buf);

        if file_size > head_size {
            let tail_size = (self.config.partial_hash_tail as u64).min(file_size - head_size);
            if tail_size > 0 {
                file.seek(SeekFrom::End(-(tail_size as i64))).ok()?;
                let mut tail_buf = vec![0u8; tail_size as usize];
                file.read_exact(&mut tail_buf).ok()?;
                hasher.update(&tail_buf);
            }
        }

        hasher.update(&file_size.to_le_bytes());

        Some(*hasher.finalize().as_bytes())
    }

    /// Compute full BLAKE3 hash of a file.
    ///
    /// Memory-maps large files; small ones are read normally.
    fn content_hash(&self, path: &Path) -> Option<ContentHash> {
        let mut hasher = Hasher::new();
        hasher.update_mmap(path).ok()?;
        Some(ContentHash::new(*hasher.finalize().as_bytes()))
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}
