//! Size-based file selection.
//!
//! Two pure operations over a collection of [`FileRecord`]s:
//!
//! - [`largest`] picks the `k` biggest files.
//! - [`files_to_free_space`] picks the shortest run of biggest files whose
//!   combined size reaches a byte target.
//!
//! Both rank records by size descending, then by path string ascending, so
//! results never depend on the iteration order of the input collection.
//! The ranking lives here rather than as an `Ord` impl on `FileRecord`.

use std::borrow::Cow;
use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tamefile_core::{FileRecord, Inventory, total_size};

/// Ranking key of a record: larger files first, ties broken by path string.
///
/// Distinct non-UTF-8 paths can share a lossy string, so the raw path is the
/// last component.
pub fn ranking_key(record: &FileRecord) -> (Reverse<u64>, Cow<'_, str>, &Path) {
    (
        Reverse(record.size_bytes()),
        record.path().to_string_lossy(),
        record.path(),
    )
}

/// Compare two records under the ranking order.
///
/// `Ordering::Less` means `a` ranks ahead of `b`.
pub fn compare_ranked(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.size_bytes()
        .cmp(&a.size_bytes())
        .then_with(|| a.path().to_string_lossy().cmp(&b.path().to_string_lossy()))
        .then_with(|| a.path().cmp(b.path()))
}

/// Rank a whole collection.
pub fn ranked<'a, I>(files: I) -> Vec<FileRecord>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut ranked: Vec<&FileRecord> = files.into_iter().collect();
    ranked.sort_by(|a, b| compare_ranked(a, b));
    ranked.into_iter().cloned().collect()
}

/// Return the `k` largest records, largest first.
///
/// `k == 0` yields nothing; a `k` past the collection size yields every
/// record, fully ranked. Uses a bounded top-k selection, so only `k` records
/// are kept in memory while the input is consumed.
pub fn largest<'a, I>(files: I, k: usize) -> Vec<FileRecord>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    if k == 0 {
        return Vec::new();
    }

    files
        .into_iter()
        .k_smallest_by(k, |a, b| compare_ranked(a, b))
        .cloned()
        .collect()
}

/// Return the shortest ranked prefix whose total size reaches `target_bytes`.
///
/// Records are taken greedily, largest first, until the running total is at
/// least the target. A non-positive target needs no files and yields an
/// empty selection. When even every record together falls short, all of
/// them are returned, ranked; callers compare the total against the target
/// to see how close it got.
///
/// Greedy selection is not guaranteed to use the fewest possible files in
/// the subset-sum sense, but the result is always a contiguous prefix of the
/// ranked order and is deterministic.
pub fn files_to_free_space<'a, I>(files: I, target_bytes: i64) -> Vec<FileRecord>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    if target_bytes <= 0 {
        return Vec::new();
    }
    let target = target_bytes.unsigned_abs();

    let mut ranked: Vec<&FileRecord> = files.into_iter().collect();
    ranked.sort_by(|a, b| compare_ranked(a, b));

    let mut freed: u64 = 0;
    let mut selected = Vec::new();
    for record in ranked {
        if freed >= target {
            break;
        }
        freed = freed.saturating_add(record.size_bytes());
        selected.push(record.clone());
    }

    debug!(
        target_bytes,
        selected = selected.len(),
        freed,
        reached = freed >= target,
        "greedy free-space selection"
    );

    selected
}

/// Outcome of a free-space request, with the numbers a report needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSpacePlan {
    /// Bytes requested.
    pub target_bytes: i64,
    /// Files suggested for removal, largest first.
    pub files: Vec<FileRecord>,
    /// Combined size of the suggested files.
    pub total_bytes: u64,
    /// Whether the suggestion meets the target.
    pub reached: bool,
    /// Bytes still missing when the target is out of reach (0 otherwise).
    pub shortfall: u64,
    /// Selected files whose data stays on disk until other links are removed.
    #[serde(default)]
    pub shared: Vec<SharedSelection>,
}

/// A planned file that is one of several hardlinks to the same data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSelection {
    pub path: PathBuf,
    /// Links found in the scan that are not part of the plan.
    pub other_links: Vec<PathBuf>,
    /// Links outside the scanned tree.
    pub links_outside: u64,
}

impl FreeSpacePlan {
    /// Number of files in the plan.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Whether no file needs to be removed.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether removing exactly the planned files frees `total_bytes`.
    pub fn is_reliable(&self) -> bool {
        self.shared.is_empty()
    }
}

/// Run [`files_to_free_space`] and summarize how well the result meets the target.
pub fn plan_free_space<'a, I>(files: I, target_bytes: i64) -> FreeSpacePlan
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let files = files_to_free_space(files, target_bytes);
    let total_bytes = total_size(&files);
    let target = u64::try_from(target_bytes).unwrap_or(0);
    let shortfall = target.saturating_sub(total_bytes);

    FreeSpacePlan {
        target_bytes,
        files,
        total_bytes,
        reached: shortfall == 0,
        shortfall,
        shared: Vec::new(),
    }
}

/// [`plan_free_space`] over a scanned inventory, flagging hardlinked files.
///
/// A file listed in [`FreeSpacePlan::shared`] frees nothing unless its
/// other links are removed too.
pub fn plan_free_space_in(inventory: &Inventory, target_bytes: i64) -> FreeSpacePlan {
    let mut plan = plan_free_space(&inventory.files, target_bytes);
    if inventory.hardlinks.is_empty() {
        return plan;
    }

    let planned: HashSet<&Path> = plan.files.iter().map(FileRecord::path).collect();
    let shared: Vec<SharedSelection> = plan
        .files
        .iter()
        .filter_map(|file| {
            let group = inventory.hardlink_group(file.path())?;
            let other_links: Vec<PathBuf> = group
                .siblings(file.path())
                .filter(|p| !planned.contains(p))
                .map(Path::to_path_buf)
                .collect();
            let links_outside = group.links_outside();
            (!other_links.is_empty() || links_outside > 0).then(|| SharedSelection {
                path: file.path().to_path_buf(),
                other_links,
                links_outside,
            })
        })
        .collect();

    debug!(shared = shared.len(), "hardlinked files in free-space plan");
    plan.shared = shared;
    plan
}
