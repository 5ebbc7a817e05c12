use std::collections::HashSet;

use proptest::prelude::*;
use tamefile_analyze::{FileRecord, files_to_free_space, largest, ranked, total_size};

fn records(specs: &[(&str, u64)]) -> Vec<FileRecord> {
    specs.iter().map(|(p, s)| FileRecord::new(*p, *s)).collect()
}

fn is_ranked(result: &[FileRecord]) -> bool {
    result.windows(2).all(|w| {
        let (a, b) = (&w[0], &w[1]);
        a.size_bytes() > b.size_bytes()
            || (a.size_bytes() == b.size_bytes()
                && a.path().to_string_lossy() <= b.path().to_string_lossy())
    })
}

fn inventory_strategy() -> impl Strategy<Value = Vec<FileRecord>> {
    prop::collection::vec(("[a-e]{1,3}", 0u64..50), 0..40).prop_map(|specs| {
        // Unique paths, like a real scan.
        let mut seen = HashSet::new();
        specs
            .into_iter()
            .filter(|(p, _)| seen.insert(p.clone()))
            .map(|(p, s)| FileRecord::new(p, s))
            .collect()
    })
}

#[test]
fn test_scenario_largest_three() {
    let files = records(&[("a", 100), ("b", 500), ("c", 1000), ("d", 200), ("e", 300)]);
    assert_eq!(
        largest(&files, 3),
        records(&[("c", 1000), ("b", 500), ("e", 300)])
    );
}

#[test]
fn test_scenario_free_space_threshold() {
    let files = records(&[("f1", 100), ("f2", 200), ("f3", 300), ("f4", 400)]);
    let result = files_to_free_space(&files, 500);
    assert_eq!(result, records(&[("f4", 400), ("f3", 300)]));
    assert_eq!(total_size(&result), 700);
}

#[test]
fn test_scenario_free_space_exhaustion() {
    let files = records(&[("f1", 100), ("f2", 200)]);
    assert_eq!(
        files_to_free_space(&files, 1000),
        records(&[("f2", 200), ("f1", 100)])
    );
}

#[test]
fn test_scenario_equal_sizes_rank_by_path() {
    let files = records(&[("z_file", 100), ("a_file", 100), ("m_file", 100)]);
    let order: Vec<_> = ranked(&files)
        .into_iter()
        .map(|r| r.path().to_string_lossy().into_owned())
        .collect();
    assert_eq!(order, vec!["a_file", "m_file", "z_file"]);
}

#[test]
fn test_works_over_hash_sets() {
    let set: HashSet<FileRecord> = records(&[("x", 1), ("y", 2), ("z", 2)]).into_iter().collect();
    assert_eq!(largest(&set, 2), records(&[("y", 2), ("z", 2)]));
    assert_eq!(files_to_free_space(&set, 3), records(&[("y", 2), ("z", 2)]));
}

proptest! {
    #[test]
    fn prop_largest_is_order_independent(files in inventory_strategy(), k in 0usize..50) {
        let forward = largest(&files, k);
        let backward = largest(files.iter().rev(), k);
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.len(), k.min(files.len()));
        prop_assert!(is_ranked(&forward));
    }

    #[test]
    fn prop_largest_is_prefix_of_full_ranking(files in inventory_strategy(), k in 0usize..50) {
        let full = ranked(&files);
        let top = largest(&files, k);
        prop_assert_eq!(&full[..top.len()], &top[..]);
    }

    #[test]
    fn prop_free_space_minimal_prefix(files in inventory_strategy(), target in 1i64..1500) {
        let result = files_to_free_space(&files, target);
        let total = total_size(&result);
        let target_u = target as u64;

        prop_assert!(is_ranked(&result));
        prop_assert_eq!(&ranked(&files)[..result.len()], &result[..]);

        if total_size(&files) >= target_u {
            prop_assert!(total >= target_u);
            let without_last = total - result.last().map_or(0, FileRecord::size_bytes);
            prop_assert!(without_last < target_u);
        } else {
            prop_assert_eq!(result, ranked(&files));
        }
    }

    #[test]
    fn prop_non_positive_target_selects_nothing(files in inventory_strategy(), target in i64::MIN..=0) {
        prop_assert!(files_to_free_space(&files, target).is_empty());
    }

    #[test]
    fn prop_free_space_is_order_independent(files in inventory_strategy(), target in -10i64..1500) {
        prop_assert_eq!(
            files_to_free_space(&files, target),
            files_to_free_space(files.iter().rev(), target)
        );
    }
}
