use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tamefile_core::{FileRecord, Inventory, ScanConfig, ScanError, total_size};

#[test]
fn test_file_record_value_semantics() {
    let a = FileRecord::new("/data/a.bin", 100);
    let b = FileRecord::new(PathBuf::from("/data/a.bin"), 100);
    let c = FileRecord::new("/data/a.bin", 101);

    assert_eq!(a, b);
    assert_ne!(a, c);

    let mut counts: HashMap<FileRecord, u32> = HashMap::new();
    *counts.entry(a.clone()).or_default() += 1;
    *counts.entry(b).or_default() += 1;
    *counts.entry(c).or_default() += 1;

    assert_eq!(counts.len(), 2);
    assert_eq!(counts[&a], 2);
}

#[test]
fn test_file_record_from_tuple() {
    let record: FileRecord = ("/tmp/x", 7u64).into();
    assert_eq!(record.path(), Path::new("/tmp/x"));
    assert_eq!(record.size_bytes(), 7);

    let (path, size) = record.into_parts();
    assert_eq!(path, PathBuf::from("/tmp/x"));
    assert_eq!(size, 7);
}

#[test]
fn test_file_record_path_is_opaque() {
    // Relative and dotted paths are kept verbatim.
    let record = FileRecord::new("./a/../b", 1);
    assert_eq!(record.path(), Path::new("./a/../b"));
}

#[test]
fn test_total_size_over_collections() {
    let records = vec![
        FileRecord::new("a", 100),
        FileRecord::new("b", 200),
        FileRecord::new("c", 300),
    ];
    assert_eq!(total_size(&records), 600);
    assert_eq!(total_size(std::iter::empty()), 0);
}

#[test]
fn test_file_record_json_roundtrip() {
    let record = FileRecord::new("/data/report.pdf", 2048);
    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"size_bytes\":2048"));

    let back: FileRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_scan_config_serde_defaults() {
    let config: ScanConfig = serde_json::from_str(r#"{"root": "/srv"}"#).unwrap();
    assert_eq!(config, ScanConfig::new("/srv"));
    assert!(config.include_hidden);
    assert!(config.max_depth.is_none());
}

#[test]
fn test_scan_config_ignore_matcher() {
    let config = ScanConfig::builder()
        .root("/srv")
        .ignore_patterns(vec!["*.tmp".to_string(), "target".to_string()])
        .build()
        .unwrap();

    let matcher = config.ignore_matcher().unwrap();
    assert!(matcher.is_match("build.tmp"));
    assert!(matcher.is_match("target"));
    assert!(!matcher.is_match("src"));
}

#[test]
fn test_invalid_pattern_surfaces_as_config_error() {
    let mut config = ScanConfig::new("/srv");
    config.ignore_patterns.push("a[".to_string());

    let err = config.ignore_matcher().unwrap_err();
    assert!(matches!(err, ScanError::InvalidConfig { .. }));
    assert!(!config.should_ignore("a["));
}

#[test]
fn test_inventory_from_records() {
    let files = vec![
        FileRecord::new("/root/file1.txt", 5),
        FileRecord::new("/root/sub/file2.txt", 10),
    ];
    let inventory = Inventory::from_records("/root", files);

    assert_eq!(inventory.total_files(), 2);
    assert_eq!(inventory.total_dirs(), 2);
    assert_eq!(inventory.total_size(), 15);
    assert!(!inventory.has_warnings());
    assert!(!inventory.is_empty());
    assert_eq!(
        inventory.stats.largest_file,
        Some((PathBuf::from("/root/sub/file2.txt"), 10))
    );

    let dirs: BTreeMap<_, _> = inventory.directories.iter().map(|d| (d.clone(), ())).collect();
    assert!(dirs.contains_key(Path::new("/root")));
    assert!(dirs.contains_key(Path::new("/root/sub")));
}

#[test]
fn test_empty_inventory() {
    let inventory = Inventory::from_records("/empty", Vec::new());
    assert!(inventory.is_empty());
    assert_eq!(inventory.total_dirs(), 1);
    assert_eq!(inventory.total_size(), 0);
}
