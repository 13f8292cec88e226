use refdedup_analyze::DuplicateMatcher;
use refdedup_core::DedupEvent;
use refdedup_scan::{TreeRole, TreeScanner};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scan_pair(reference: &Path, target: &Path) -> (refdedup_core::TreeIndex, refdedup_core::TreeIndex) {
    let scanner = TreeScanner::new();
    (
        scanner.scan(reference, TreeRole::Reference).unwrap(),
        scanner.scan(target, TreeRole::Target).unwrap(),
    )
}

#[test]
fn test_only_same_path_same_content_matches() {
    let temp = TempDir::new().unwrap();
    let reference = temp.path().join("ref");
    let target = temp.path().join("tgt");
    write(&reference, "a/x.txt", b"hello");
    write(&reference, "b/y.txt", b"world");
    write(&target, "a/x.txt", b"hello");
    write(&target, "a/z.txt", b"hello");

    let (ref_index, tgt_index) = scan_pair(&reference, &target);
    let entries = DuplicateMatcher::new().match_trees(&ref_index, &tgt_index);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].relative_path.as_str(), "a/x.txt");
    assert!(entries[0].target_path.starts_with(&tgt_index.root));
    assert!(entries[0].reference_path.starts_with(&ref_index.root));
    assert_eq!(entries[0].size_bytes, 5);
}

#[test]
fn test_different_path_same_content_is_not_matched() {
    let temp = TempDir::new().unwrap();
    let reference = temp.path().join("ref");
    let target = temp.path().join("tgt");
    write(&reference, "photos/img.jpg", b"pixels");
    write(&target, "backup/img.jpg", b"pixels");

    let (ref_index, tgt_index) = scan_pair(&reference, &target);
    let report = DuplicateMatcher::new().analyze(&ref_index, &tgt_index);

    assert!(!report.has_duplicates());
    assert_eq!(report.only_in_target, 1);
}

#[test]
fn test_output_order_is_lexical_and_repeatable() {
    let temp = TempDir::new().unwrap();
    let reference = temp.path().join("ref");
    let target = temp.path().join("tgt");
    for rel in ["z.txt", "m/n.txt", "a.txt", "m/a/b.txt"] {
        write(&reference, rel, rel.as_bytes());
        write(&target, rel, rel.as_bytes());
    }

    let (ref_index, tgt_index) = scan_pair(&reference, &target);
    let matcher = DuplicateMatcher::new();
    let first: Vec<_> = matcher
        .match_trees(&ref_index, &tgt_index)
        .into_iter()
        .map(|e| e.relative_path.as_str().to_string())
        .collect();
    let second: Vec<_> = matcher
        .match_trees(&ref_index, &tgt_index)
        .into_iter()
        .map(|e| e.relative_path.as_str().to_string())
        .collect();

    assert_eq!(first, vec!["a.txt", "m/a/b.txt", "m/n.txt", "z.txt"]);
    assert_eq!(first, second);
}

#[test]
fn test_binary_and_empty_files() {
    let temp = TempDir::new().unwrap();
    let reference = temp.path().join("ref");
    let target = temp.path().join("tgt");
    let binary: Vec<u8> = (0..=255).collect();
    write(&reference, "bin.dat", &binary);
    write(&target, "bin.dat", &binary);
    write(&reference, "empty", b"");
    write(&target, "empty", b"");

    let (ref_index, tgt_index) = scan_pair(&reference, &target);
    let report = DuplicateMatcher::new().analyze(&ref_index, &tgt_index);

    assert_eq!(report.len(), 2);
    assert_eq!(report.total_bytes, 256);
}

#[test]
fn test_duplicate_found_events() {
    let temp = TempDir::new().unwrap();
    let reference = temp.path().join("ref");
    let target = temp.path().join("tgt");
    write(&reference, "dup.txt", b"same");
    write(&target, "dup.txt", b"same");
    write(&target, "other.txt", b"other");

    let (ref_index, tgt_index) = scan_pair(&reference, &target);
    let matcher = DuplicateMatcher::new();
    let mut rx = matcher.subscribe();
    matcher.match_trees(&ref_index, &tgt_index);

    let mut found = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let DedupEvent::DuplicateFound { relative_path, size } = event {
            found.push((relative_path.as_str().to_string(), size));
        }
    }
    assert_eq!(found, vec![("dup.txt".to_string(), 4)]);
}
