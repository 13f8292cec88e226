//! Path-keyed index of a scanned tree.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DedupWarning, FileError};
use crate::record::{FileRecord, RelativePath, TreeRole};

/// Mapping from relative path to file record for one tree.
///
/// Iteration is in lexical order of relative path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeIndex {
    /// Which side this tree is on.
    pub role: TreeRole,

    /// Canonical root path that was scanned.
    pub root: PathBuf,

    /// Records keyed by relative path.
    pub records: BTreeMap<RelativePath, FileRecord>,

    /// Per-file failures encountered during the scan.
    pub errors: Vec<FileError>,

    /// Warnings encountered during the scan.
    pub warnings: Vec<DedupWarning>,

    /// Entries skipped because they are not regular files.
    pub skipped: u64,

    /// Duration of the scan.
    pub scan_duration: Duration,
}

impl TreeIndex {
    /// Create an empty index.
    pub fn new(role: TreeRole, root: impl Into<PathBuf>) -> Self {
        Self {
            role,
            root: root.into(),
            records: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            skipped: 0,
            scan_duration: Duration::ZERO,
        }
    }

    /// Insert a record. A record already stored under the same relative
    /// path is replaced and returned.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(record.relative_path.clone(), record)
    }

    /// Look up a record by relative path.
    pub fn get(&self, relative: &RelativePath) -> Option<&FileRecord> {
        self.records.get(relative)
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no files were indexed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total size of all indexed files.
    pub fn total_size(&self) -> u64 {
        self.records.values().map(|r| r.size_bytes).sum()
    }

    /// Iterate records in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Check if there were any per-file errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Fingerprint;
    use std::time::SystemTime;

    fn record(rel: &str, size: u64) -> FileRecord {
        FileRecord::new(
            rel.into(),
            format!("/root/{rel}"),
            size,
            Fingerprint::new([size as u8; 32]),
            SystemTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn test_insert_replaces_same_path() {
        let mut index = TreeIndex::new(TreeRole::Target, "/root");
        assert!(index.insert(record("a/b.txt", 1)).is_none());
        let previous = index.insert(record("a/b.txt", 2)).unwrap();

        assert_eq!(previous.size_bytes, 1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&"a/b.txt".into()).unwrap().size_bytes, 2);
    }

    #[test]
    fn test_iteration_is_lexical() {
        let mut index = TreeIndex::new(TreeRole::Reference, "/root");
        index.insert(record("z.txt", 1));
        index.insert(record("a/b.txt", 2));
        index.insert(record("m.txt", 3));

        let order: Vec<_> = index.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(order, vec!["a/b.txt", "m.txt", "z.txt"]);
        assert_eq!(index.total_size(), 6);
    }
}
