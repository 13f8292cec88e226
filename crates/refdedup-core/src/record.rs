//! File records, fingerprints and normalized relative paths.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// BLAKE3 content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Create a new Fingerprint from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the fingerprint as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A path relative to a tree root, `/`-separated and NFC-normalized.
///
/// Two trees scanned on different platforms produce equal keys for the
/// same logical file, so matching never depends on the native separator or
/// on the Unicode form the filesystem stores names in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativePath(CompactString);

impl RelativePath {
    /// Build a relative path from the components of a native path.
    ///
    /// Only normal components are kept. Returns `None` if any component is
    /// not valid UTF-8, since such a name has no unambiguous key.
    pub fn from_path(relative: &Path) -> Option<Self> {
        let mut out = String::new();
        for component in relative.components() {
            if let Component::Normal(part) = component {
                if !out.is_empty() {
                    out.push('/');
                }
                out.extend(part.to_str()?.nfc());
            }
        }
        Some(Self(out.into()))
    }

    /// Relative path of `path` under `root`, if it lies inside it and its
    /// name decodes.
    pub fn under(root: &Path, path: &Path) -> Option<Self> {
        path.strip_prefix(root).ok().and_then(Self::from_path)
    }

    /// Get the normalized string form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Resolve against a native root directory.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for part in self.0.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    /// Number of path components.
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.split('/').count()
        }
    }
}

impl From<&str> for RelativePath {
    fn from(value: &str) -> Self {
        let normalized: String = value.trim_matches('/').nfc().collect();
        Self(normalized.into())
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the comparison a tree is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeRole {
    /// Read-only source of truth.
    Reference,
    /// Tree duplicates are removed from.
    Target,
}

impl std::fmt::Display for TreeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// A single scanned regular file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the scanned root.
    pub relative_path: RelativePath,

    /// Absolute path on disk.
    pub absolute_path: PathBuf,

    /// Size in bytes at scan time.
    pub size_bytes: u64,

    /// Content fingerprint.
    pub fingerprint: Fingerprint,

    /// Modification time at scan time.
    pub modified: SystemTime,
}

impl FileRecord {
    /// Create a new file record.
    pub fn new(
        relative_path: RelativePath,
        absolute_path: impl Into<PathBuf>,
        size_bytes: u64,
        fingerprint: Fingerprint,
        modified: SystemTime,
    ) -> Self {
        Self {
            relative_path,
            absolute_path: absolute_path.into(),
            size_bytes,
            fingerprint,
            modified,
        }
    }
}

/// One confirmed duplicate: same relative path, same fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateEntry {
    /// Shared relative path.
    pub relative_path: RelativePath,

    /// Size of the target file.
    pub size_bytes: u64,

    /// Shared fingerprint.
    pub fingerprint: Fingerprint,

    /// Target file subject to deletion.
    pub target_path: PathBuf,

    /// Reference file it duplicates.
    pub reference_path: PathBuf,

    /// Target modification time at scan time.
    pub target_modified: SystemTime,
}

impl DuplicateEntry {
    /// Pair a reference record with its target duplicate.
    pub fn new(reference: &FileRecord, target: &FileRecord) -> Self {
        Self {
            relative_path: target.relative_path.clone(),
            size_bytes: target.size_bytes,
            fingerprint: target.fingerprint,
            target_path: target.absolute_path.clone(),
            reference_path: reference.absolute_path.clone(),
            target_modified: target.modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_hex() {
        let fingerprint = Fingerprint::new([0xab; 32]);
        assert_eq!(fingerprint.to_hex().len(), 64);
        assert!(fingerprint.to_string().starts_with("abab"));
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let rel = RelativePath::from_path(&Path::new("a").join("b").join("c.txt")).unwrap();
        assert_eq!(rel.as_str(), "a/b/c.txt");
        assert_eq!(rel.depth(), 3);
    }

    #[test]
    fn test_relative_path_nfc() {
        let nfd = RelativePath::from_path(Path::new("cafe\u{0301}.txt")).unwrap();
        let nfc = RelativePath::from("caf\u{e9}.txt");
        assert_eq!(nfd, nfc);
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_path_rejects_undecodable_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = Path::new("dir").join(OsStr::from_bytes(b"a\xff"));
        assert!(RelativePath::from_path(&name).is_none());
        assert!(RelativePath::under(Path::new("/t"), &Path::new("/t").join(&name)).is_none());
    }

    #[test]
    fn test_relative_path_under_root() {
        let root = Path::new("/data/tree");
        let rel = RelativePath::under(root, Path::new("/data/tree/x/y.bin")).unwrap();
        assert_eq!(rel.as_str(), "x/y.bin");
        assert_eq!(rel.to_native(root), PathBuf::from("/data/tree/x/y.bin"));
        assert!(RelativePath::under(root, Path::new("/elsewhere/y.bin")).is_none());
    }

    #[test]
    fn test_duplicate_entry_takes_target_side() {
        let now = SystemTime::now();
        let fp = Fingerprint::new([1; 32]);
        let reference = FileRecord::new("a.txt".into(), "/ref/a.txt", 5, fp, now);
        let target = FileRecord::new("a.txt".into(), "/tgt/a.txt", 5, fp, now);

        let entry = DuplicateEntry::new(&reference, &target);
        assert_eq!(entry.target_path, PathBuf::from("/tgt/a.txt"));
        assert_eq!(entry.reference_path, PathBuf::from("/ref/a.txt"));
    }
}
