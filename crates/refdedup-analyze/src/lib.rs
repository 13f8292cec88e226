//! Duplicate matching for refdedup.
//!
//! Intersects a reference [`TreeIndex`] with a target [`TreeIndex`] and
//! yields the target files that duplicate a reference file by both relative
//! path and content fingerprint.
//!
//! ```rust,ignore
//! use refdedup_analyze::DuplicateMatcher;
//! use refdedup_scan::{TreeRole, TreeScanner};
//!
//! let scanner = TreeScanner::new();
//! let reference = scanner.scan("/safe".as_ref(), TreeRole::Reference).unwrap();
//! let target = scanner.scan("/clean".as_ref(), TreeRole::Target).unwrap();
//!
//! let report = DuplicateMatcher::new().analyze(&reference, &target);
//! println!("{} duplicates, {} bytes", report.len(), report.total_bytes);
//! ```

mod matcher;

pub use matcher::{DuplicateMatcher, MatchReport};

// Re-export core types
pub use refdedup_core::{DuplicateEntry, TreeIndex};
