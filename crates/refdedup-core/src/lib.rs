//! Core types for refdedup.
//!
//! This crate provides the data model shared by the scanner, the matcher and
//! the deletion executor: file records and fingerprints, tree indices, run
//! configuration, errors, events and the final run summary.

mod config;
mod error;
mod event;
mod index;
mod record;
mod summary;

pub use config::{DedupConfig, DedupConfigBuilder, DeleteMethod, RunMode};
pub use error::{DedupError, DedupWarning, ErrorKind, FileError, WarningKind};
pub use event::{DedupEvent, RunState};
pub use index::TreeIndex;
pub use record::{DuplicateEntry, FileRecord, Fingerprint, RelativePath, TreeRole};
pub use summary::{DeletionOutcome, DeletionResult, RunStatus, RunSummary};
