//! Per-entry deletion results and the run summary.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RunMode;
use crate::error::{DedupWarning, ErrorKind, FileError};
use crate::record::{DuplicateEntry, Fingerprint, RelativePath};

/// What happened to one duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionOutcome {
    /// The file was removed.
    Deleted,
    /// Dry run: the file would have been removed.
    Simulated,
    /// Removal was attempted and failed.
    Failed,
}

/// Result of processing one duplicate entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionResult {
    /// Relative path of the duplicate.
    pub relative_path: RelativePath,
    /// Target path that was processed.
    pub path: PathBuf,
    /// Reference file the target duplicates.
    pub reference_path: PathBuf,
    /// Content fingerprint shared by both files.
    pub fingerprint: Fingerprint,
    /// Outcome.
    pub outcome: DeletionOutcome,
    /// Error kind when the outcome is `Failed`.
    pub error: Option<ErrorKind>,
    /// Bytes freed (or that would be freed).
    pub bytes_freed: u64,
}

impl DeletionResult {
    fn from_entry(
        entry: &DuplicateEntry,
        outcome: DeletionOutcome,
        error: Option<ErrorKind>,
    ) -> Self {
        Self {
            relative_path: entry.relative_path.clone(),
            path: entry.target_path.clone(),
            reference_path: entry.reference_path.clone(),
            fingerprint: entry.fingerprint,
            outcome,
            error,
            bytes_freed: if error.is_some() { 0 } else { entry.size_bytes },
        }
    }

    /// A successful removal.
    pub fn deleted(entry: &DuplicateEntry) -> Self {
        Self::from_entry(entry, DeletionOutcome::Deleted, None)
    }

    /// A simulated removal.
    pub fn simulated(entry: &DuplicateEntry) -> Self {
        Self::from_entry(entry, DeletionOutcome::Simulated, None)
    }

    /// A failed removal. Frees nothing.
    pub fn failed(entry: &DuplicateEntry, kind: ErrorKind) -> Self {
        Self::from_entry(entry, DeletionOutcome::Failed, Some(kind))
    }

    /// Check if the entry was deleted or simulated.
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, DeletionOutcome::Failed)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Duplicates were processed.
    Completed,
    /// No duplicates were found; nothing to do.
    NoDuplicates,
    /// Live deletion was declined at the confirmation gate.
    Declined,
}

/// Final record of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Mode the run executed in.
    pub mode: RunMode,
    /// How the run ended.
    pub status: RunStatus,
    /// Canonical reference root.
    pub reference_root: PathBuf,
    /// Canonical target root.
    pub target_root: PathBuf,
    /// Files indexed in the reference tree.
    pub files_scanned_reference: u64,
    /// Files indexed in the target tree.
    pub files_scanned_target: u64,
    /// Confirmed duplicates.
    pub duplicates_found: u64,
    /// Duplicates deleted (live) or simulated (dry run).
    pub files_deleted_or_simulated: u64,
    /// Bytes freed (or that would be freed).
    pub bytes_freed_total: u64,
    /// Per-file errors, in processing order.
    pub errors: Vec<FileError>,
    /// Warnings, in processing order.
    pub warnings: Vec<DedupWarning>,
    /// One result per processed duplicate.
    pub results: Vec<DeletionResult>,
    /// Directories pruned (or that would be pruned), deepest first.
    pub pruned_dirs: Vec<PathBuf>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RunSummary {
    /// Create an empty summary.
    pub fn new(mode: RunMode, reference_root: PathBuf, target_root: PathBuf) -> Self {
        Self {
            mode,
            status: RunStatus::Completed,
            reference_root,
            target_root,
            files_scanned_reference: 0,
            files_scanned_target: 0,
            duplicates_found: 0,
            files_deleted_or_simulated: 0,
            bytes_freed_total: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            results: Vec::new(),
            pruned_dirs: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Fold a deletion result into the totals.
    pub fn record(&mut self, result: DeletionResult) {
        if result.is_success() {
            self.files_deleted_or_simulated += 1;
            self.bytes_freed_total += result.bytes_freed;
        }
        self.results.push(result);
    }

    /// Check if any per-file errors were recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of failed deletions.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}
