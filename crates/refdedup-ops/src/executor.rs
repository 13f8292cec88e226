//! Deletion of confirmed duplicates from the target tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use refdedup_core::{
    DedupEvent, DedupWarning, DeleteMethod, DeletionResult, DuplicateEntry, ErrorKind, FileError,
    RunMode,
};
use refdedup_scan::{EventBus, EventReceiver};

use crate::prune::prune_emptied_dirs;

/// Everything the executor did to the target tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionReport {
    /// One result per processed entry, in processing order.
    pub results: Vec<DeletionResult>,
    /// Per-entry failures, in processing order.
    pub errors: Vec<FileError>,
    /// Prune conflicts.
    pub warnings: Vec<DedupWarning>,
    /// Directories pruned (or that would be pruned), deepest first.
    pub pruned_dirs: Vec<PathBuf>,
    /// Entries deleted or simulated.
    pub succeeded: u64,
    /// Bytes freed (or that would be freed).
    pub bytes_freed: u64,
}

impl DeletionReport {
    fn push(&mut self, result: DeletionResult) {
        if result.is_success() {
            self.succeeded += 1;
            self.bytes_freed += result.bytes_freed;
        }
        self.results.push(result);
    }

    /// Target paths that were deleted or simulated.
    pub fn removed_paths(&self) -> impl Iterator<Item = &Path> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.path.as_path())
    }

    /// Number of failed entries.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

/// Removes duplicate entries from the target tree.
///
/// This is the only place in the workspace that mutates the filesystem.
/// Entries are processed sequentially and a failure never stops the run.
pub struct DeletionExecutor {
    mode: RunMode,
    method: DeleteMethod,
    events: EventBus,
}

impl DeletionExecutor {
    /// Create an executor with its own event bus.
    pub fn new(mode: RunMode) -> Self {
        Self::with_events(mode, EventBus::new())
    }

    /// Create an executor that emits on an existing bus.
    pub fn with_events(mode: RunMode, events: EventBus) -> Self {
        Self {
            mode,
            method: DeleteMethod::Permanent,
            events,
        }
    }

    /// Set the removal method used in live mode.
    pub fn method(mut self, method: DeleteMethod) -> Self {
        self.method = method;
        self
    }

    /// Subscribe to deletion and pruning events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Delete every entry, then prune the directories the deletions emptied.
    pub fn process(&self, entries: &[DuplicateEntry], target_root: &Path) -> DeletionReport {
        let mut report = self.delete_all(entries, target_root);
        self.prune(&mut report, target_root);
        report
    }

    /// Delete (or simulate deleting) every entry in order.
    pub fn delete_all(&self, entries: &[DuplicateEntry], target_root: &Path) -> DeletionReport {
        let mut report = DeletionReport::default();

        for entry in entries {
            let result = self.delete_one(entry, target_root);
            if let Some(kind) = result.error {
                let error = match kind {
                    ErrorKind::OutsideTarget => FileError::new(
                        &entry.target_path,
                        kind,
                        format!("Refusing to delete outside {}", target_root.display()),
                    ),
                    _ => FileError::new(&entry.target_path, kind, kind.to_string()),
                };
                report.errors.push(error);
            }
            report.push(result);
        }

        info!(
            mode = %self.mode,
            succeeded = report.succeeded,
            failed = report.failed(),
            bytes = report.bytes_freed,
            "deletion pass complete"
        );

        report
    }

    /// Prune directories emptied by the entries recorded in `report`.
    pub fn prune(&self, report: &mut DeletionReport, target_root: &Path) {
        let removed: Vec<PathBuf> = report.removed_paths().map(Path::to_path_buf).collect();
        let outcome = prune_emptied_dirs(&removed, target_root, self.mode, &self.events);
        report.pruned_dirs = outcome.pruned;
        report.warnings.extend(outcome.warnings);
    }

    fn delete_one(&self, entry: &DuplicateEntry, target_root: &Path) -> DeletionResult {
        let path = &entry.target_path;

        if path == target_root || !path.starts_with(target_root) {
            warn!(path = %path.display(), root = %target_root.display(), "entry outside target tree");
            return self.fail(entry, ErrorKind::OutsideTarget, "outside target tree".into());
        }

        if self.mode.is_dry_run() {
            debug!(path = %path.display(), size = entry.size_bytes, "would delete");
            self.events.emit(DedupEvent::WouldDelete {
                path: path.clone(),
                reference: entry.reference_path.clone(),
                fingerprint: entry.fingerprint,
                size: entry.size_bytes,
            });
            return DeletionResult::simulated(entry);
        }

        if let Err(kind) = verify_unchanged(entry) {
            return self.fail(entry, kind, kind.to_string());
        }

        let removed = match self.method {
            DeleteMethod::Permanent => {
                fs::remove_file(path).map_err(|e| (ErrorKind::from_io(&e), e.to_string()))
            }
            DeleteMethod::Trash => trash::delete(path).map_err(|e| (ErrorKind::Io, e.to_string())),
        };

        match removed {
            Ok(()) => {
                debug!(path = %path.display(), size = entry.size_bytes, "deleted");
                self.events.emit(DedupEvent::Deleted {
                    path: path.clone(),
                    reference: entry.reference_path.clone(),
                    fingerprint: entry.fingerprint,
                    size: entry.size_bytes,
                });
                DeletionResult::deleted(entry)
            }
            Err((kind, message)) => self.fail(entry, kind, message),
        }
    }

    fn fail(&self, entry: &DuplicateEntry, kind: ErrorKind, message: String) -> DeletionResult {
        warn!(path = %entry.target_path.display(), %kind, %message, "delete failed");
        self.events.emit(DedupEvent::DeleteFailed {
            path: entry.target_path.clone(),
            kind,
            message,
        });
        DeletionResult::failed(entry, kind)
    }
}

/// Check that the target file still looks the way it did at scan time.
fn verify_unchanged(entry: &DuplicateEntry) -> Result<(), ErrorKind> {
    let metadata = fs::symlink_metadata(&entry.target_path).map_err(|e| ErrorKind::from_io(&e))?;

    if !metadata.is_file() || metadata.len() != entry.size_bytes {
        return Err(ErrorKind::Changed);
    }

    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
    if modified != entry.target_modified {
        return Err(ErrorKind::Changed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use refdedup_core::{FileRecord, Fingerprint};
    use tempfile::TempDir;

    fn entry_for(root: &Path, rel: &str, content: &[u8]) -> DuplicateEntry {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        let record = FileRecord::new(
            rel.into(),
            &path,
            content.len() as u64,
            Fingerprint::new([7; 32]),
            modified,
        );
        DuplicateEntry::new(&record, &record)
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let entry = entry_for(temp.path(), "a/x.txt", b"hello");

        let report = DeletionExecutor::new(RunMode::DryRun).process(&[entry.clone()], temp.path());

        assert!(entry.target_path.exists());
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.bytes_freed, 5);
        assert_eq!(report.pruned_dirs, vec![temp.path().join("a")]);
        assert!(temp.path().join("a").is_dir());
    }

    #[test]
    fn test_results_and_events_name_the_reference() {
        let temp = TempDir::new().unwrap();
        let target = entry_for(temp.path(), "tgt/x.txt", b"hello");
        let reference = FileRecord::new(
            "x.txt".into(),
            temp.path().join("ref/x.txt"),
            5,
            target.fingerprint,
            target.target_modified,
        );
        let target_record = FileRecord::new(
            "x.txt".into(),
            &target.target_path,
            5,
            target.fingerprint,
            target.target_modified,
        );
        let entry = DuplicateEntry::new(&reference, &target_record);

        let executor = DeletionExecutor::new(RunMode::DryRun);
        let mut rx = executor.subscribe();
        let report = executor.delete_all(&[entry], &temp.path().join("tgt"));

        assert_eq!(report.results[0].reference_path, temp.path().join("ref/x.txt"));
        assert_eq!(report.results[0].fingerprint, Fingerprint::new([7; 32]));
        match rx.try_recv().unwrap() {
            DedupEvent::WouldDelete {
                path,
                reference,
                fingerprint,
                size,
            } => {
                assert_eq!(path, temp.path().join("tgt/x.txt"));
                assert_eq!(reference, temp.path().join("ref/x.txt"));
                assert_eq!(fingerprint, Fingerprint::new([7; 32]));
                assert_eq!(size, 5);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_live_deletes_file() {
        let temp = TempDir::new().unwrap();
        let entry = entry_for(temp.path(), "x.txt", b"hello");

        let report = DeletionExecutor::new(RunMode::Live).delete_all(&[entry.clone()], temp.path());

        assert!(!entry.target_path.exists());
        assert_eq!(report.results[0].outcome, refdedup_core::DeletionOutcome::Deleted);
        assert_eq!(report.bytes_freed, 5);
    }

    #[test]
    fn test_outside_target_is_refused() {
        let temp = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let entry = entry_for(other.path(), "keep.txt", b"keep");

        let report = DeletionExecutor::new(RunMode::Live).delete_all(&[entry.clone()], temp.path());

        assert!(entry.target_path.exists());
        assert_eq!(report.results[0].error, Some(ErrorKind::OutsideTarget));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.bytes_freed, 0);
    }

    #[test]
    fn test_changed_file_is_kept() {
        let temp = TempDir::new().unwrap();
        let entry = entry_for(temp.path(), "x.txt", b"hello");
        fs::write(&entry.target_path, b"hello, changed").unwrap();

        let report = DeletionExecutor::new(RunMode::Live).delete_all(&[entry.clone()], temp.path());

        assert!(entry.target_path.exists());
        assert_eq!(report.results[0].error, Some(ErrorKind::Changed));
    }

    #[test]
    fn test_missing_file_fails_and_continues() {
        let temp = TempDir::new().unwrap();
        let gone = entry_for(temp.path(), "gone.txt", b"bye");
        let kept = entry_for(temp.path(), "next.txt", b"next");
        fs::remove_file(&gone.target_path).unwrap();

        let executor = DeletionExecutor::new(RunMode::Live);
        let mut rx = executor.subscribe();
        let report = executor.delete_all(&[gone, kept.clone()], temp.path());

        assert_eq!(report.results[0].error, Some(ErrorKind::NotFound));
        assert_eq!(report.results[1].outcome, refdedup_core::DeletionOutcome::Deleted);
        assert!(!kept.target_path.exists());

        let mut failed = 0;
        let mut deleted = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                DedupEvent::DeleteFailed { kind, .. } => {
                    assert_eq!(kind, ErrorKind::NotFound);
                    failed += 1;
                }
                DedupEvent::Deleted { size, .. } => {
                    assert_eq!(size, 4);
                    deleted += 1;
                }
                _ => {}
            }
        }
        assert_eq!((failed, deleted), (1, 1));
    }
}
