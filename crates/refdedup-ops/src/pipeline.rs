//! End-to-end orchestration of a dedup run.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use refdedup_analyze::DuplicateMatcher;
use refdedup_core::{
    DedupConfig, DedupError, DedupEvent, RunMode, RunState, RunStatus, RunSummary, TreeRole,
};
use refdedup_scan::{resolve_root, EventBus, EventReceiver, TreeScanner};

use crate::executor::{DeletionExecutor, DeletionReport};

/// What a live run is about to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmRequest {
    /// Number of duplicates that will be deleted.
    pub duplicates: usize,
    /// Total size of those duplicates.
    pub bytes: u64,
}

/// Gate consulted once before a live run deletes anything.
pub trait Confirm {
    /// Return `true` to proceed with deletion.
    fn confirm(&mut self, request: &ConfirmRequest) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&ConfirmRequest) -> bool,
{
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        self(request)
    }
}

/// Approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
        true
    }
}

/// Declines every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
        false
    }
}

/// Drives scanning, matching and deletion for one pair of trees.
pub struct Deduplicator {
    config: DedupConfig,
    events: EventBus,
}

impl Deduplicator {
    /// Create a deduplicator for a resolved configuration.
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            events: EventBus::new(),
        }
    }

    /// The configuration this run uses.
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Subscribe to every event of the run.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Execute the run.
    ///
    /// Fatal errors are only returned before the first scan completes;
    /// everything after that is recorded in the summary. `confirm` is
    /// consulted once in live mode, and only when duplicates exist.
    pub fn run(&self, mut confirm: impl Confirm) -> Result<RunSummary, DedupError> {
        let start = Instant::now();
        let mut state = RunState::Idle;

        let (reference_root, target_root) = self.resolve_roots()?;
        info!(
            reference = %reference_root.display(),
            target = %target_root.display(),
            mode = %self.config.mode,
            "starting run"
        );

        let scanner = TreeScanner::with_events(self.events.clone())
            .threads(self.config.threads)
            .per_file_events(self.config.verbose);

        self.enter(&mut state, RunState::ScanningReference);
        let reference = scanner.scan(&reference_root, TreeRole::Reference)?;

        self.enter(&mut state, RunState::ScanningTarget);
        let target = scanner.scan(&target_root, TreeRole::Target)?;

        self.enter(&mut state, RunState::Matching);
        let matched = DuplicateMatcher::with_events(self.events.clone()).analyze(&reference, &target);

        let mut summary = RunSummary::new(self.config.mode, reference_root, target_root.clone());
        summary.files_scanned_reference = reference.len() as u64;
        summary.files_scanned_target = target.len() as u64;
        summary.duplicates_found = matched.len() as u64;
        summary.errors.extend(reference.errors);
        summary.errors.extend(target.errors);
        summary.warnings.extend(reference.warnings);
        summary.warnings.extend(target.warnings);

        let executor = DeletionExecutor::with_events(self.config.mode, self.events.clone())
            .method(self.config.delete_method);

        if !matched.has_duplicates() {
            summary.status = RunStatus::NoDuplicates;
        } else {
            match self.config.mode {
                RunMode::DryRun => {
                    self.enter(&mut state, RunState::DryRunReporting);
                    let mut report = executor.delete_all(&matched.entries, &target_root);
                    if self.config.prune_empty_dirs {
                        executor.prune(&mut report, &target_root);
                    }
                    merge(&mut summary, report);
                }
                RunMode::Live => {
                    self.enter(&mut state, RunState::AwaitingConfirmation);
                    let request = ConfirmRequest {
                        duplicates: matched.len(),
                        bytes: matched.total_bytes,
                    };

                    if confirm.confirm(&request) {
                        self.enter(&mut state, RunState::LiveDeleting);
                        let mut report = executor.delete_all(&matched.entries, &target_root);
                        if self.config.prune_empty_dirs {
                            self.enter(&mut state, RunState::Pruning);
                            executor.prune(&mut report, &target_root);
                        }
                        merge(&mut summary, report);
                    } else {
                        info!("deletion declined");
                        summary.status = RunStatus::Declined;
                    }
                }
            }
        }

        self.enter(&mut state, RunState::Done);
        summary.duration = start.elapsed();

        info!(
            status = ?summary.status,
            duplicates = summary.duplicates_found,
            removed = summary.files_deleted_or_simulated,
            bytes = summary.bytes_freed_total,
            errors = summary.errors.len(),
            "run complete"
        );

        Ok(summary)
    }

    /// Canonicalize both roots and reject identical or nested pairs.
    fn resolve_roots(&self) -> Result<(PathBuf, PathBuf), DedupError> {
        let reference = resolve_root(&self.config.reference_root)?;
        let target = resolve_root(&self.config.target_root)?;

        if reference == target {
            return Err(DedupError::SameDirectory { path: target });
        }
        if reference.starts_with(&target) || target.starts_with(&reference) {
            return Err(DedupError::OverlappingRoots { reference, target });
        }

        Ok((reference, target))
    }

    fn enter(&self, state: &mut RunState, next: RunState) {
        debug_assert!(state.can_transition_to(next), "{state} -> {next}");
        debug!(from = %state, to = %next, "state change");
        *state = next;
        self.events.emit(DedupEvent::StateChanged(next));
    }
}

fn merge(summary: &mut RunSummary, report: DeletionReport) {
    summary.errors.extend(report.errors);
    summary.warnings.extend(report.warnings);
    summary.pruned_dirs = report.pruned_dirs;
    for result in report.results {
        summary.record(result);
    }
}
