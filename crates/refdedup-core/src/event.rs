//! Run states and observer events.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DedupWarning, ErrorKind};
use crate::record::{Fingerprint, RelativePath, TreeRole};

/// Phase of a dedup run.
///
/// `Idle → ScanningReference → ScanningTarget → Matching →
/// (DryRunReporting | AwaitingConfirmation → LiveDeleting → Pruning) → Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    ScanningReference,
    ScanningTarget,
    Matching,
    DryRunReporting,
    AwaitingConfirmation,
    LiveDeleting,
    Pruning,
    Done,
}

impl RunState {
    /// Check if a transition from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, ScanningReference)
                | (ScanningReference, ScanningTarget)
                | (ScanningTarget, Matching)
                | (Matching, DryRunReporting)
                | (Matching, AwaitingConfirmation)
                | (Matching, Done)
                | (DryRunReporting, Done)
                | (AwaitingConfirmation, LiveDeleting)
                | (AwaitingConfirmation, Done)
                | (LiveDeleting, Pruning)
                | (LiveDeleting, Done)
                | (Pruning, Done)
        )
    }

    /// Check if this is the terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ScanningReference => "scanning reference",
            Self::ScanningTarget => "scanning target",
            Self::Matching => "matching",
            Self::DryRunReporting => "dry-run reporting",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::LiveDeleting => "deleting",
            Self::Pruning => "pruning",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Observational event emitted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DedupEvent {
    /// The run moved to a new phase.
    StateChanged(RunState),
    /// A file was hashed and indexed.
    FileScanned {
        role: TreeRole,
        path: PathBuf,
        count: u64,
    },
    /// A tree scan finished.
    ScanCompleted {
        role: TreeRole,
        files: u64,
        errors: u64,
    },
    /// A duplicate pair was confirmed.
    DuplicateFound {
        relative_path: RelativePath,
        size: u64,
    },
    /// Dry run: the file would be deleted.
    WouldDelete {
        path: PathBuf,
        reference: PathBuf,
        fingerprint: Fingerprint,
        size: u64,
    },
    /// The file was deleted.
    Deleted {
        path: PathBuf,
        reference: PathBuf,
        fingerprint: Fingerprint,
        size: u64,
    },
    /// Deleting the file failed.
    DeleteFailed {
        path: PathBuf,
        kind: ErrorKind,
        message: String,
    },
    /// Dry run: the directory would be pruned.
    WouldPrune { path: PathBuf },
    /// The directory was pruned.
    Pruned { path: PathBuf },
    /// Pruning the directory failed.
    PruneFailed(DedupWarning),
    /// A non-fatal condition, such as a relative path collision.
    Warning(DedupWarning),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_path_transitions() {
        use RunState::*;
        let path = [
            Idle,
            ScanningReference,
            ScanningTarget,
            Matching,
            AwaitingConfirmation,
            LiveDeleting,
            Pruning,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_matching_cannot_be_skipped() {
        assert!(!RunState::ScanningTarget.can_transition_to(RunState::LiveDeleting));
        assert!(!RunState::ScanningTarget.can_transition_to(RunState::DryRunReporting));
        assert!(!RunState::Done.can_transition_to(RunState::Idle));
        assert!(RunState::Done.is_terminal());
    }
}
