//! Removal of directories emptied by a deletion pass.
//!
//! Only ancestors of removed files are considered, so directories that were
//! already empty before the run are left alone. The target root itself is
//! never a candidate.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use refdedup_core::{DedupEvent, DedupWarning, RunMode};
use refdedup_scan::EventBus;

/// Result of a pruning pass.
#[derive(Debug, Default)]
pub struct PruneOutcome {
    /// Directories pruned (or that would be pruned), deepest first.
    pub pruned: Vec<PathBuf>,
    /// Directories that could not be removed.
    pub warnings: Vec<DedupWarning>,
}

/// Prune directories left empty by the removal of `removed`.
///
/// A directory is prunable when each of its children is either one of the
/// removed files or a directory pruned earlier in the same pass. In dry-run
/// mode the removals are simulated against the unchanged tree.
pub fn prune_emptied_dirs(
    removed: &[PathBuf],
    target_root: &Path,
    mode: RunMode,
    events: &EventBus,
) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();
    let removed_files: HashSet<&Path> = removed.iter().map(PathBuf::as_path).collect();
    let mut pruned: HashSet<PathBuf> = HashSet::new();

    for dir in candidate_dirs(removed, target_root) {
        let children = match fs::read_dir(&dir) {
            Ok(children) => children,
            Err(err) => {
                let warning = DedupWarning::prune_conflict(&dir, &err);
                warn!(path = %dir.display(), error = %err, "could not list directory");
                events.emit(DedupEvent::PruneFailed(warning.clone()));
                outcome.warnings.push(warning);
                continue;
            }
        };

        let mut empty = true;
        for child in children {
            let child = match child {
                Ok(child) => child.path(),
                Err(_) => {
                    empty = false;
                    break;
                }
            };
            if !removed_files.contains(child.as_path()) && !pruned.contains(&child) {
                empty = false;
                break;
            }
        }

        if !empty {
            debug!(path = %dir.display(), "directory still has content");
            continue;
        }

        if mode.is_dry_run() {
            debug!(path = %dir.display(), "would prune");
            events.emit(DedupEvent::WouldPrune { path: dir.clone() });
        } else {
            match fs::remove_dir(&dir) {
                Ok(()) => {
                    debug!(path = %dir.display(), "pruned");
                    events.emit(DedupEvent::Pruned { path: dir.clone() });
                }
                Err(err) => {
                    let warning = DedupWarning::prune_conflict(&dir, &err);
                    warn!(path = %dir.display(), error = %err, "could not prune directory");
                    events.emit(DedupEvent::PruneFailed(warning.clone()));
                    outcome.warnings.push(warning);
                    continue;
                }
            }
        }

        pruned.insert(dir.clone());
        outcome.pruned.push(dir);
    }

    info!(
        pruned = outcome.pruned.len(),
        conflicts = outcome.warnings.len(),
        "pruning complete"
    );

    outcome
}

/// Ancestors of `removed` strictly inside `target_root`, deepest first with
/// lexical order breaking ties.
fn candidate_dirs(removed: &[PathBuf], target_root: &Path) -> Vec<PathBuf> {
    let mut dirs = BTreeSet::new();

    for path in removed {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == target_root || !dir.starts_with(target_root) {
                break;
            }
            if !dirs.insert(dir.to_path_buf()) {
                break;
            }
            current = dir.parent();
        }
    }

    let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
    dirs.sort_by_key(|dir| Reverse(dir.components().count()));
    dirs
}
