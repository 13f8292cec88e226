//! Path-keyed duplicate matching.
//!
//! A target file is a duplicate only when the reference tree holds a file at
//! the same relative path with the same fingerprint. Equal content at a
//! different path never matches, and neither does a different content at
//! the same path.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use refdedup_core::{DedupEvent, DuplicateEntry, TreeIndex, TreeRole};
use refdedup_scan::{EventBus, EventReceiver};

/// Results of matching a reference index against a target index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchReport {
    /// Confirmed duplicates in lexical order of relative path.
    pub entries: Vec<DuplicateEntry>,

    /// Total size of the matched target files.
    pub total_bytes: u64,

    /// Target paths with no counterpart in the reference tree.
    pub only_in_target: u64,

    /// Paths present on both sides whose content differs.
    pub content_differs: u64,
}

impl MatchReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of duplicates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the report is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Intersects a reference index with a target index.
pub struct DuplicateMatcher {
    events: EventBus,
}

impl DuplicateMatcher {
    /// Create a new matcher with its own event bus.
    pub fn new() -> Self {
        Self::with_events(EventBus::new())
    }

    /// Create a matcher that emits on an existing bus.
    pub fn with_events(events: EventBus) -> Self {
        Self { events }
    }

    /// Subscribe to `DuplicateFound` events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Confirmed duplicates in lexical order of relative path.
    pub fn match_trees(&self, reference: &TreeIndex, target: &TreeIndex) -> Vec<DuplicateEntry> {
        self.analyze(reference, target).entries
    }

    /// Match two indices and collect statistics.
    ///
    /// The indices must be a reference and a target index, in that order;
    /// anything else yields an empty report.
    pub fn analyze(&self, reference: &TreeIndex, target: &TreeIndex) -> MatchReport {
        let mut report = MatchReport::default();

        if reference.role != TreeRole::Reference || target.role != TreeRole::Target {
            error!(
                reference = %reference.role,
                target = %target.role,
                "refusing to match indices with unexpected roles"
            );
            return report;
        }

        for target_record in target.iter() {
            let Some(reference_record) = reference.get(&target_record.relative_path) else {
                report.only_in_target += 1;
                continue;
            };

            if reference_record.fingerprint != target_record.fingerprint {
                debug!(path = %target_record.relative_path, "same path, different content");
                report.content_differs += 1;
                continue;
            }

            let entry = DuplicateEntry::new(reference_record, target_record);
            debug!(path = %entry.relative_path, size = entry.size_bytes, "duplicate");
            self.events.emit(DedupEvent::DuplicateFound {
                relative_path: entry.relative_path.clone(),
                size: entry.size_bytes,
            });

            report.total_bytes += entry.size_bytes;
            report.entries.push(entry);
        }

        info!(
            duplicates = report.entries.len(),
            bytes = report.total_bytes,
            only_in_target = report.only_in_target,
            content_differs = report.content_differs,
            "matching complete"
        );

        report
    }
}

impl Default for DuplicateMatcher {
    fn default() -> Self {
        Self::new()
    }
}
