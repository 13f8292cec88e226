//! Deletion engine and run orchestration for refdedup.
//!
//! [`DeletionExecutor`] removes confirmed duplicates from the target tree
//! and prunes the directories that end up empty. [`Deduplicator`] runs the
//! whole pipeline: scan both trees, match, confirm, delete.
//!
//! # Example
//!
//! ```rust,no_run
//! use refdedup_core::DedupConfig;
//! use refdedup_ops::{AlwaysConfirm, Deduplicator};
//!
//! let config = DedupConfig::new("/backup/photos", "/import/photos").live();
//! let summary = Deduplicator::new(config).run(AlwaysConfirm).unwrap();
//!
//! println!("{} duplicates removed", summary.files_deleted_or_simulated);
//! ```

mod executor;
mod pipeline;
mod prune;

pub use executor::{DeletionExecutor, DeletionReport};
pub use pipeline::{AlwaysConfirm, Confirm, ConfirmRequest, Deduplicator, NeverConfirm};
pub use prune::{prune_emptied_dirs, PruneOutcome};

pub use refdedup_scan::{EventBus, EventReceiver};
