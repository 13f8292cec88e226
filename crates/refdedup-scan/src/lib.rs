//! Tree scanning engine for refdedup.
//!
//! This crate walks a directory tree with jwalk and fingerprints every
//! regular file with BLAKE3, producing a [`TreeIndex`] keyed by normalized
//! relative path.
//!
//! # Overview
//!
//! - **Streaming hashing** in fixed-size chunks, so memory stays flat for
//!   arbitrarily large files
//! - **Parallel hashing** via rayon, with deterministic index contents
//! - **Events** via a broadcast channel
//! - **Read-only**: nothing in this crate writes to the filesystem
//!
//! # Example
//!
//! ```rust,no_run
//! use refdedup_scan::{TreeRole, TreeScanner};
//!
//! let scanner = TreeScanner::new();
//! let index = scanner.scan("/path/to/tree".as_ref(), TreeRole::Reference).unwrap();
//!
//! println!("Indexed {} files", index.len());
//! println!("{} unreadable", index.errors.len());
//! ```

mod hasher;
mod progress;
mod scanner;

pub use hasher::{fingerprint, fingerprint_bytes, fingerprint_reader, HashError, CHUNK_SIZE};
pub use progress::{EventBus, EventReceiver, EVENT_CHANNEL_SIZE};
pub use scanner::{resolve_root, TreeScanner};

// Re-export core types for convenience
pub use refdedup_core::{
    DedupError, DedupEvent, FileError, FileRecord, Fingerprint, RelativePath, TreeIndex, TreeRole,
};
