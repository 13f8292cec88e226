//! JWalk-based tree scanner.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use refdedup_core::{
    DedupError, DedupEvent, DedupWarning, ErrorKind, FileError, FileRecord, Fingerprint,
    RelativePath, TreeIndex, TreeRole,
};

use crate::hasher::{fingerprint, HashError};
use crate::progress::{EventBus, EventReceiver};

/// Walks a directory tree and fingerprints every regular file in it.
///
/// Symbolic links are never followed. Symlinks, devices, sockets and FIFOs
/// are counted as skipped.
pub struct TreeScanner {
    events: EventBus,
    threads: usize,
    per_file_events: bool,
}

impl TreeScanner {
    /// Create a new scanner with its own event bus.
    pub fn new() -> Self {
        Self::with_events(EventBus::new())
    }

    /// Create a scanner that emits on an existing bus.
    pub fn with_events(events: EventBus) -> Self {
        Self {
            events,
            threads: 0,
            per_file_events: false,
        }
    }

    /// Number of hashing threads (0 = auto-detect, 1 = sequential).
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Emit a `FileScanned` event for every indexed file.
    pub fn per_file_events(mut self, enabled: bool) -> Self {
        self.per_file_events = enabled;
        self
    }

    /// Subscribe to scan events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Scan the tree rooted at `root`.
    ///
    /// Fails only if the root is missing or not a directory. Per-file
    /// failures land in [`TreeIndex::errors`].
    pub fn scan(&self, root: &Path, role: TreeRole) -> Result<TreeIndex, DedupError> {
        let start = Instant::now();
        let root_path = resolve_root(root)?;

        info!(%role, root = %root_path.display(), "scanning tree");

        let mut index = TreeIndex::new(role, &root_path);
        let candidates = self.collect_candidates(&root_path, &mut index);
        let hashed = self.hash_candidates(role, candidates);

        for (candidate, result) in hashed {
            match result {
                Ok(fingerprint) => {
                    let record = FileRecord::new(
                        candidate.relative_path,
                        &candidate.path,
                        candidate.size,
                        fingerprint,
                        candidate.modified,
                    );
                    let relative = record.relative_path.clone();
                    if index.insert(record).is_some() {
                        warn!(path = %candidate.path.display(), %relative, "relative path collision, keeping later entry");
                        let warning = DedupWarning::path_collision(&candidate.path, relative.as_str());
                        self.events.emit(DedupEvent::Warning(warning.clone()));
                        index.warnings.push(warning);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "could not fingerprint file");
                    index.errors.push(err.to_file_error());
                }
            }
        }

        index.scan_duration = start.elapsed();

        info!(
            %role,
            files = index.len(),
            errors = index.errors.len(),
            skipped = index.skipped,
            elapsed_ms = index.scan_duration.as_millis() as u64,
            "scan complete"
        );

        self.events.emit(DedupEvent::ScanCompleted {
            role,
            files: index.len() as u64,
            errors: index.errors.len() as u64,
        });

        Ok(index)
    }

    /// Walk the tree and collect regular files in walk order.
    fn collect_candidates(&self, root_path: &Path, index: &mut TreeIndex) -> Vec<Candidate> {
        let parallelism = match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(root_path)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true);

        let mut candidates = Vec::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root_path.to_path_buf());
                    let error = match err.io_error() {
                        Some(io) => FileError::io(path, io),
                        None => FileError::new(path, ErrorKind::Io, err.to_string()),
                    };
                    warn!(error = %error, "walk error");
                    index.errors.push(error);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let path = entry.path();
            if !file_type.is_file() {
                debug!(path = %path.display(), "skipping non-regular file");
                index.skipped += 1;
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    let error = match err.io_error() {
                        Some(io) => FileError::io(&path, io),
                        None => FileError::new(&path, ErrorKind::Io, err.to_string()),
                    };
                    warn!(error = %error, "metadata error");
                    index.errors.push(error);
                    continue;
                }
            };

            let Ok(relative) = path.strip_prefix(root_path) else {
                continue;
            };
            let Some(relative_path) = RelativePath::from_path(relative) else {
                let error = FileError::new(
                    &path,
                    ErrorKind::InvalidName,
                    "File name is not valid UTF-8; not indexed",
                );
                warn!(error = %error, "undecodable file name");
                index.errors.push(error);
                continue;
            };

            candidates.push(Candidate {
                relative_path,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
                path,
            });
        }

        candidates
    }

    /// Fingerprint candidates, preserving their order.
    fn hash_candidates(
        &self,
        role: TreeRole,
        candidates: Vec<Candidate>,
    ) -> Vec<(Candidate, Result<Fingerprint, HashError>)> {
        let counter = AtomicU64::new(0);

        let hash_one = |candidate: Candidate| {
            let result = fingerprint(&candidate.path);
            if result.is_ok() {
                let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(path = %candidate.path.display(), count, "hashed");
                if self.per_file_events {
                    self.events.emit(DedupEvent::FileScanned {
                        role,
                        path: candidate.path.clone(),
                        count,
                    });
                }
            }
            (candidate, result)
        };

        match self.threads {
            1 => candidates.into_iter().map(&hash_one).collect(),
            0 => candidates.into_par_iter().map(&hash_one).collect(),
            n => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(|| candidates.into_par_iter().map(&hash_one).collect()),
                Err(err) => {
                    warn!(error = %err, "could not build hashing pool, hashing sequentially");
                    candidates.into_iter().map(&hash_one).collect()
                }
            },
        }
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonicalize a root and check that it is a directory.
pub fn resolve_root(root: &Path) -> Result<PathBuf, DedupError> {
    let root_path = root.canonicalize().map_err(|e| DedupError::io(root, e))?;
    if !root_path.is_dir() {
        return Err(DedupError::NotADirectory { path: root_path });
    }
    Ok(root_path)
}

/// A regular file discovered by the walk, not yet hashed.
struct Candidate {
    relative_path: RelativePath,
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}
