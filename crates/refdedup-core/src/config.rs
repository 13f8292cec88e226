//! Run configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Whether a run mutates the target tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Compute and report decisions without touching the filesystem.
    #[default]
    DryRun,
    /// Delete duplicates from the target tree.
    Live,
}

impl RunMode {
    /// Check if this is a dry run.
    pub fn is_dry_run(self) -> bool {
        matches!(self, RunMode::DryRun)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry run"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// How a live run removes files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeleteMethod {
    /// Unlink the file.
    #[default]
    Permanent,
    /// Move the file to the system trash.
    Trash,
}

/// Configuration for a dedup run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DedupConfig {
    /// Reference tree, never modified.
    pub reference_root: PathBuf,

    /// Tree to remove duplicates from.
    pub target_root: PathBuf,

    /// Dry run or live deletion.
    #[builder(default)]
    #[serde(default)]
    pub mode: RunMode,

    /// Emit per-file progress events.
    #[builder(default = "false")]
    #[serde(default)]
    pub verbose: bool,

    /// Number of hashing threads (0 = auto-detect, 1 = sequential).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Removal method for live runs.
    #[builder(default)]
    #[serde(default)]
    pub delete_method: DeleteMethod,

    /// Remove directories emptied by deletions.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub prune_empty_dirs: bool,
}

fn default_true() -> bool {
    true
}

impl DedupConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let reference = match self.reference_root {
            Some(ref root) if !root.as_os_str().is_empty() => root,
            Some(_) => return Err("Reference root cannot be empty".to_string()),
            None => return Err("Reference root is required".to_string()),
        };
        let target = match self.target_root {
            Some(ref root) if !root.as_os_str().is_empty() => root,
            Some(_) => return Err("Target root cannot be empty".to_string()),
            None => return Err("Target root is required".to_string()),
        };
        if reference == target {
            return Err("Reference and target roots must differ".to_string());
        }
        Ok(())
    }
}

impl DedupConfig {
    /// Create a new config builder.
    pub fn builder() -> DedupConfigBuilder {
        DedupConfigBuilder::default()
    }

    /// Create a dry-run config for a pair of trees.
    pub fn new(reference_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            reference_root: reference_root.into(),
            target_root: target_root.into(),
            mode: RunMode::DryRun,
            verbose: false,
            threads: 0,
            delete_method: DeleteMethod::Permanent,
            prune_empty_dirs: true,
        }
    }

    /// Switch to live mode.
    pub fn live(mut self) -> Self {
        self.mode = RunMode::Live;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DedupConfig::builder()
            .reference_root("/data/safe")
            .target_root("/data/clean")
            .threads(4usize)
            .mode(RunMode::Live)
            .build()
            .unwrap();

        assert_eq!(config.reference_root, PathBuf::from("/data/safe"));
        assert_eq!(config.threads, 4);
        assert_eq!(config.mode, RunMode::Live);
        assert!(config.prune_empty_dirs);
        assert_eq!(config.delete_method, DeleteMethod::Permanent);
    }

    #[test]
    fn test_config_defaults_to_dry_run() {
        let config = DedupConfig::new("/a", "/b");
        assert!(config.mode.is_dry_run());
        assert!(!config.live().mode.is_dry_run());
    }

    #[test]
    fn test_builder_rejects_missing_and_identical_roots() {
        assert!(DedupConfig::builder().target_root("/b").build().is_err());
        assert!(DedupConfig::builder()
            .reference_root("")
            .target_root("/b")
            .build()
            .is_err());
        assert!(DedupConfig::builder()
            .reference_root("/same")
            .target_root("/same")
            .build()
            .is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let json = r#"{"reference_root": "/a", "target_root": "/b"}"#;
        let config: DedupConfig = serde_json::from_str(json).unwrap();
        assert!(config.mode.is_dry_run());
        assert!(config.prune_empty_dirs);
    }
}
