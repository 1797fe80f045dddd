//! Parquet snapshots of parsed raw files.
//!
//! Each raw file is parsed once and its typed table written to the interim
//! directory. A snapshot is named by the file stem plus a digest of the
//! absolute source path, so same-named files in different directories never
//! share one. Snapshots are not invalidated automatically; clear them after
//! changing inputs.

use crate::error::Result;
use crate::layout::{read_parquet, write_parquet};
use polars::prelude::*;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const SNAPSHOT_EXTENSION: &str = "parquet";

/// Hex digits of the path digest kept in a snapshot name.
const DIGEST_LEN: usize = 16;

/// File-level memoization of parsed tables.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
    enabled: bool,
}

impl SnapshotCache {
    /// Cache rooted at the interim directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
        }
    }

    /// A cache that never reads or writes.
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    /// Whether the cache is active.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Snapshot location for a raw file.
    pub fn snapshot_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("snapshot");
        let absolute = std::path::absolute(source).unwrap_or_else(|_| source.to_path_buf());

        let mut hasher = Sha256::new();
        hasher.update(absolute.to_string_lossy().as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        self.dir.join(format!(
            "{stem}-{}.{SNAPSHOT_EXTENSION}",
            &digest[..DIGEST_LEN]
        ))
    }

    /// Load the snapshot for a raw file, if one exists.
    pub fn get(&self, source: &Path) -> Result<Option<DataFrame>> {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.snapshot_path(source);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "Reading parse snapshot");
        read_parquet(&path).map(Some)
    }

    /// Store the parsed table of a raw file.
    pub fn put(&self, source: &Path, df: &DataFrame) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.snapshot_path(source);
        write_parquet(df, &path)?;
        tracing::debug!(path = %path.display(), rows = df.height(), "Wrote parse snapshot");
        Ok(())
    }

    /// Delete every snapshot file. Other files in the directory are left
    /// alone and a missing directory is not an error.
    pub fn clear(&self) -> Result<()> {
        if !self.enabled || !self.dir.is_dir() {
            return Ok(());
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_snapshot = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION);
            if is_snapshot {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        tracing::debug!(dir = %self.dir.display(), removed, "Cleared parse snapshots");
        Ok(())
    }
}
