//! Input manifest.
//!
//! The loader only ever sees an explicit list of `(kind, path)` pairs.
//! [`Manifest::discover`] is the acquisition-side helper that builds such a
//! list from file naming conventions.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of raw record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// One row per loan
    Origination,
    /// One row per loan per reporting month
    Performance,
}

impl FileKind {
    /// Name fragments that identify this kind in a file name.
    pub const fn markers(&self) -> &'static [&'static str] {
        match self {
            Self::Origination => &["orig"],
            Self::Performance => &["svcg", "perf", "_time_"],
        }
    }

    /// Whether a file name follows this kind's naming convention.
    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        lower.ends_with(".txt") && self.markers().iter().any(|m| lower.contains(m))
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origination => write!(f, "origination"),
            Self::Performance => write!(f, "performance"),
        }
    }
}

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Record kind
    pub kind: FileKind,
    /// File location
    pub path: PathBuf,
}

/// Explicit list of raw input files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    searched: Vec<PathBuf>,
}

impl Manifest {
    /// Create a manifest from explicit entries.
    pub const fn new(entries: Vec<ManifestEntry>) -> Self {
        Self {
            entries,
            searched: Vec::new(),
        }
    }

    /// Add a file.
    pub fn push(&mut self, kind: FileKind, path: impl Into<PathBuf>) {
        self.entries.push(ManifestEntry {
            kind,
            path: path.into(),
        });
    }

    /// Build a manifest by scanning directories for conventionally named files.
    ///
    /// Directories that do not exist are skipped. Files are listed in path
    /// order so cohort years concatenate deterministically.
    pub fn discover(search_dirs: &[PathBuf]) -> Result<Self> {
        let mut entries = Vec::new();

        for dir in search_dirs.iter().filter(|d| d.is_dir()) {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            paths.sort();

            for path in paths {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                // Origination markers are checked first; "orig" never appears in
                // servicing file names.
                if FileKind::Origination.matches(name) {
                    entries.push(ManifestEntry {
                        kind: FileKind::Origination,
                        path,
                    });
                } else if FileKind::Performance.matches(name) {
                    entries.push(ManifestEntry {
                        kind: FileKind::Performance,
                        path,
                    });
                }
            }
        }

        Ok(Self {
            entries,
            searched: search_dirs.to_vec(),
        })
    }

    /// Files of one kind, in manifest order.
    pub fn files(&self, kind: FileKind) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.path.as_path())
            .collect()
    }

    /// All entries.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Fail unless at least one file of the kind is listed.
    pub fn require(&self, kind: FileKind) -> Result<Vec<&Path>> {
        let files = self.files(kind);
        if files.is_empty() {
            let searched = if self.searched.is_empty() {
                "explicit manifest".to_string()
            } else {
                self.searched
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(DataError::MissingInput {
                kind: kind.to_string(),
                searched,
                convention: format!(
                    "pipe-delimited `.txt` files whose names contain {}",
                    kind.markers()
                        .iter()
                        .map(|m| format!("`{m}`"))
                        .collect::<Vec<_>>()
                        .join(" or ")
                ),
            });
        }
        Ok(files)
    }
}
