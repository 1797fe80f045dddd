//! Directory roles and artifact storage.
//!
//! Every artifact is written to a hidden temporary sibling and renamed into
//! place, so a failed write never leaves a partial file behind.

use crate::error::{DataError, Result};
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// File name of the loan-month panel artifact.
pub const PANEL_FILE: &str = "panel.parquet";

/// File name of the monthly aggregate series artifact.
pub const AGGREGATE_FILE: &str = "aggregate_series.csv";

/// Directory layout of a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Raw origination and performance files (read-only)
    pub raw_dir: PathBuf,
    /// Parse cache of raw files
    pub interim_dir: PathBuf,
    /// Panel and aggregate outputs
    pub processed_dir: PathBuf,
    /// Model and quantification tables
    pub results_dir: PathBuf,
    /// Weekly market rate CSV
    pub rate_file: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::under(Path::new("."))
    }
}

impl Layout {
    /// Conventional layout rooted at `root`.
    pub fn under(root: &Path) -> Self {
        let data = root.join("data");
        Self {
            raw_dir: data.join("raw"),
            interim_dir: data.join("interim"),
            processed_dir: data.join("processed"),
            results_dir: root.join("results"),
            rate_file: data.join("raw").join("MORTGAGE30US.csv"),
        }
    }

    /// Location of the panel artifact.
    pub fn panel_path(&self) -> PathBuf {
        self.processed_dir.join(PANEL_FILE)
    }

    /// Location of the aggregate series artifact.
    pub fn aggregate_path(&self) -> PathBuf {
        self.processed_dir.join(AGGREGATE_FILE)
    }

    /// Location of a results table.
    pub fn results_path(&self, file_name: &str) -> PathBuf {
        self.results_dir.join(file_name)
    }
}

/// Write a file through a temporary sibling and rename it into place.
pub fn atomic_write<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let tmp = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let written = File::create(&tmp)
        .map_err(DataError::from)
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all()?;
            Ok(())
        });

    if let Err(e) = written {
        std::fs::remove_file(&tmp).ok();
        return Err(e);
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Write a DataFrame as Parquet.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<()> {
    let mut df = df.clone();
    atomic_write(path, |file| {
        ParquetWriter::new(file).finish(&mut df)?;
        Ok(())
    })
}

/// Read a Parquet file into a DataFrame.
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}

/// Read-only access to the artifacts of a finished run.
#[derive(Debug, Clone)]
pub struct ArtifactReader {
    layout: Layout,
}

impl ArtifactReader {
    /// Create a reader over a layout.
    pub const fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// The layout being read.
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Load the loan-month panel.
    pub fn panel(&self) -> Result<DataFrame> {
        let path = self.layout.panel_path();
        require(&path, PANEL_FILE, "panel")?;
        read_parquet(&path)
    }

    /// Load the monthly aggregate series.
    pub fn aggregate<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let path = self.layout.aggregate_path();
        require(&path, AGGREGATE_FILE, "panel")?;
        read_csv_records(&path)
    }

    /// Load a table from the results directory.
    pub fn results_table<T: DeserializeOwned>(&self, file_name: &str) -> Result<Vec<T>> {
        let path = self.layout.results_path(file_name);
        require(&path, file_name, "fit")?;
        read_csv_records(&path)
    }
}

fn require(path: &Path, name: &str, stage: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DataError::MissingArtifact {
            name: name.to_string(),
            path: path.to_path_buf(),
            stage: stage.to_string(),
        })
    }
}

fn read_csv_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}
