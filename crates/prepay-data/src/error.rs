//! Error types for data operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading raw records or reading artifacts.
#[derive(Debug, Error)]
pub enum DataError {
    /// No input file of a required kind was found.
    #[error("No {kind} input found. Searched: [{searched}]. Expected {convention}")]
    MissingInput {
        /// Record kind that is missing
        kind: String,
        /// Directories that were searched
        searched: String,
        /// File naming convention that was expected
        convention: String,
    },

    /// A stage was invoked before its upstream artifact exists.
    #[error("Missing artifact {name} at {}; run the {stage} stage first", path.display())]
    MissingArtifact {
        /// Artifact name
        name: String,
        /// Expected location
        path: PathBuf,
        /// Stage that produces the artifact
        stage: String,
    },

    /// A requested field is not present in the column layout or table.
    #[error("Missing column `{column}` in {table}")]
    MissingColumn {
        /// Column name
        column: String,
        /// Table being read
        table: String,
    },

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
