//! Error types for panel construction.

use prepay_data::DataError;
use thiserror::Error;

/// Result type for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors that can occur while building or aggregating the panel.
#[derive(Debug, Error)]
pub enum PanelError {
    /// An input table lacks a column the stage needs
    #[error("Missing column `{column}` in {table} table")]
    MissingColumn {
        /// Column name
        column: String,
        /// Table being processed
        table: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Data layer error
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}
