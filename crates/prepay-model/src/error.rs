//! Error types for model fitting and decomposition.

use prepay_panel::PanelError;
use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while fitting, testing or decomposing models.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Design matrix does not have full column rank
    #[error("Rank-deficient design: {0}")]
    RankDeficient(String),

    /// A column the model needs is absent from the table
    #[error("Missing column `{column}` in {sample} sample")]
    MissingColumn {
        /// Column name
        column: String,
        /// Sample being fit or scored
        sample: String,
    },

    /// A column the model needs has no observed values
    #[error("Column `{column}` is entirely missing in {sample} sample")]
    AllMissing {
        /// Column name
        column: String,
        /// Sample being fit or scored
        sample: String,
    },

    /// No rows to fit or score
    #[error("Empty {0} sample")]
    EmptySample(String),

    /// Likelihood-ratio test across different samples
    #[error(
        "Models {small} (n = {small_n}) and {large} (n = {large_n}) were fit on different samples"
    )]
    SampleMismatch {
        /// Restricted model
        small: String,
        /// Observations in the restricted model
        small_n: usize,
        /// Full model
        large: String,
        /// Observations in the full model
        large_n: usize,
    },

    /// Likelihood-ratio test between models that do not nest
    #[error("Model {small} is not nested in {large}")]
    NotNested {
        /// Restricted model
        small: String,
        /// Full model
        large: String,
    },

    /// Unrecognized coefficient label
    #[error("Unknown term label `{0}`")]
    UnknownTerm(String),

    /// Reference distribution could not be constructed
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Panel error
    #[error("Panel error: {0}")]
    Panel(#[from] PanelError),
}
