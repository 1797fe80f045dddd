//! Column names of the loan-month panel.

pub use prepay_data::fields::{
    CREDIT_SCORE, LOAN_AGE, LOAN_ID, LTV, MARKET_RATE, OCCUPANCY, ORIG_RATE, ORIG_TERM, PERIOD,
    PROPERTY_TYPE, STATE, ZERO_BALANCE_CODE,
};

use crate::error::{PanelError, Result};
use polars::prelude::*;

/// Prepayment event indicator
pub const Y: &str = "y";
/// Original rate minus market rate
pub const INCENTIVE: &str = "incentive";
/// Pandemic window indicator
pub const COVID: &str = "covid";
/// `covid * incentive` with missing incentive counted as zero
pub const COVID_INCENTIVE: &str = "covid_incentive";
/// Loan age category
pub const AGE_BUCKET: &str = "age_bucket";

/// Columns a panel row may not be missing.
pub const REQUIRED_NON_NULL: [&str; 5] = [LOAN_ID, PERIOD, Y, INCENTIVE, LOAN_AGE];

/// Output schema of the panel, in column order.
pub const PANEL_COLUMNS: [&str; 16] = [
    LOAN_ID,
    PERIOD,
    LOAN_AGE,
    Y,
    ZERO_BALANCE_CODE,
    ORIG_RATE,
    MARKET_RATE,
    INCENTIVE,
    COVID,
    COVID_INCENTIVE,
    CREDIT_SCORE,
    LTV,
    OCCUPANCY,
    STATE,
    PROPERTY_TYPE,
    AGE_BUCKET,
];

/// Fail with the first column of `required` that `df` does not have.
pub fn require_columns(df: &DataFrame, required: &[&str], table: &str) -> Result<()> {
    match required.iter().copied().find(|name| df.column(name).is_err()) {
        Some(missing) => Err(PanelError::MissingColumn {
            column: missing.to_string(),
            table: table.to_string(),
        }),
        None => Ok(()),
    }
}
