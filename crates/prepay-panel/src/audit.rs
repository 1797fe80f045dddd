//! Load-time checks on performance records.
//!
//! Panel construction assumes a loan stops reporting after its first
//! zero-balance code. This audit measures how often the assumption fails so
//! the run log shows it; offending rows are not removed.

use crate::columns::{LOAN_ID, PERIOD, ZERO_BALANCE_CODE, require_columns};
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const EXIT_PERIOD: &str = "exit_period";
const EXIT_ROWS: &str = "exit_rows";

/// Exit-code anomalies in a performance table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceAudit {
    /// Loans with at least one zero-balance code
    pub exited_loans: usize,
    /// Loans with more than one zero-balance record
    pub repeated_exit_loans: usize,
    /// Loans reporting again after their first exit
    pub post_exit_loans: usize,
    /// Rows reported after a loan's first exit
    pub post_exit_rows: usize,
}

impl PerformanceAudit {
    /// Whether every loan stops at its first exit.
    pub const fn is_clean(&self) -> bool {
        self.repeated_exit_loans == 0 && self.post_exit_rows == 0
    }
}

/// Count loans that keep reporting after their first zero-balance code.
pub fn audit_performance(performance: &DataFrame) -> Result<PerformanceAudit> {
    require_columns(performance, &[LOAN_ID, PERIOD, ZERO_BALANCE_CODE], "performance")?;

    let exits = performance
        .clone()
        .lazy()
        .filter(col(ZERO_BALANCE_CODE).is_not_null())
        .group_by([col(LOAN_ID)])
        .agg([
            col(PERIOD).min().alias(EXIT_PERIOD),
            len().alias(EXIT_ROWS),
        ])
        .collect()?;

    let exit_summary = exits
        .clone()
        .lazy()
        .select([
            len().cast(DataType::Int64).alias("loans"),
            col(EXIT_ROWS)
                .gt(lit(1))
                .cast(DataType::Int64)
                .sum()
                .alias("repeated"),
        ])
        .collect()?;

    let post_exit = performance
        .clone()
        .lazy()
        .select([col(LOAN_ID), col(PERIOD)])
        .join(
            exits.lazy().select([col(LOAN_ID), col(EXIT_PERIOD)]),
            [col(LOAN_ID)],
            [col(LOAN_ID)],
            JoinArgs::new(JoinType::Inner),
        )
        .filter(col(PERIOD).gt(col(EXIT_PERIOD)))
        .select([
            len().cast(DataType::Int64).alias("rows"),
            col(LOAN_ID).n_unique().cast(DataType::Int64).alias("loans"),
        ])
        .collect()?;

    let audit = PerformanceAudit {
        exited_loans: count(&exit_summary, "loans")?,
        repeated_exit_loans: count(&exit_summary, "repeated")?,
        post_exit_loans: count(&post_exit, "loans")?,
        post_exit_rows: count(&post_exit, "rows")?,
    };

    if audit.is_clean() {
        tracing::info!(exited_loans = audit.exited_loans, "Performance exits are terminal");
    } else {
        tracing::warn!(
            exited_loans = audit.exited_loans,
            repeated_exit_loans = audit.repeated_exit_loans,
            post_exit_loans = audit.post_exit_loans,
            post_exit_rows = audit.post_exit_rows,
            "Loans report after their first zero-balance code"
        );
    }

    Ok(audit)
}

fn count(df: &DataFrame, name: &str) -> Result<usize> {
    let value = df.column(name)?.i64()?.get(0).unwrap_or(0);
    Ok(usize::try_from(value).unwrap_or(0))
}
