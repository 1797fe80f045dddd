//! Loan-month panel construction.
//!
//! Steps run in a fixed order:
//! 1. restrict origination to the target loan term
//! 2. project performance to the needed columns
//! 3. inner-join performance to one origination row per loan
//! 4. left-join the monthly market rate on period
//! 5. derive the outcome and covariates
//! 6. drop rows missing an identity, outcome, incentive or age
//!
//! The inner join in step 3 defines the row universe: loans that appear in
//! only one source produce no rows.

use crate::columns::{
    CREDIT_SCORE, LOAN_AGE, LOAN_ID, LTV, MARKET_RATE, OCCUPANCY, ORIG_RATE, ORIG_TERM,
    PANEL_COLUMNS, PERIOD, PROPERTY_TYPE, REQUIRED_NON_NULL, STATE, ZERO_BALANCE_CODE,
    require_columns,
};
use crate::error::Result;
use crate::features::{DerivedColumn, apply_features, standard_features};
use polars::prelude::*;
use prepay_data::StudyConfig;
use serde::{Deserialize, Serialize};

/// Origination columns carried into the panel.
const LOAN_LEVEL_COLUMNS: [&str; 7] = [
    LOAN_ID,
    ORIG_RATE,
    CREDIT_SCORE,
    LTV,
    OCCUPANCY,
    STATE,
    PROPERTY_TYPE,
];

/// Performance columns carried into the panel.
const MONTHLY_COLUMNS: [&str; 4] = [LOAN_ID, PERIOD, LOAN_AGE, ZERO_BALANCE_CODE];

/// Row counts recorded at each step of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelBuildReport {
    /// Origination rows received
    pub origination_rows: usize,
    /// Origination rows left after the loan term restriction
    pub cohort_rows: usize,
    /// Distinct loans after collapsing to one row per loan
    pub cohort_loans: usize,
    /// Performance rows received
    pub performance_rows: usize,
    /// Rows surviving the inner join
    pub joined_rows: usize,
    /// Joined rows without a market rate for their period
    pub unmatched_rate_rows: usize,
    /// Rows dropped for missing required values
    pub dropped_rows: usize,
    /// Rows in the final panel
    pub panel_rows: usize,
}

/// The loan-month analytic table and how it was derived.
#[derive(Debug, Clone)]
pub struct Panel {
    /// One row per loan per reporting month
    pub frame: DataFrame,
    /// Row counts per build step
    pub report: PanelBuildReport,
}

/// Builds the loan-month panel.
#[derive(Debug)]
pub struct PanelBuilder {
    target_term: i64,
    features: Vec<Box<dyn DerivedColumn>>,
}

impl PanelBuilder {
    /// Builder for a study configuration.
    pub fn new(config: &StudyConfig) -> Self {
        Self {
            target_term: config.target_term,
            features: standard_features(config.covid),
        }
    }

    /// Join, derive and filter into a panel.
    ///
    /// Inputs are borrowed and never modified; every step produces a new table.
    pub fn build(
        &self,
        origination: &DataFrame,
        performance: &DataFrame,
        market_rates: &DataFrame,
    ) -> Result<Panel> {
        require_columns(origination, &LOAN_LEVEL_COLUMNS, "origination")?;
        require_columns(performance, &MONTHLY_COLUMNS, "performance")?;
        require_columns(market_rates, &[PERIOD, MARKET_RATE], "market rate")?;

        let mut report = PanelBuildReport {
            origination_rows: origination.height(),
            performance_rows: performance.height(),
            ..Default::default()
        };

        // Step 1
        let cohort = self.restrict_term(origination)?;
        report.cohort_rows = cohort.height();
        let loans = loan_level(&cohort)?;
        report.cohort_loans = loans.height();
        tracing::info!(
            before = report.origination_rows,
            after = report.cohort_rows,
            loans = report.cohort_loans,
            target_term = self.target_term,
            "Restricted origination to target term"
        );
        if report.cohort_loans < report.cohort_rows {
            tracing::warn!(
                duplicates = report.cohort_rows - report.cohort_loans,
                "Origination contains repeated loan ids; keeping the first record"
            );
        }

        // Steps 2 and 3
        let monthly = performance
            .clone()
            .lazy()
            .select(MONTHLY_COLUMNS.map(col));
        let joined = monthly
            .join(
                loans.lazy(),
                [col(LOAN_ID)],
                [col(LOAN_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .collect()?;
        report.joined_rows = joined.height();
        tracing::info!(
            performance_rows = report.performance_rows,
            joined_rows = report.joined_rows,
            "Joined performance to origination"
        );

        // Step 4
        let rates = market_rates
            .clone()
            .lazy()
            .select([col(PERIOD), col(MARKET_RATE)]);
        let with_rates = joined
            .lazy()
            .join(
                rates,
                [col(PERIOD)],
                [col(PERIOD)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;
        report.unmatched_rate_rows = with_rates.column(MARKET_RATE)?.null_count();
        if report.unmatched_rate_rows > 0 {
            tracing::warn!(
                rows = report.unmatched_rate_rows,
                "Rows without a market rate for their period"
            );
        }

        // Steps 5 and 6
        let derived = apply_features(with_rates.lazy(), &self.features).collect()?;
        let frame = derived
            .lazy()
            .filter(complete_rows())
            .select(PANEL_COLUMNS.map(col))
            .sort([LOAN_ID, PERIOD], SortMultipleOptions::default())
            .collect()?;

        report.panel_rows = frame.height();
        report.dropped_rows = report.joined_rows - report.panel_rows;
        tracing::info!(
            before = report.joined_rows,
            after = report.panel_rows,
            dropped = report.dropped_rows,
            "Dropped rows with missing required values"
        );

        Ok(Panel { frame, report })
    }

    /// Keep loans with the target term.
    ///
    /// A missing or entirely null term column leaves the table unchanged.
    fn restrict_term(&self, origination: &DataFrame) -> Result<DataFrame> {
        match origination.column(ORIG_TERM) {
            Ok(term) if term.null_count() < term.len() => Ok(origination
                .clone()
                .lazy()
                .filter(col(ORIG_TERM).eq(lit(self.target_term)))
                .collect()?),
            _ => {
                tracing::info!("No loan term available; skipping term restriction");
                Ok(origination.clone())
            }
        }
    }
}

/// Build a panel with the standard derived columns.
pub fn build_panel(
    origination: &DataFrame,
    performance: &DataFrame,
    market_rates: &DataFrame,
    config: &StudyConfig,
) -> Result<Panel> {
    PanelBuilder::new(config).build(origination, performance, market_rates)
}

/// One row per loan id with the first record's static attributes.
fn loan_level(origination: &DataFrame) -> Result<DataFrame> {
    let attributes: Vec<Expr> = LOAN_LEVEL_COLUMNS[1..]
        .iter()
        .map(|name| col(*name).first())
        .collect();

    Ok(origination
        .clone()
        .lazy()
        .select(LOAN_LEVEL_COLUMNS.map(col))
        .group_by_stable([col(LOAN_ID)])
        .agg(attributes)
        .collect()?)
}

fn complete_rows() -> Expr {
    REQUIRED_NON_NULL
        .iter()
        .map(|name| col(*name).is_not_null())
        .reduce(|acc, e| acc.and(e))
        .unwrap_or_else(|| lit(true))
}
