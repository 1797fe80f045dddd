//! Excess prepayment over the pre-pandemic baseline.

use super::scenario::predict_scenario;
use crate::error::Result;
use crate::logit::FittedModel;
use crate::score::PROBABILITY;
use crate::terms::TermSet;
use polars::prelude::*;
use prepay_panel::columns::{OCCUPANCY, PERIOD, STATE, Y};
use serde::{Deserialize, Serialize};
use std::fmt;

const GROUP: &str = "group";
const EXCESS: &str = "excess";
/// Label of rows whose group value is missing.
pub const MISSING_GROUP: &str = "missing";

/// Panel column an excess table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// Property state
    State,
    /// Occupancy type
    Occupancy,
    /// Reporting month
    Period,
}

impl GroupKey {
    /// Every grouping.
    pub const ALL: [Self; 3] = [Self::State, Self::Occupancy, Self::Period];

    /// Grouping column.
    pub const fn column(self) -> &'static str {
        match self {
            Self::State => STATE,
            Self::Occupancy => OCCUPANCY,
            Self::Period => PERIOD,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Excess of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessRow {
    /// Group value
    pub group: String,
    /// Rows in the group
    pub n_obs: usize,
    /// Group rows over all rows
    pub share: f64,
    /// Mean outcome
    pub observed_rate: f64,
    /// Mean baseline probability
    pub expected_rate: f64,
    /// Mean of `y - baseline probability`
    pub excess: f64,
}

/// Excess of every group plus the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessTable {
    /// Grouping
    pub key: GroupKey,
    /// Groups sorted by value
    pub rows: Vec<ExcessRow>,
    /// Rows scored
    pub n_obs: usize,
    /// Mean outcome over all rows
    pub observed_rate: f64,
    /// Mean baseline probability over all rows
    pub expected_rate: f64,
    /// Mean excess over all rows
    pub aggregate_excess: f64,
}

/// Excess of observed outcomes over `model`'s pre-pandemic terms, by group.
///
/// # Arguments
/// * `model` - Fitted model; only its non-pandemic terms are used
/// * `panel` - Rows to score, usually the pandemic window
/// * `key` - Grouping column
pub fn baseline_excess(
    model: &FittedModel,
    panel: &DataFrame,
    key: GroupKey,
) -> Result<ExcessTable> {
    let baseline = predict_scenario(model, panel, &TermSet::baseline())?;
    let scored = baseline
        .frame
        .lazy()
        .with_columns([
            col(key.column())
                .cast(DataType::String)
                .fill_null(lit(MISSING_GROUP))
                .alias(GROUP),
            (col(Y).cast(DataType::Float64) - col(PROBABILITY)).alias(EXCESS),
        ])
        .collect()?;

    let totals = scored
        .clone()
        .lazy()
        .select([
            col(Y).cast(DataType::Float64).mean().alias("observed_rate"),
            col(PROBABILITY).mean().alias("expected_rate"),
            col(EXCESS).mean().alias(EXCESS),
        ])
        .collect()?;
    let total_mean = |name: &str| -> Result<f64> {
        Ok(totals.column(name)?.f64()?.get(0).unwrap_or(f64::NAN))
    };

    let n_obs = scored.height();
    let grouped = scored
        .lazy()
        .group_by([col(GROUP)])
        .agg([
            len().cast(DataType::Int64).alias("n_obs"),
            col(Y).cast(DataType::Float64).mean().alias("observed_rate"),
            col(PROBABILITY).mean().alias("expected_rate"),
            col(EXCESS).mean().alias(EXCESS),
        ])
        .sort([GROUP], SortMultipleOptions::default())
        .collect()?;

    let groups = grouped.column(GROUP)?.str()?;
    let counts = grouped.column("n_obs")?.i64()?;
    let observed = grouped.column("observed_rate")?.f64()?;
    let expected = grouped.column("expected_rate")?.f64()?;
    let excess = grouped.column(EXCESS)?.f64()?;

    let mut rows = Vec::with_capacity(grouped.height());
    for i in 0..grouped.height() {
        let count = counts.get(i).and_then(|c| usize::try_from(c).ok()).unwrap_or(0);
        rows.push(ExcessRow {
            group: groups.get(i).unwrap_or(MISSING_GROUP).to_string(),
            n_obs: count,
            share: count as f64 / n_obs as f64,
            observed_rate: observed.get(i).unwrap_or(f64::NAN),
            expected_rate: expected.get(i).unwrap_or(f64::NAN),
            excess: excess.get(i).unwrap_or(f64::NAN),
        });
    }

    let table = ExcessTable {
        key,
        rows,
        n_obs,
        observed_rate: total_mean("observed_rate")?,
        expected_rate: total_mean("expected_rate")?,
        aggregate_excess: total_mean(EXCESS)?,
    };

    tracing::info!(
        model = %model.name,
        key = %key,
        groups = table.rows.len(),
        n_obs,
        aggregate_excess = table.aggregate_excess,
        "Computed baseline excess"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logit::logistic;
    use crate::terms::Term;
    use approx::assert_relative_eq;
    use prepay_panel::columns::COVID;

    fn window() -> DataFrame {
        df!(
            PERIOD => [202003i64, 202003, 202004, 202004, 202004],
            Y => [1i32, 0, 1, 1, 0],
            COVID => [1i32, 1, 1, 1, 1],
            STATE => [Some("CA"), Some("TX"), Some("CA"), None, Some("TX")],
        )
        .unwrap()
    }

    fn model() -> FittedModel {
        FittedModel::from_estimates("M2", &[(Term::Intercept, 0.0), (Term::Covid, 3.0)])
    }

    #[test]
    fn test_excess_uses_baseline_terms_only() {
        let table = baseline_excess(&model(), &window(), GroupKey::Period).unwrap();

        assert_eq!(table.n_obs, 5);
        assert_relative_eq!(table.expected_rate, logistic(0.0), epsilon = 1e-15);
        assert_relative_eq!(table.observed_rate, 0.6);
        assert_relative_eq!(table.aggregate_excess, 0.1, epsilon = 1e-12);

        assert_eq!(table.rows[0].group, "202003");
        assert_relative_eq!(table.rows[0].excess, 0.0, epsilon = 1e-12);
        assert_relative_eq!(table.rows[1].share, 0.6);
    }

    #[test]
    fn test_missing_group_values_get_their_own_row() {
        let table = baseline_excess(&model(), &window(), GroupKey::State).unwrap();
        let groups: Vec<&str> = table.rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["CA", "TX", MISSING_GROUP]);

        let shares: f64 = table.rows.iter().map(|r| r.share).sum();
        assert_relative_eq!(shares, 1.0, epsilon = 1e-12);
    }
}
