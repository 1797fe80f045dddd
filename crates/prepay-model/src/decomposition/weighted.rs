//! Share-weighted attribution of the aggregate excess.
//!
//! With `w_g` the share of rows in group `g`, the aggregate excess is
//! `Σ w_g · excess_g`. Each group's contribution is its term of that sum and
//! its deviation is how far its own excess sits from the aggregate. The
//! residual `aggregate - Σ contribution` is zero up to rounding.

use super::excess::{ExcessTable, GroupKey};
use serde::{Deserialize, Serialize};

/// One group's share of the aggregate excess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionRow {
    /// Group value
    pub group: String,
    /// Share of rows
    pub weight: f64,
    /// Group mean excess
    pub excess: f64,
    /// `weight * excess`
    pub contribution: f64,
    /// `excess - aggregate`
    pub deviation: f64,
    /// `weight * deviation`
    pub weighted_deviation: f64,
}

/// Attribution of the aggregate excess across groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    /// Grouping
    pub key: GroupKey,
    /// Per-group rows
    pub rows: Vec<DecompositionRow>,
    /// Mean excess over all rows
    pub aggregate_excess: f64,
    /// Sum of contributions
    pub total_contribution: f64,
    /// `aggregate_excess - total_contribution`
    pub residual: f64,
}

/// Decompose an excess table.
pub fn weighted_decomposition(table: &ExcessTable) -> Decomposition {
    let aggregate = table.aggregate_excess;
    let rows: Vec<DecompositionRow> = table
        .rows
        .iter()
        .map(|row| {
            let deviation = row.excess - aggregate;
            DecompositionRow {
                group: row.group.clone(),
                weight: row.share,
                excess: row.excess,
                contribution: row.share * row.excess,
                deviation,
                weighted_deviation: row.share * deviation,
            }
        })
        .collect();

    let total_contribution: f64 = rows.iter().map(|r| r.contribution).sum();
    let residual = aggregate - total_contribution;
    if residual.abs() > 1e-9 {
        tracing::warn!(
            key = %table.key,
            residual,
            "Group contributions do not sum to the aggregate"
        );
    }

    Decomposition {
        key: table.key,
        rows,
        aggregate_excess: aggregate,
        total_contribution,
        residual,
    }
}
