//! Monthly macro series derived from the panel.

use crate::columns::{INCENTIVE, MARKET_RATE, PERIOD, Y, require_columns};
use crate::error::{PanelError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const PREPAY_COUNT: &str = "prepay_count";
const ALIVE_COUNT: &str = "alive_count";
const AVG_INCENTIVE: &str = "avg_incentive";

/// One month of the aggregate series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSeriesRow {
    /// Reporting month as `YYYYMM`
    pub period: i64,
    /// Loans prepaying in the month
    pub prepay_count: i64,
    /// Loans observed in the month
    pub alive_count: i64,
    /// First non-missing market rate of the month
    pub market_rate: Option<f64>,
    /// Mean of non-missing incentives
    pub avg_incentive: Option<f64>,
    /// `prepay_count / alive_count`
    pub prepay_rate: f64,
}

/// Collapse the panel to one row per period, ascending.
pub fn aggregate(panel: &DataFrame) -> Result<Vec<AggregateSeriesRow>> {
    require_columns(panel, &[PERIOD, Y, MARKET_RATE, INCENTIVE], "panel")?;

    let grouped = panel
        .clone()
        .lazy()
        .group_by([col(PERIOD)])
        .agg([
            col(Y).cast(DataType::Int64).sum().alias(PREPAY_COUNT),
            len().cast(DataType::Int64).alias(ALIVE_COUNT),
            col(MARKET_RATE)
                .filter(col(MARKET_RATE).is_not_null())
                .first()
                .alias(MARKET_RATE),
            col(INCENTIVE).mean().alias(AVG_INCENTIVE),
        ])
        .sort([PERIOD], SortMultipleOptions::default())
        .collect()?;

    let periods = grouped.column(PERIOD)?.i64()?;
    let prepay = grouped.column(PREPAY_COUNT)?.i64()?;
    let alive = grouped.column(ALIVE_COUNT)?.i64()?;
    let rates = grouped.column(MARKET_RATE)?.f64()?;
    let incentives = grouped.column(AVG_INCENTIVE)?.f64()?;

    let mut rows = Vec::with_capacity(grouped.height());
    for i in 0..grouped.height() {
        let period = periods.get(i).ok_or_else(|| PanelError::MissingColumn {
            column: PERIOD.to_string(),
            table: "aggregate".to_string(),
        })?;
        let prepay_count = prepay.get(i).unwrap_or(0);
        let alive_count = alive.get(i).unwrap_or(0);
        rows.push(AggregateSeriesRow {
            period,
            prepay_count,
            alive_count,
            market_rate: rates.get(i),
            avg_incentive: incentives.get(i),
            prepay_rate: prepay_count as f64 / alive_count as f64,
        });
    }

    tracing::info!(periods = rows.len(), "Aggregated panel to monthly series");
    Ok(rows)
}
