//! Market mortgage rate series.
//!
//! The external series is weekly; the panel needs one rate per calendar
//! month, so weekly observations are averaged within each `YYYYMM` period.

use crate::error::{DataError, Result};
use crate::schema::fields;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::path::Path;

/// One weekly observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyRate {
    /// Observation date
    pub date: NaiveDate,
    /// Rate in percent; `None` when the source marks the week as missing
    pub rate: Option<f64>,
}

impl WeeklyRate {
    /// Calendar month of the observation as `YYYYMM`.
    pub fn period(&self) -> i64 {
        i64::from(self.date.year()) * 100 + i64::from(self.date.month())
    }
}

/// Read a weekly rate CSV with a header row, a `YYYY-MM-DD` date column and a
/// rate column. Cells holding `.` or nothing are treated as missing.
pub fn read_weekly_rates(path: &Path) -> Result<Vec<WeeklyRate>> {
    if !path.is_file() {
        return Err(DataError::MissingInput {
            kind: "market rate".to_string(),
            searched: path.display().to_string(),
            convention: "a weekly CSV with a date column and a rate column".to_string(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut rates = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let (Some(date), Some(rate)) = (record.get(0), record.get(1)) else {
            return Err(DataError::Parse(format!(
                "{}: row {} has fewer than two columns",
                path.display(),
                line + 2
            )));
        };

        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
            DataError::Parse(format!(
                "{}: row {}: bad date `{date}`: {e}",
                path.display(),
                line + 2
            ))
        })?;

        rates.push(WeeklyRate {
            date,
            rate: parse_rate(rate),
        });
    }

    Ok(rates)
}

fn parse_rate(cell: &str) -> Option<f64> {
    match cell.trim() {
        "" | "." => None,
        value => value.parse().ok(),
    }
}

/// Average weekly observations to one row per month, sorted by period.
///
/// Missing weeks are skipped; a month with no observed week gets a null rate.
pub fn monthly_average(weekly: &[WeeklyRate]) -> Result<DataFrame> {
    let periods: Vec<i64> = weekly.iter().map(WeeklyRate::period).collect();
    let rates: Vec<Option<f64>> = weekly.iter().map(|w| w.rate).collect();

    let df = DataFrame::new(vec![
        Column::new(fields::PERIOD.into(), periods),
        Column::new(fields::MARKET_RATE.into(), rates),
    ])?;

    let monthly = df
        .lazy()
        .group_by([col(fields::PERIOD)])
        .agg([col(fields::MARKET_RATE).mean()])
        .sort([fields::PERIOD], SortMultipleOptions::default())
        .collect()?;

    Ok(monthly)
}

/// Read the weekly series and average it to months.
pub fn load_monthly_rates(path: &Path) -> Result<DataFrame> {
    let weekly = read_weekly_rates(path)?;
    let monthly = monthly_average(&weekly)?;
    tracing::info!(weeks = weekly.len(), months = monthly.height(), "Loaded market rate series");
    Ok(monthly)
}
