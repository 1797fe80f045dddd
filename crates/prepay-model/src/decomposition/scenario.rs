//! Predictions under a subset of a model's terms.

use crate::error::{ModelError, Result};
use crate::logit::FittedModel;
use crate::score::{PROBABILITY, predict};
use crate::terms::TermSet;
use polars::prelude::*;
use prepay_panel::columns::PERIOD;
use serde::{Deserialize, Serialize};

/// Mean predicted probability in one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRate {
    /// Reporting month
    pub period: i64,
    /// Rows scored
    pub n_obs: usize,
    /// Mean predicted probability
    pub rate: f64,
}

/// Row-level and monthly predictions of one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioPrediction {
    /// Scored rows with a probability column
    pub frame: DataFrame,
    /// Monthly mean probabilities, ascending by period
    pub monthly: Vec<PeriodRate>,
    /// Mean probability over every scored row
    pub overall_rate: f64,
}

/// Score `panel` with the terms of `model` in `terms`.
pub fn predict_scenario(
    model: &FittedModel,
    panel: &DataFrame,
    terms: &TermSet,
) -> Result<ScenarioPrediction> {
    let frame = predict(model, panel, terms, "scenario")?;
    if frame.height() == 0 {
        return Err(ModelError::EmptySample("scenario".to_string()));
    }

    let overall_rate = frame.column(PROBABILITY)?.f64()?.mean().unwrap_or(f64::NAN);
    let monthly = monthly_rates(&frame)?;
    Ok(ScenarioPrediction {
        frame,
        monthly,
        overall_rate,
    })
}

fn monthly_rates(scored: &DataFrame) -> Result<Vec<PeriodRate>> {
    let grouped = scored
        .clone()
        .lazy()
        .group_by([col(PERIOD)])
        .agg([
            len().cast(DataType::Int64).alias("n_obs"),
            col(PROBABILITY).mean().alias("rate"),
        ])
        .sort([PERIOD], SortMultipleOptions::default())
        .collect()?;

    let periods = grouped.column(PERIOD)?.i64()?;
    let counts = grouped.column("n_obs")?.i64()?;
    let rates = grouped.column("rate")?.f64()?;

    Ok(periods
        .into_iter()
        .zip(counts)
        .zip(rates)
        .filter_map(|((period, n), rate)| {
            Some(PeriodRate {
                period: period?,
                n_obs: usize::try_from(n?).ok()?,
                rate: rate?,
            })
        })
        .collect())
}
