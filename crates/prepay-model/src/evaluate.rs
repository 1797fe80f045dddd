//! Out-of-sample evaluation.

use crate::design::column_values;
use crate::error::{ModelError, Result};
use crate::logit::FittedModel;
use crate::score::{PROBABILITY, predict};
use crate::split::Sample;
use polars::prelude::*;
use prepay_data::SplitConfig;
use prepay_panel::columns::{PERIOD, Y};
use serde::{Deserialize, Serialize};

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logs.
pub const EPSILON: f64 = 1e-15;

/// Log loss of one model on one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Model name
    pub model: String,
    /// Sample scored
    pub sample: Sample,
    /// Rows scored
    pub n_obs: usize,
    /// Mean negative log-likelihood
    pub log_loss: f64,
}

/// Observed and predicted prepayment rates for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRow {
    /// Model name
    pub model: String,
    /// Sample scored
    pub sample: Sample,
    /// Reporting month
    pub period: i64,
    /// Rows scored in the period
    pub n_obs: usize,
    /// Share of rows with `y = 1`
    pub observed_rate: f64,
    /// Mean predicted probability
    pub predicted_rate: f64,
}

/// Mean binary cross-entropy with clipped probabilities.
///
/// Returns NaN for empty input.
pub fn log_loss(y: &[f64], p: &[f64]) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    let total: f64 = y
        .iter()
        .zip(p)
        .map(|(&yi, &pi)| {
            let pi = pi.clamp(EPSILON, 1.0 - EPSILON);
            -(yi * pi.ln() + (1.0 - yi) * (1.0 - pi).ln())
        })
        .sum();
    total / y.len() as f64
}

fn scored_sample(
    model: &FittedModel,
    panel: &DataFrame,
    sample: Sample,
    splits: &SplitConfig,
) -> Result<DataFrame> {
    let rows = sample.select(panel, splits)?;
    if rows.height() == 0 {
        return Err(ModelError::EmptySample(sample.label().to_string()));
    }
    let scored = predict(model, &rows, &model.terms(), sample.label())?;
    if scored.height() == 0 {
        return Err(ModelError::EmptySample(sample.label().to_string()));
    }
    Ok(scored)
}

/// Log loss of `model` on one sample of the panel.
pub fn evaluate(
    model: &FittedModel,
    panel: &DataFrame,
    sample: Sample,
    splits: &SplitConfig,
) -> Result<Evaluation> {
    let scored = scored_sample(model, panel, sample, splits)?;
    let y = column_values(&scored, Y)?;
    let p = column_values(&scored, PROBABILITY)?;
    let loss = log_loss(&y, &p);

    tracing::info!(
        model = %model.name,
        sample = %sample,
        n_obs = y.len(),
        log_loss = loss,
        "Evaluated model"
    );

    Ok(Evaluation {
        model: model.name.clone(),
        sample,
        n_obs: y.len(),
        log_loss: loss,
    })
}

/// Per-period observed rate against mean predicted probability.
pub fn calibration(
    model: &FittedModel,
    panel: &DataFrame,
    sample: Sample,
    splits: &SplitConfig,
) -> Result<Vec<CalibrationRow>> {
    let scored = scored_sample(model, panel, sample, splits)?;
    let by_period = scored
        .lazy()
        .group_by([col(PERIOD)])
        .agg([
            len().cast(DataType::Int64).alias("n_obs"),
            col(Y).cast(DataType::Float64).mean().alias("observed_rate"),
            col(PROBABILITY).mean().alias("predicted_rate"),
        ])
        .sort([PERIOD], SortMultipleOptions::default())
        .collect()?;

    let periods = by_period.column(PERIOD)?.i64()?;
    let counts = by_period.column("n_obs")?.i64()?;
    let observed = by_period.column("observed_rate")?.f64()?;
    let predicted = by_period.column("predicted_rate")?.f64()?;

    Ok((0..by_period.height())
        .filter_map(|i| {
            Some(CalibrationRow {
                model: model.name.clone(),
                sample,
                period: periods.get(i)?,
                n_obs: usize::try_from(counts.get(i)?).ok()?,
                observed_rate: observed.get(i)?,
                predicted_rate: predicted.get(i)?,
            })
        })
        .collect())
}
