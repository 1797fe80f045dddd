//! Flat rows of the result tables.
//!
//! Each record is one CSV row; the same types deserialize back through
//! `ArtifactReader::results_table`.

use prepay_model::{
    Counterfactual, Decomposition, Evaluation, FittedModel, NestedFit, Term,
    nested::Specification,
};
use serde::{Deserialize, Serialize};

/// `coefficients.csv`
pub const COEFFICIENTS_FILE: &str = "coefficients.csv";
/// `metrics.csv`
pub const METRICS_FILE: &str = "metrics.csv";
/// `lr_tests.csv`
pub const LR_TESTS_FILE: &str = "lr_tests.csv";
/// `counterfactual.csv`
pub const COUNTERFACTUAL_FILE: &str = "counterfactual.csv";
/// `calibration.csv`
pub const CALIBRATION_FILE: &str = "calibration.csv";
/// `panel_report.json`
pub const PANEL_REPORT_FILE: &str = "panel_report.json";

/// `excess_by_<group>.csv`
pub fn excess_file(group: &str) -> String {
    format!("excess_by_{group}.csv")
}

/// `decomposition_<group>.csv`
pub fn decomposition_file(group: &str) -> String {
    format!("decomposition_{group}.csv")
}

/// One coefficient of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRecord {
    /// Model name
    pub model: String,
    /// Regressor
    pub term: Term,
    /// Point estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: f64,
    /// Lower 95% bound
    pub ci_lower: f64,
    /// Upper 95% bound
    pub ci_upper: f64,
}

impl CoefficientRecord {
    /// Rows for every coefficient of `model`.
    pub fn from_model(model: &FittedModel) -> Vec<Self> {
        model
            .coefficients
            .iter()
            .map(|c| Self {
                model: model.name.clone(),
                term: c.term,
                estimate: c.estimate,
                std_error: c.std_error,
                ci_lower: c.ci_lower,
                ci_upper: c.ci_upper,
            })
            .collect()
    }
}

/// One named statistic of one model on one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Model name
    pub model: String,
    /// Sample the statistic refers to
    pub sample: String,
    /// Statistic name
    pub metric: String,
    /// Value
    pub value: f64,
}

impl MetricRecord {
    fn new(model: &str, sample: &str, metric: &str, value: f64) -> Self {
        Self {
            model: model.to_string(),
            sample: sample.to_string(),
            metric: metric.to_string(),
            value,
        }
    }

    /// In-sample fit statistics of `model`, estimated on `sample`.
    pub fn fit_statistics(model: &FittedModel, sample: &str) -> Vec<Self> {
        let name = model.name.as_str();
        vec![
            Self::new(name, sample, "log_likelihood", model.log_likelihood),
            Self::new(name, sample, "deviance", model.deviance),
            Self::new(name, sample, "n_obs", model.n_obs as f64),
            Self::new(name, sample, "iterations", model.iterations as f64),
            Self::new(name, sample, "converged", if model.converged { 1.0 } else { 0.0 }),
        ]
    }

    /// Log loss of one evaluation.
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        Self::new(
            &evaluation.model,
            evaluation.sample.label(),
            "log_loss",
            evaluation.log_loss,
        )
    }

    /// Fit statistics of every nested model followed by the evaluations.
    pub fn from_nested(nested: &NestedFit, evaluations: &[Evaluation]) -> Vec<Self> {
        let mut rows = Vec::new();
        for spec in Specification::ALL {
            rows.extend(Self::fit_statistics(nested.model(spec), spec.sample().label()));
        }
        rows.extend(Self::fit_statistics(
            &nested.m0_refit,
            prepay_model::Sample::TrainValidation.label(),
        ));
        rows.extend(evaluations.iter().map(Self::from_evaluation));
        rows
    }
}

/// One row of the counterfactual table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualRecord {
    /// Model scored
    pub model: String,
    /// Reporting month; empty for the whole window
    pub period: Option<i64>,
    /// Rows scored
    pub n_obs: usize,
    /// Mean probability with every term
    pub with_bias: f64,
    /// Mean probability without the behavioral terms
    pub without_bias: f64,
    /// `with_bias - without_bias`
    pub difference: f64,
    /// Difference relative to `with_bias`, in percent
    pub relative_pct: Option<f64>,
}

impl CounterfactualRecord {
    /// Per-period rows followed by the overall row.
    pub fn from_counterfactual(counterfactual: &Counterfactual) -> Vec<Self> {
        counterfactual
            .rows()
            .into_iter()
            .map(|row| Self {
                model: counterfactual.model.clone(),
                period: row.period,
                n_obs: row.n_obs,
                with_bias: row.with_bias,
                without_bias: row.without_bias,
                difference: row.difference,
                relative_pct: row.relative_pct,
            })
            .collect()
    }
}

/// One group of a weighted decomposition with the table totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionRecord {
    /// Group value
    pub group: String,
    /// Share of rows
    pub weight: f64,
    /// Group mean excess
    pub excess: f64,
    /// `weight * excess`
    pub contribution: f64,
    /// `excess - aggregate_excess`
    pub deviation: f64,
    /// `weight * deviation`
    pub weighted_deviation: f64,
    /// Mean excess over all rows
    pub aggregate_excess: f64,
    /// `aggregate_excess - Σ contribution`
    pub residual: f64,
}

impl DecompositionRecord {
    /// One row per group.
    pub fn from_decomposition(decomposition: &Decomposition) -> Vec<Self> {
        decomposition
            .rows
            .iter()
            .map(|row| Self {
                group: row.group.clone(),
                weight: row.weight,
                excess: row.excess,
                contribution: row.contribution,
                deviation: row.deviation,
                weighted_deviation: row.weighted_deviation,
                aggregate_excess: decomposition.aggregate_excess,
                residual: decomposition.residual,
            })
            .collect()
    }
}
