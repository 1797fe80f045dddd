//! With-bias against without-bias predictions.

use super::scenario::predict_scenario;
use crate::error::Result;
use crate::logit::FittedModel;
use crate::terms::Term;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Pandemic shifts in seasoning and credit sensitivity.
pub const BEHAVIORAL_TERMS: [Term; 2] = [Term::CovidLoanAge, Term::CovidCreditScore];

/// Predicted rates with and without the excluded terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualRow {
    /// Reporting month; `None` for the whole window
    pub period: Option<i64>,
    /// Rows scored
    pub n_obs: usize,
    /// Mean probability with every term
    pub with_bias: f64,
    /// Mean probability without the excluded terms
    pub without_bias: f64,
    /// `with_bias - without_bias`
    pub difference: f64,
    /// `100 * difference / with_bias`; `None` when `with_bias` is zero
    pub relative_pct: Option<f64>,
}

impl CounterfactualRow {
    fn new(period: Option<i64>, n_obs: usize, with_bias: f64, without_bias: f64) -> Self {
        let difference = with_bias - without_bias;
        Self {
            period,
            n_obs,
            with_bias,
            without_bias,
            difference,
            relative_pct: (with_bias != 0.0).then(|| 100.0 * difference / with_bias),
        }
    }
}

/// Counterfactual comparison over a sub-panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterfactual {
    /// Model scored
    pub model: String,
    /// Terms removed in the without-bias scenario
    pub excluded: Vec<Term>,
    /// Per-period rows, ascending
    pub periods: Vec<CounterfactualRow>,
    /// Whole sub-panel
    pub overall: CounterfactualRow,
}

impl Counterfactual {
    /// Per-period rows followed by the overall row.
    pub fn rows(&self) -> Vec<CounterfactualRow> {
        let mut rows = self.periods.clone();
        rows.push(self.overall.clone());
        rows
    }
}

/// Compare predictions of `model` on `panel` with and without `excluded`.
pub fn counterfactual(
    model: &FittedModel,
    panel: &DataFrame,
    excluded: &[Term],
) -> Result<Counterfactual> {
    let all_terms = model.terms();
    let with_bias = predict_scenario(model, panel, &all_terms)?;
    let without_bias = predict_scenario(model, panel, &all_terms.without(excluded))?;

    // Both scenarios score the same complete cases, so months line up.
    let periods = with_bias
        .monthly
        .iter()
        .zip(&without_bias.monthly)
        .map(|(w, wo)| CounterfactualRow::new(Some(w.period), w.n_obs, w.rate, wo.rate))
        .collect();

    let overall = CounterfactualRow::new(
        None,
        with_bias.frame.height(),
        with_bias.overall_rate,
        without_bias.overall_rate,
    );

    tracing::info!(
        model = %model.name,
        with_bias = overall.with_bias,
        without_bias = overall.without_bias,
        difference = overall.difference,
        "Counterfactual prediction"
    );

    Ok(Counterfactual {
        model: model.name.clone(),
        excluded: excluded.to_vec(),
        periods,
        overall,
    })
}
