//! Predicted probabilities.

use crate::design::{column_values, complete_cases};
use crate::error::Result;
use crate::logit::{FittedModel, logistic};
use crate::terms::TermSet;
use polars::prelude::*;

/// Predicted prepayment probability column.
pub const PROBABILITY: &str = "probability";

const LINEAR_PREDICTOR: &str = "linear_predictor";

/// Score the complete cases of `panel` with the terms of `model` in `terms`.
///
/// Model terms outside `terms` are left out of the linear predictor. A term
/// in `terms` the model lacks contributes zero and is logged. Rows are the
/// complete cases of the full model, so every scenario of one model scores
/// the same rows.
pub fn predict(
    model: &FittedModel,
    panel: &DataFrame,
    terms: &TermSet,
    sample: &str,
) -> Result<DataFrame> {
    let model_terms = model.terms();
    for term in terms.iter().filter(|t| !model_terms.contains(*t)) {
        tracing::warn!(
            model = %model.name,
            term = %term,
            "Requested term is not in the model; it contributes zero"
        );
    }

    let eta = model
        .coefficients
        .iter()
        .filter(|c| terms.contains(c.term))
        .fold(lit(0.0), |acc, c| match c.term.column() {
            Some(name) => acc + lit(c.estimate) * col(name).cast(DataType::Float64),
            None => acc + lit(c.estimate),
        });

    let complete = complete_cases(panel, &model_terms, sample)?;
    let scored = complete
        .lazy()
        .with_column(eta.cast(DataType::Float64).alias(LINEAR_PREDICTOR))
        .collect()?;

    let probabilities: Vec<f64> = column_values(&scored, LINEAR_PREDICTOR)?
        .into_iter()
        .map(logistic)
        .collect();

    let mut scored = scored.drop(LINEAR_PREDICTOR)?;
    scored.with_column(Column::new(PROBABILITY.into(), probabilities))?;
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::Term;
    use approx::assert_relative_eq;
    use prepay_panel::columns::{INCENTIVE, Y};

    fn panel() -> DataFrame {
        df!(
            Y => [0i32, 1, 0],
            INCENTIVE => [Some(1.0), Some(-1.0), None],
        )
        .unwrap()
    }

    #[test]
    fn test_predict_applies_link() {
        let model = FittedModel::from_estimates(
            "M",
            &[(Term::Intercept, -1.0), (Term::Incentive, 2.0)],
        );
        let scored = predict(&model, &panel(), &model.terms(), "train").unwrap();

        assert_eq!(scored.height(), 2);
        let p = column_values(&scored, PROBABILITY).unwrap();
        assert_relative_eq!(p[0], logistic(1.0), epsilon = 1e-15);
        assert_relative_eq!(p[1], logistic(-3.0), epsilon = 1e-15);
    }

    #[test]
    fn test_excluded_and_absent_terms() {
        let model = FittedModel::from_estimates(
            "M",
            &[(Term::Intercept, -1.0), (Term::Incentive, 2.0)],
        );

        // Incentive excluded: rows stay the same, only the intercept applies.
        let intercept_only = TermSet::new([Term::Intercept, Term::Covid]);
        let scored = predict(&model, &panel(), &intercept_only, "train").unwrap();
        assert_eq!(scored.height(), 2);
        for p in column_values(&scored, PROBABILITY).unwrap() {
            assert_relative_eq!(p, logistic(-1.0), epsilon = 1e-15);
        }
    }
}
