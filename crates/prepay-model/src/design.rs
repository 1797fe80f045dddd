//! Design matrices.
//!
//! A model sees only complete cases: rows where the outcome and every
//! regressor of the model are present. Interaction regressors are
//! materialized as columns before selection, so the covid interactions carry
//! the nulls of their factors.

use crate::error::{ModelError, Result};
use crate::terms::{COVID_CREDIT_SCORE, COVID_LOAN_AGE, Term, TermSet};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use prepay_panel::columns::{COVID, CREDIT_SCORE, LOAN_AGE, Y};

/// Add the `covid * loan_age` and `covid * credit_score` columns.
pub fn with_interactions(frame: LazyFrame) -> LazyFrame {
    let covid = || col(COVID).cast(DataType::Float64);
    frame.with_columns([
        (covid() * col(LOAN_AGE).cast(DataType::Float64)).alias(COVID_LOAN_AGE),
        (covid() * col(CREDIT_SCORE).cast(DataType::Float64)).alias(COVID_CREDIT_SCORE),
    ])
}

/// Rows of `panel` usable by a model with `terms`, interactions included.
///
/// Fails when a regressor column is absent or has no observed value.
pub fn complete_cases(panel: &DataFrame, terms: &TermSet, sample: &str) -> Result<DataFrame> {
    let needs_interactions =
        terms.contains(Term::CovidLoanAge) || terms.contains(Term::CovidCreditScore);
    let prepared = if needs_interactions {
        with_interactions(panel.clone().lazy()).collect()?
    } else {
        panel.clone()
    };

    let mut required = vec![Y];
    required.extend(terms.iter().filter_map(|t| t.column()));

    for name in &required {
        let column = prepared.column(name).map_err(|_| ModelError::MissingColumn {
            column: (*name).to_string(),
            sample: sample.to_string(),
        })?;
        if column.len() > 0 && column.null_count() == column.len() {
            return Err(ModelError::AllMissing {
                column: (*name).to_string(),
                sample: sample.to_string(),
            });
        }
    }

    let present = required
        .iter()
        .map(|name| col(*name).is_not_null())
        .reduce(|acc, e| acc.and(e))
        .unwrap_or_else(|| lit(true));
    let complete = prepared.lazy().filter(present).collect()?;

    let excluded = panel.height() - complete.height();
    if excluded > 0 {
        tracing::warn!(
            sample,
            excluded,
            kept = complete.height(),
            "Excluded rows with missing regressors"
        );
    }

    Ok(complete)
}

/// Values of a numeric column as `f64`, nulls as NaN.
pub fn column_values(frame: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let values = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Regressors and outcome of one model on one sample.
#[derive(Debug, Clone)]
pub struct Design {
    /// Column order of `x`
    pub terms: TermSet,
    /// `n x k` regressors, intercept as a column of ones
    pub x: Array2<f64>,
    /// Binary outcome
    pub y: Array1<f64>,
    /// Rows dropped for missing values
    pub excluded: usize,
}

impl Design {
    /// Build the design of `terms` over the complete cases of `panel`.
    ///
    /// # Arguments
    /// * `panel` - Panel rows of the sample
    /// * `terms` - Regressors in column order
    /// * `sample` - Sample label for diagnostics
    ///
    /// # Returns
    /// * The design, or an error for an empty sample, a missing regressor or
    ///   a constant non-intercept regressor
    pub fn from_panel(panel: &DataFrame, terms: &TermSet, sample: &str) -> Result<Self> {
        if panel.height() == 0 {
            return Err(ModelError::EmptySample(sample.to_string()));
        }

        let complete = complete_cases(panel, terms, sample)?;
        let n = complete.height();
        if n == 0 {
            return Err(ModelError::EmptySample(sample.to_string()));
        }

        let mut x = Array2::<f64>::ones((n, terms.len()));
        for (j, term) in terms.iter().enumerate() {
            let Some(name) = term.column() else {
                continue;
            };
            let values = Array1::from(column_values(&complete, name)?);
            if is_constant(&values) {
                return Err(ModelError::RankDeficient(format!(
                    "`{name}` is constant in {sample} sample"
                )));
            }
            x.column_mut(j).assign(&values);
        }

        let y = Array1::from(column_values(&complete, Y)?);

        Ok(Self {
            terms: terms.clone(),
            x,
            y,
            excluded: panel.height() - n,
        })
    }

    /// Number of observations.
    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }
}

fn is_constant(values: &Array1<f64>) -> bool {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max - min == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use prepay_panel::columns::{INCENTIVE, LTV};

    fn panel() -> DataFrame {
        df!(
            Y => [0i32, 1, 0, 1],
            INCENTIVE => [Some(0.5), Some(1.5), None, Some(-0.2)],
            LOAN_AGE => [1i64, 2, 3, 4],
            CREDIT_SCORE => [Some(700i64), Some(750), Some(760), None],
            LTV => [80i64, 80, 80, 80],
            COVID => [0i32, 1, 1, 0],
        )
        .unwrap()
    }

    #[test]
    fn test_interactions_follow_covid() {
        let frame = with_interactions(panel().lazy()).collect().unwrap();
        let age: Vec<Option<f64>> = frame
            .column(COVID_LOAN_AGE)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(age, vec![Some(0.0), Some(2.0), Some(3.0), Some(0.0)]);

        let score: Vec<Option<f64>> = frame
            .column(COVID_CREDIT_SCORE)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(score[1], Some(750.0));
        assert_eq!(score[3], None);
    }

    #[test]
    fn test_design_uses_complete_cases() {
        let terms = TermSet::new([Term::Intercept, Term::Incentive, Term::CreditScore]);
        let design = Design::from_panel(&panel(), &terms, "train").unwrap();

        assert_eq!(design.n_obs(), 2);
        assert_eq!(design.excluded, 2);
        assert_eq!(design.x.ncols(), 3);
        assert_eq!(design.x[[0, 0]], 1.0);
        assert_eq!(design.x[[1, 2]], 750.0);
        assert_eq!(design.y.to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_constant_regressor_is_rank_deficient() {
        let terms = TermSet::new([Term::Intercept, Term::Ltv]);
        assert!(matches!(
            Design::from_panel(&panel(), &terms, "train"),
            Err(ModelError::RankDeficient(_))
        ));
    }

    #[test]
    fn test_all_missing_regressor() {
        let mut frame = panel();
        frame
            .with_column(Column::new(INCENTIVE.into(), [None::<f64>, None, None, None]))
            .unwrap();
        let terms = TermSet::new([Term::Intercept, Term::Incentive]);
        assert!(matches!(
            Design::from_panel(&frame, &terms, "train"),
            Err(ModelError::AllMissing { .. })
        ));
    }

    #[test]
    fn test_missing_column_and_empty_sample() {
        let terms = TermSet::new([Term::Intercept, Term::Incentive]);
        let no_incentive = panel().drop(INCENTIVE).unwrap();
        assert!(matches!(
            Design::from_panel(&no_incentive, &terms, "train"),
            Err(ModelError::MissingColumn { .. })
        ));

        let empty = panel().head(Some(0));
        assert!(matches!(
            Design::from_panel(&empty, &terms, "test"),
            Err(ModelError::EmptySample(_))
        ));
    }
}
