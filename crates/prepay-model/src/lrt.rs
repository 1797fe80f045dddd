//! Likelihood-ratio tests between nested models.

use crate::error::{ModelError, Result};
use crate::logit::FittedModel;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Outcome of one likelihood-ratio test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LrTest {
    /// Restricted model
    pub restricted: String,
    /// Full model
    pub full: String,
    /// `2 * (ll_full - ll_restricted)`, floored at zero
    pub statistic: f64,
    /// Added parameters
    pub df: usize,
    /// Chi-squared upper tail probability
    pub p_value: f64,
    /// Observations in both fits
    pub n_obs: usize,
}

/// Chi-squared upper tail of `statistic` with `df` degrees of freedom.
pub fn chi_squared_sf(statistic: f64, df: usize) -> Result<f64> {
    let dist = ChiSquared::new(df as f64).map_err(|e| ModelError::Distribution(e.to_string()))?;
    Ok(dist.sf(statistic))
}

/// Compare `restricted` against `full`.
///
/// Both models must be fit on the same rows and the restricted terms must be
/// a strict subset of the full terms.
pub fn likelihood_ratio_test(restricted: &FittedModel, full: &FittedModel) -> Result<LrTest> {
    if restricted.n_obs != full.n_obs {
        return Err(ModelError::SampleMismatch {
            small: restricted.name.clone(),
            small_n: restricted.n_obs,
            large: full.name.clone(),
            large_n: full.n_obs,
        });
    }
    if !restricted.terms().is_subset(&full.terms()) || full.n_params() <= restricted.n_params() {
        return Err(ModelError::NotNested {
            small: restricted.name.clone(),
            large: full.name.clone(),
        });
    }

    let df = full.n_params() - restricted.n_params();
    // Rounding can push an inert comparison slightly below zero.
    let statistic = (2.0 * (full.log_likelihood - restricted.log_likelihood)).max(0.0);
    let p_value = chi_squared_sf(statistic, df)?;

    tracing::info!(
        restricted = %restricted.name,
        full = %full.name,
        statistic,
        df,
        p_value,
        "Likelihood-ratio test"
    );

    Ok(LrTest {
        restricted: restricted.name.clone(),
        full: full.name.clone(),
        statistic,
        df,
        p_value,
        n_obs: full.n_obs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::Term;
    use approx::assert_relative_eq;

    fn model(name: &str, terms: &[Term], ll: f64, n_obs: usize) -> FittedModel {
        let estimates: Vec<(Term, f64)> = terms.iter().map(|&t| (t, 0.1)).collect();
        FittedModel {
            log_likelihood: ll,
            deviance: -2.0 * ll,
            n_obs,
            ..FittedModel::from_estimates(name, &estimates)
        }
    }

    #[test]
    fn test_known_statistic() {
        let small = model("M0", &[Term::Intercept], -120.0, 500);
        let large = model("M1", &[Term::Intercept, Term::Covid, Term::CovidIncentive], -117.0, 500);
        let test = likelihood_ratio_test(&small, &large).unwrap();

        assert_relative_eq!(test.statistic, 6.0);
        assert_eq!(test.df, 2);
        // Upper tail of chi-squared(2) is exp(-x / 2).
        assert_relative_eq!(test.p_value, (-3.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_p_value_decreases_with_statistic() {
        let mut previous = 1.0;
        for statistic in [0.0, 0.5, 1.0, 4.0, 10.0, 40.0] {
            let p = chi_squared_sf(statistic, 2).unwrap();
            assert!(p <= previous);
            assert!((0.0..=1.0).contains(&p));
            previous = p;
        }
    }

    #[test]
    fn test_statistic_is_never_negative() {
        let small = model("M0", &[Term::Intercept], -100.0, 10);
        let large = model("M1", &[Term::Intercept, Term::Covid], -100.000_000_1, 10);
        let test = likelihood_ratio_test(&small, &large).unwrap();
        assert_eq!(test.statistic, 0.0);
        assert_relative_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_sample_mismatch() {
        let small = model("M0", &[Term::Intercept], -100.0, 10);
        let large = model("M1", &[Term::Intercept, Term::Covid], -90.0, 12);
        assert!(matches!(
            likelihood_ratio_test(&small, &large),
            Err(ModelError::SampleMismatch { .. })
        ));
    }

    #[test]
    fn test_models_must_nest() {
        let a = model("A", &[Term::Intercept, Term::Ltv], -100.0, 10);
        let b = model("B", &[Term::Intercept, Term::Covid, Term::LoanAge], -90.0, 10);
        assert!(matches!(
            likelihood_ratio_test(&a, &b),
            Err(ModelError::NotNested { .. })
        ));
    }
}
