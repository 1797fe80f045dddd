//! Logistic regression by iteratively reweighted least squares.
//!
//! Each Newton step solves `(XᵀWX) δ = Xᵀ(y - p)` with a Cholesky
//! factorization, halving the step while it lowers the log-likelihood. When
//! no halved step improves on the current estimate the fit stops there and
//! is reported as not converged.
//! Standard errors come from the inverse information at the final estimate.

use crate::design::Design;
use crate::error::{ModelError, Result};
use crate::linalg::{inverse_spd, solve_spd};
use crate::terms::{Term, TermSet};
use ndarray::{Array1, Array2, Axis};
use prepay_data::FitConfig;
use serde::{Deserialize, Serialize};

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.96;

/// Smallest IRLS weight.
const MIN_WEIGHT: f64 = 1e-10;

/// Step halvings before giving up on an iteration.
const MAX_HALVINGS: usize = 30;

/// One estimated coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
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

impl Coefficient {
    /// Coefficient with a normal 95% interval.
    pub fn new(term: Term, estimate: f64, std_error: f64) -> Self {
        Self {
            term,
            estimate,
            std_error,
            ci_lower: estimate - Z_95 * std_error,
            ci_upper: estimate + Z_95 * std_error,
        }
    }
}

/// A fitted logistic specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    /// Specification name
    pub name: String,
    /// Coefficients in design order
    pub coefficients: Vec<Coefficient>,
    /// Log-likelihood at the estimate
    pub log_likelihood: f64,
    /// `-2 * log_likelihood`
    pub deviance: f64,
    /// Observations used
    pub n_obs: usize,
    /// Newton iterations run
    pub iterations: usize,
    /// Whether the tolerance was met
    pub converged: bool,
}

impl FittedModel {
    /// Model with fixed estimates and no fit statistics.
    ///
    /// Useful for scoring with known coefficients.
    pub fn from_estimates(name: &str, estimates: &[(Term, f64)]) -> Self {
        Self {
            name: name.to_string(),
            coefficients: estimates
                .iter()
                .map(|&(term, estimate)| Coefficient::new(term, estimate, 0.0))
                .collect(),
            log_likelihood: 0.0,
            deviance: 0.0,
            n_obs: 0,
            iterations: 0,
            converged: true,
        }
    }

    /// Coefficient of `term`, if the model has it.
    pub fn coefficient(&self, term: Term) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Estimate of `term`, if the model has it.
    pub fn estimate(&self, term: Term) -> Option<f64> {
        self.coefficient(term).map(|c| c.estimate)
    }

    /// The model's terms in design order.
    pub fn terms(&self) -> TermSet {
        self.coefficients.iter().map(|c| c.term).collect()
    }

    /// Number of estimated parameters.
    pub fn n_params(&self) -> usize {
        self.coefficients.len()
    }
}

/// Logistic function.
pub fn logistic(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + exp(eta))` without overflow.
fn softplus(eta: f64) -> f64 {
    eta.max(0.0) + (-eta.abs()).exp().ln_1p()
}

/// Bernoulli log-likelihood of linear predictors `eta`.
pub fn log_likelihood(y: &Array1<f64>, eta: &Array1<f64>) -> f64 {
    y.iter()
        .zip(eta.iter())
        .map(|(&yi, &ei)| yi * ei - softplus(ei))
        .sum()
}

/// IRLS maximum likelihood fitter.
#[derive(Debug, Clone, Default)]
pub struct LogisticFitter {
    config: FitConfig,
}

impl LogisticFitter {
    /// Create a fitter with the given tolerance and iteration cap.
    pub const fn new(config: FitConfig) -> Self {
        Self { config }
    }

    /// Fit a design.
    ///
    /// # Arguments
    /// * `name` - Specification name recorded on the result
    /// * `design` - Complete-case regressors and outcome
    ///
    /// # Returns
    /// * The fitted model; `RankDeficient` when `XᵀWX` is singular
    pub fn fit(&self, name: &str, design: &Design) -> Result<FittedModel> {
        let x = &design.x;
        let y = &design.y;
        let n = design.n_obs();
        let k = x.ncols();
        if n == 0 {
            return Err(ModelError::EmptySample(name.to_string()));
        }

        let mut beta = Array1::<f64>::zeros(k);
        let mut ll = log_likelihood(y, &x.dot(&beta));
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let (information, score) = newton_system(x, y, &beta);
            let delta = solve_spd(&information, &score)?;

            let Some((candidate, candidate_ll, step)) = line_search(x, y, &beta, &delta, ll) else {
                // At the optimum rounding alone can lower the likelihood.
                converged = max_abs(&delta) <= self.config.tolerance;
                if !converged {
                    tracing::warn!(
                        model = name,
                        iteration = iterations,
                        "No step raises the log-likelihood; keeping the previous estimate"
                    );
                }
                break;
            };

            let change = (candidate_ll - ll).abs();
            let max_step = step * max_abs(&delta);
            tracing::debug!(
                model = name,
                iteration = iterations,
                log_likelihood = candidate_ll,
                step,
                max_step,
                "IRLS iteration"
            );

            beta = candidate;
            ll = candidate_ll;

            if change <= self.config.tolerance * (ll.abs() + self.config.tolerance)
                || max_step <= self.config.tolerance
            {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                model = name,
                iterations,
                "Logistic fit did not converge; estimates may be unreliable"
            );
        }

        let (information, _) = newton_system(x, y, &beta);
        let covariance = inverse_spd(&information)?;

        let coefficients = design
            .terms
            .iter()
            .enumerate()
            .map(|(j, term)| Coefficient::new(term, beta[j], covariance[[j, j]].max(0.0).sqrt()))
            .collect();

        tracing::info!(
            model = name,
            n_obs = n,
            iterations,
            converged,
            log_likelihood = ll,
            "Fitted logistic model"
        );

        Ok(FittedModel {
            name: name.to_string(),
            coefficients,
            log_likelihood: ll,
            deviance: -2.0 * ll,
            n_obs: n,
            iterations,
            converged,
        })
    }
}

/// Halve `delta` until the step from `beta` does not lower `ll`.
///
/// Returns the new estimate, its log-likelihood and the step size, or `None`
/// when every halving lowers the log-likelihood.
fn line_search(
    x: &Array2<f64>,
    y: &Array1<f64>,
    beta: &Array1<f64>,
    delta: &Array1<f64>,
    ll: f64,
) -> Option<(Array1<f64>, f64, f64)> {
    let mut step = 1.0;
    for _ in 0..=MAX_HALVINGS {
        let candidate = beta + &(delta * step);
        let candidate_ll = log_likelihood(y, &x.dot(&candidate));
        if candidate_ll >= ll {
            return Some((candidate, candidate_ll, step));
        }
        step *= 0.5;
    }
    None
}

fn max_abs(values: &Array1<f64>) -> f64 {
    values.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
}

/// Information matrix `XᵀWX` and score `Xᵀ(y - p)` at `beta`.
fn newton_system(
    x: &Array2<f64>,
    y: &Array1<f64>,
    beta: &Array1<f64>,
) -> (Array2<f64>, Array1<f64>) {
    let p = x.dot(beta).mapv(logistic);
    let w = p.mapv(|pi| (pi * (1.0 - pi)).max(MIN_WEIGHT));
    let weighted = x * &w.insert_axis(Axis(1));
    let information = x.t().dot(&weighted);
    let score = x.t().dot(&(y - &p));
    (information, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn design(x: Array2<f64>, y: Array1<f64>, terms: &[Term]) -> Design {
        Design {
            terms: TermSet::new(terms.iter().copied()),
            x,
            y,
            excluded: 0,
        }
    }

    fn simulate(n: usize, beta: [f64; 2], seed: u64) -> Design {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Array2::<f64>::ones((n, 2));
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let xi: f64 = rng.gen_range(-2.0..2.0);
            x[[i, 1]] = xi;
            let p = logistic(beta[0] + beta[1] * xi);
            y[i] = if rng.r#gen::<f64>() < p { 1.0 } else { 0.0 };
        }
        design(x, y, &[Term::Intercept, Term::Incentive])
    }

    #[test]
    fn test_logistic_is_stable() {
        assert_relative_eq!(logistic(0.0), 0.5);
        assert!(logistic(800.0) <= 1.0);
        assert!(logistic(-800.0) >= 0.0);
        assert_relative_eq!(logistic(2.0) + logistic(-2.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_intercept_only_matches_sample_mean() {
        let y = array![1.0, 0.0, 0.0, 1.0, 0.0];
        let x = Array2::<f64>::ones((5, 1));
        let fitted = LogisticFitter::default()
            .fit("M", &design(x, y, &[Term::Intercept]))
            .unwrap();

        assert!(fitted.converged);
        let p: f64 = 0.4;
        assert_relative_eq!(fitted.coefficients[0].estimate, (p / (1.0 - p)).ln(), epsilon = 1e-8);
        let expected_ll = 2.0 * p.ln() + 3.0 * (1.0 - p).ln();
        assert_relative_eq!(fitted.log_likelihood, expected_ll, epsilon = 1e-10);
        assert_relative_eq!(fitted.deviance, -2.0 * expected_ll, epsilon = 1e-10);
        // Var(logit p̂) = 1 / (n p (1 - p))
        let se = (1.0 / (5.0 * p * (1.0 - p))).sqrt();
        assert_relative_eq!(fitted.coefficients[0].std_error, se, epsilon = 1e-6);
    }

    #[test]
    fn test_recovers_simulated_coefficients() {
        let fitted = LogisticFitter::default()
            .fit("M", &simulate(20_000, [-1.0, 0.8], 7))
            .unwrap();

        assert!(fitted.converged);
        assert_eq!(fitted.n_obs, 20_000);
        let slope = fitted.coefficient(Term::Incentive).unwrap();
        assert_relative_eq!(slope.estimate, 0.8, epsilon = 0.1);
        assert!(slope.ci_lower < slope.estimate && slope.estimate < slope.ci_upper);
        assert_relative_eq!(
            slope.ci_upper - slope.estimate,
            Z_95 * slope.std_error,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_collinear_design_is_rank_deficient() {
        let x = array![[1.0, 1.0, 2.0], [1.0, 2.0, 4.0], [1.0, 3.0, 6.0], [1.0, 4.0, 8.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];
        let result = LogisticFitter::default().fit(
            "M",
            &design(x, y, &[Term::Intercept, Term::Incentive, Term::LoanAge]),
        );
        assert!(matches!(result, Err(ModelError::RankDeficient(_))));
    }

    #[test]
    fn test_line_search_rejects_descent_direction() {
        let y = array![1.0, 0.0, 0.0, 1.0, 0.0];
        let x = Array2::<f64>::ones((5, 1));
        let beta = array![0.0];
        let ll = log_likelihood(&y, &x.dot(&beta));

        // The score is negative at zero, so any positive step lowers the likelihood.
        assert!(line_search(&x, &y, &beta, &array![1.0], ll).is_none());

        let (accepted, accepted_ll, step) = line_search(&x, &y, &beta, &array![-4.0], ll).unwrap();
        assert!(accepted_ll >= ll);
        assert!(step < 1.0);
        assert_relative_eq!(accepted[0], -4.0 * step);
    }

    #[test]
    fn test_model_lookup() {
        let model = FittedModel::from_estimates(
            "M",
            &[(Term::Intercept, -3.0), (Term::Covid, 0.5)],
        );
        assert_eq!(model.estimate(Term::Covid), Some(0.5));
        assert_eq!(model.estimate(Term::Ltv), None);
        assert_eq!(model.n_params(), 2);
        assert_eq!(model.terms().as_slice(), &[Term::Intercept, Term::Covid]);
    }
}
