//! Fitting, testing and decomposing simulated panels.

use approx::assert_relative_eq;
use polars::prelude::*;
use prepay_data::StudyConfig;
use prepay_model::decomposition::predict_scenario;
use prepay_model::{
    BEHAVIORAL_TERMS, FittedModel, GroupKey, PROBABILITY, Term, baseline_excess, counterfactual,
    fit_nested, weighted_decomposition,
};
use prepay_panel::columns::{
    COVID, COVID_INCENTIVE, CREDIT_SCORE, INCENTIVE, LOAN_AGE, LTV, OCCUPANCY, PERIOD, STATE, Y,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PERIODS: [i64; 12] = [
    201806, 201812, 201906, 201912, 202003, 202009, 202103, 202109, 202112, 202203, 202206, 202209,
];

fn logistic(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

/// Rows with a pandemic level shift and a stronger rate response.
fn simulated_panel(n: usize, seed: u64) -> DataFrame {
    let config = StudyConfig::default();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut period = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut incentive = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut score: Vec<Option<i64>> = Vec::with_capacity(n);
    let mut ltv = Vec::with_capacity(n);
    let mut covid = Vec::with_capacity(n);
    let mut covid_incentive = Vec::with_capacity(n);
    let mut state = Vec::with_capacity(n);
    let mut occupancy = Vec::with_capacity(n);

    for i in 0..n {
        let p = PERIODS[rng.gen_range(0..PERIODS.len())];
        let c = i32::from(config.covid.contains(p));
        let inc: f64 = rng.gen_range(-1.0..2.0);
        let a: i64 = rng.gen_range(1..120);
        let s: i64 = rng.gen_range(620..820);
        let l: i64 = rng.gen_range(50..97);

        let eta = -3.0 + 0.6 * inc + 0.004 * a as f64 + 0.003 * (s - 720) as f64
            - 0.01 * (l - 75) as f64
            + f64::from(c) * (0.7 + 0.5 * inc);
        let outcome = i32::from(rng.r#gen::<f64>() < logistic(eta));

        period.push(p);
        y.push(outcome);
        incentive.push(inc);
        age.push(a);
        // A few missing scores exercise complete-case selection.
        score.push((i % 97 != 0).then_some(s));
        ltv.push(l);
        covid.push(c);
        covid_incentive.push(f64::from(c) * inc);
        state.push(["CA", "TX", "NY", "FL"][rng.gen_range(0..4)]);
        occupancy.push(["P", "S", "I"][rng.gen_range(0..3)]);
    }

    df!(
        PERIOD => period,
        Y => y,
        INCENTIVE => incentive,
        LOAN_AGE => age,
        CREDIT_SCORE => score,
        LTV => ltv,
        COVID => covid,
        COVID_INCENTIVE => covid_incentive,
        STATE => state,
        OCCUPANCY => occupancy,
    )
    .unwrap()
}

fn covid_window(panel: &DataFrame) -> DataFrame {
    panel
        .clone()
        .lazy()
        .filter(col(COVID).eq(lit(1)))
        .collect()
        .unwrap()
}

#[test]
fn test_nested_fits_and_likelihood_ratio_tests() {
    let config = StudyConfig::default();
    let panel = simulated_panel(8_000, 11);
    let nested = fit_nested(&panel, &config).unwrap();

    for model in nested.models() {
        assert!(model.converged, "{} did not converge", model.name);
        assert_relative_eq!(model.deviance, -2.0 * model.log_likelihood);
    }

    // Common sample for the comparisons; M0 alone sees less data.
    assert_eq!(nested.m0_refit.n_obs, nested.m1.n_obs);
    assert_eq!(nested.m1.n_obs, nested.m2.n_obs);
    assert!(nested.m0.n_obs < nested.m0_refit.n_obs);

    // Adding terms never lowers the maximized likelihood.
    assert!(nested.m1.log_likelihood >= nested.m0_refit.log_likelihood - 1e-6);
    assert!(nested.m2.log_likelihood >= nested.m1.log_likelihood - 1e-6);

    assert_eq!(nested.lr_tests.len(), 2);
    assert_eq!(nested.lr_tests[0].df, 2);
    assert_eq!(nested.lr_tests[1].df, 2);
    for test in &nested.lr_tests {
        assert!(test.statistic >= 0.0);
        assert!((0.0..=1.0).contains(&test.p_value));
    }
    // The simulated pandemic shift is large.
    assert!(nested.lr_tests[0].p_value < 1e-6);

    let covid_incentive = nested.m1.coefficient(Term::CovidIncentive).unwrap();
    assert!(covid_incentive.ci_lower < covid_incentive.estimate);
    assert!(covid_incentive.estimate > 0.0);

    let evaluations = nested.evaluate(&panel, &config).unwrap();
    assert_eq!(evaluations.len(), 9);
    assert!(evaluations.iter().all(|e| e.log_loss.is_finite() && e.log_loss > 0.0));

    let calibration = nested.calibrate(&panel, &config).unwrap();
    assert_eq!(calibration.len(), 3 * PERIODS.len());
}

#[test]
fn test_zeroed_interactions_reproduce_the_smaller_model() {
    let config = StudyConfig::default();
    let panel = simulated_panel(4_000, 23);
    let nested = fit_nested(&panel, &config).unwrap();
    let m1 = &nested.m1;

    let mut estimates: Vec<(Term, f64)> =
        m1.coefficients.iter().map(|c| (c.term, c.estimate)).collect();
    estimates.push((Term::CovidLoanAge, 0.02));
    estimates.push((Term::CovidCreditScore, -0.001));
    let m2 = FittedModel::from_estimates("M2", &estimates);

    let window = covid_window(&panel);
    let reduced = predict_scenario(&m2, &window, &m2.terms().without(&BEHAVIORAL_TERMS)).unwrap();
    let reference = predict_scenario(m1, &window, &m1.terms()).unwrap();

    let reduced_p: Vec<Option<f64>> = reduced
        .frame
        .column(PROBABILITY)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    let reference_p: Vec<Option<f64>> = reference
        .frame
        .column(PROBABILITY)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(reduced_p, reference_p);

    let result = counterfactual(&m2, &window, &BEHAVIORAL_TERMS).unwrap();
    assert_eq!(result.overall.without_bias, reference.overall_rate);
    assert_eq!(result.periods.len(), reference.monthly.len());
}

#[test]
fn test_group_decompositions_are_consistent() {
    let config = StudyConfig::default();
    let panel = simulated_panel(6_000, 5);
    let nested = fit_nested(&panel, &config).unwrap();
    let window = covid_window(&panel);

    let mut aggregates = Vec::new();
    for key in GroupKey::ALL {
        let table = baseline_excess(&nested.m2, &window, key).unwrap();

        // Share-weighted group means recover the overall mean.
        let shares: f64 = table.rows.iter().map(|r| r.share).sum();
        assert_relative_eq!(shares, 1.0, epsilon = 1e-12);
        let weighted: f64 = table.rows.iter().map(|r| r.share * r.excess).sum();
        assert_relative_eq!(weighted, table.aggregate_excess, epsilon = 1e-12);
        assert_relative_eq!(
            table.observed_rate - table.expected_rate,
            table.aggregate_excess,
            epsilon = 1e-12
        );

        let decomposition = weighted_decomposition(&table);
        assert_relative_eq!(decomposition.residual, 0.0, epsilon = 1e-12);

        aggregates.push(table.aggregate_excess);
    }

    // The grouping only changes how the same rows are split.
    assert_relative_eq!(aggregates[0], aggregates[1], epsilon = 1e-12);
    assert_relative_eq!(aggregates[1], aggregates[2], epsilon = 1e-12);
    // Pandemic terms raise hazard, so the baseline under-predicts.
    assert!(aggregates[0] > 0.0);
}
