//! The nested hazard specifications.
//!
//! - M0: incentive, loan age, credit score and LTV, fit on the training sample
//! - M1: M0 plus the covid indicator and covid-incentive interaction
//! - M2: M1 plus covid interactions with loan age and credit score
//!
//! M1 and M2 are fit on train and validation together. Likelihood-ratio
//! tests need a common sample, so M0 is refit there as well.

use crate::design::Design;
use crate::error::Result;
use crate::evaluate::{CalibrationRow, Evaluation, calibration, evaluate};
use crate::logit::{FittedModel, LogisticFitter};
use crate::lrt::{LrTest, likelihood_ratio_test};
use crate::split::Sample;
use crate::terms::{Term, TermSet};
use polars::prelude::*;
use prepay_data::StudyConfig;
use serde::{Deserialize, Serialize};

/// A named model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specification {
    /// Pre-pandemic baseline
    M0,
    /// Baseline with a pandemic level and rate-sensitivity shift
    M1,
    /// M1 with pandemic shifts in seasoning and credit sensitivity
    M2,
}

impl Specification {
    /// All specifications, smallest first.
    pub const ALL: [Self; 3] = [Self::M0, Self::M1, Self::M2];

    /// Model name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::M0 => "M0",
            Self::M1 => "M1",
            Self::M2 => "M2",
        }
    }

    /// Regressors in design order.
    pub fn terms(self) -> TermSet {
        let base = TermSet::new([
            Term::Intercept,
            Term::Incentive,
            Term::LoanAge,
            Term::CreditScore,
            Term::Ltv,
        ]);
        match self {
            Self::M0 => base,
            Self::M1 => base.extend(&[Term::Covid, Term::CovidIncentive]),
            Self::M2 => base.extend(&[
                Term::Covid,
                Term::CovidIncentive,
                Term::CovidLoanAge,
                Term::CovidCreditScore,
            ]),
        }
    }

    /// Sample the specification is estimated on.
    pub const fn sample(self) -> Sample {
        match self {
            Self::M0 => Sample::Train,
            Self::M1 | Self::M2 => Sample::TrainValidation,
        }
    }
}

/// Name of M0 refit on the M1/M2 sample.
pub const M0_REFIT: &str = "M0_refit";

/// Fit `terms` on `sample` of the panel.
pub fn fit_on_sample(
    name: &str,
    panel: &DataFrame,
    terms: &TermSet,
    sample: Sample,
    config: &StudyConfig,
) -> Result<FittedModel> {
    let rows = sample.select(panel, &config.splits)?;
    let design = Design::from_panel(&rows, terms, sample.label())?;
    tracing::info!(
        model = name,
        sample = %sample,
        rows = rows.height(),
        n_obs = design.n_obs(),
        excluded = design.excluded,
        "Fitting model"
    );
    LogisticFitter::new(config.fit).fit(name, &design)
}

/// Fit one specification on its own sample.
pub fn fit_specification(
    spec: Specification,
    panel: &DataFrame,
    config: &StudyConfig,
) -> Result<FittedModel> {
    fit_on_sample(spec.name(), panel, &spec.terms(), spec.sample(), config)
}

/// The three specifications, the M0 refit and their comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedFit {
    /// M0 on the training sample
    pub m0: FittedModel,
    /// M0 on train and validation
    pub m0_refit: FittedModel,
    /// M1 on train and validation
    pub m1: FittedModel,
    /// M2 on train and validation
    pub m2: FittedModel,
    /// M0 refit vs M1, then M1 vs M2
    pub lr_tests: Vec<LrTest>,
}

impl NestedFit {
    /// Fitted model of a specification.
    pub const fn model(&self, spec: Specification) -> &FittedModel {
        match spec {
            Specification::M0 => &self.m0,
            Specification::M1 => &self.m1,
            Specification::M2 => &self.m2,
        }
    }

    /// Every fitted model, refit included.
    pub fn models(&self) -> [&FittedModel; 4] {
        [&self.m0, &self.m0_refit, &self.m1, &self.m2]
    }

    /// Log loss of each specification on train, validation and test.
    pub fn evaluate(&self, panel: &DataFrame, config: &StudyConfig) -> Result<Vec<Evaluation>> {
        let mut evaluations = Vec::new();
        for spec in Specification::ALL {
            for sample in Sample::EVALUATION {
                evaluations.push(evaluate(self.model(spec), panel, sample, &config.splits)?);
            }
        }
        Ok(evaluations)
    }

    /// Per-period calibration of each specification on each evaluation sample.
    pub fn calibrate(
        &self,
        panel: &DataFrame,
        config: &StudyConfig,
    ) -> Result<Vec<CalibrationRow>> {
        let mut rows = Vec::new();
        for spec in Specification::ALL {
            for sample in Sample::EVALUATION {
                rows.extend(calibration(self.model(spec), panel, sample, &config.splits)?);
            }
        }
        Ok(rows)
    }
}

/// Fit M0, M1 and M2, refit M0 on the common sample and run both tests.
pub fn fit_nested(panel: &DataFrame, config: &StudyConfig) -> Result<NestedFit> {
    let m0 = fit_specification(Specification::M0, panel, config)?;
    let m0_refit = fit_on_sample(
        M0_REFIT,
        panel,
        &Specification::M0.terms(),
        Sample::TrainValidation,
        config,
    )?;
    let m1 = fit_specification(Specification::M1, panel, config)?;
    let m2 = fit_specification(Specification::M2, panel, config)?;

    let lr_tests = vec![
        likelihood_ratio_test(&m0_refit, &m1)?,
        likelihood_ratio_test(&m1, &m2)?,
    ];

    Ok(NestedFit {
        m0,
        m0_refit,
        m1,
        m2,
        lr_tests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifications_nest() {
        let m0 = Specification::M0.terms();
        let m1 = Specification::M1.terms();
        let m2 = Specification::M2.terms();

        assert_eq!(m0.len(), 5);
        assert_eq!(m1.len(), 7);
        assert_eq!(m2.len(), 9);
        assert!(m0.is_subset(&m1));
        assert!(m1.is_subset(&m2));
        assert_eq!(m2, TermSet::all());
    }

    #[test]
    fn test_samples() {
        assert_eq!(Specification::M0.sample(), Sample::Train);
        assert_eq!(Specification::M2.sample(), Sample::TrainValidation);
    }
}
