//! Model terms.
//!
//! Coefficient names are canonicalized into [`Term`] when a model is fit, so
//! lookups by name never depend on how a label was spelled.

use crate::error::{ModelError, Result};
use prepay_panel::columns;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `covid * loan_age`
pub const COVID_LOAN_AGE: &str = "covid_loan_age";
/// `covid * credit_score`
pub const COVID_CREDIT_SCORE: &str = "covid_credit_score";

/// A regressor in the hazard model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// Constant
    Intercept,
    /// Original rate minus market rate
    Incentive,
    /// Months since origination
    LoanAge,
    /// Borrower credit score
    CreditScore,
    /// Loan-to-value ratio
    Ltv,
    /// Pandemic window indicator
    Covid,
    /// Pandemic shift in rate sensitivity
    CovidIncentive,
    /// Pandemic shift in seasoning
    CovidLoanAge,
    /// Pandemic shift in credit sensitivity
    CovidCreditScore,
}

impl Term {
    /// Every term, in canonical order.
    pub const ALL: [Self; 9] = [
        Self::Intercept,
        Self::Incentive,
        Self::LoanAge,
        Self::CreditScore,
        Self::Ltv,
        Self::Covid,
        Self::CovidIncentive,
        Self::CovidLoanAge,
        Self::CovidCreditScore,
    ];

    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intercept => "intercept",
            Self::Incentive => columns::INCENTIVE,
            Self::LoanAge => columns::LOAN_AGE,
            Self::CreditScore => columns::CREDIT_SCORE,
            Self::Ltv => columns::LTV,
            Self::Covid => columns::COVID,
            Self::CovidIncentive => columns::COVID_INCENTIVE,
            Self::CovidLoanAge => COVID_LOAN_AGE,
            Self::CovidCreditScore => COVID_CREDIT_SCORE,
        }
    }

    /// Panel column holding the regressor; `None` for the intercept.
    pub const fn column(self) -> Option<&'static str> {
        match self {
            Self::Intercept => None,
            other => Some(other.name()),
        }
    }

    /// Whether the term only acts inside the pandemic window.
    pub const fn is_pandemic(self) -> bool {
        matches!(
            self,
            Self::Covid | Self::CovidIncentive | Self::CovidLoanAge | Self::CovidCreditScore
        )
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Term {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        parse_term_label(s)
    }
}

/// Parse a coefficient label.
///
/// Accepts canonical names in any case, `Intercept`, `(Intercept)` and
/// `const` for the constant, and `:` as the interaction separator.
pub fn parse_term_label(label: &str) -> Result<Term> {
    let normalized = label.trim().to_ascii_lowercase().replace(':', "_");
    match normalized.as_str() {
        "intercept" | "(intercept)" | "const" => Ok(Term::Intercept),
        other => Term::ALL
            .into_iter()
            .find(|term| term.name() == other)
            .ok_or_else(|| ModelError::UnknownTerm(label.to_string())),
    }
}

/// An ordered set of terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSet(Vec<Term>);

impl TermSet {
    /// Set of the given terms, keeping first occurrences in order.
    pub fn new(terms: impl IntoIterator<Item = Term>) -> Self {
        let mut set = Vec::new();
        for term in terms {
            if !set.contains(&term) {
                set.push(term);
            }
        }
        Self(set)
    }

    /// Every term.
    pub fn all() -> Self {
        Self::new(Term::ALL)
    }

    /// Terms that act outside the pandemic window.
    pub fn baseline() -> Self {
        Self::new(Term::ALL.into_iter().filter(|t| !t.is_pandemic()))
    }

    /// Whether the set holds `term`.
    pub fn contains(&self, term: Term) -> bool {
        self.0.contains(&term)
    }

    /// This set minus `excluded`.
    pub fn without(&self, excluded: &[Term]) -> Self {
        Self(
            self.0
                .iter()
                .copied()
                .filter(|t| !excluded.contains(t))
                .collect(),
        )
    }

    /// This set followed by the terms of `other` it lacks.
    pub fn extend(&self, other: &[Term]) -> Self {
        Self::new(self.0.iter().chain(other).copied())
    }

    /// Whether every term here is also in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.iter().all(|t| other.contains(*t))
    }

    /// Terms in order.
    pub fn iter(&self) -> impl Iterator<Item = Term> + '_ {
        self.0.iter().copied()
    }

    /// Terms as a slice.
    pub fn as_slice(&self) -> &[Term] {
        &self.0
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Term> for TermSet {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Self::new(iter)
    }
}
