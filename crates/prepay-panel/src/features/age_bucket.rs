//! Loan age categories.
//!
//! Ages 0 through 12 fall in the first bucket. Negative ages are data
//! anomalies and get a null bucket; the row itself is kept because the age
//! is present.

use super::DerivedColumn;
use crate::columns::{AGE_BUCKET, LOAN_AGE};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Loan age category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBucket {
    /// 0 to 12 months
    UpTo12,
    /// 13 to 24 months
    From13To24,
    /// 25 to 36 months
    From25To36,
    /// 37 to 48 months
    From37To48,
    /// 49 to 60 months
    From49To60,
    /// More than 60 months
    Over60,
}

impl AgeBucket {
    /// All buckets in ascending age order.
    pub const ALL: [Self; 6] = [
        Self::UpTo12,
        Self::From13To24,
        Self::From25To36,
        Self::From37To48,
        Self::From49To60,
        Self::Over60,
    ];

    /// Bucket label as stored in the panel.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UpTo12 => "0-12",
            Self::From13To24 => "13-24",
            Self::From25To36 => "25-36",
            Self::From37To48 => "37-48",
            Self::From49To60 => "49-60",
            Self::Over60 => "60+",
        }
    }

    /// Largest age in the bucket, `None` for the open-ended last bucket.
    pub const fn upper_bound(&self) -> Option<i64> {
        match self {
            Self::UpTo12 => Some(12),
            Self::From13To24 => Some(24),
            Self::From25To36 => Some(36),
            Self::From37To48 => Some(48),
            Self::From49To60 => Some(60),
            Self::Over60 => None,
        }
    }

    /// Bucket of a loan age in months.
    pub fn from_age(age: i64) -> Option<Self> {
        if age < 0 {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.upper_bound().is_none_or(|upper| age <= upper))
    }
}

/// Categorical `age_bucket` column derived from `loan_age`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgeBucketFeature;

impl DerivedColumn for AgeBucketFeature {
    fn name(&self) -> &str {
        AGE_BUCKET
    }

    fn required_columns(&self) -> &[&str] {
        &[LOAN_AGE]
    }

    fn expr(&self) -> Expr {
        let age = col(LOAN_AGE);
        let anomalous = age.clone().is_null().or(age.clone().lt(lit(0i64)));

        let within = |bucket: AgeBucket| {
            age.clone().lt_eq(lit(bucket.upper_bound().unwrap_or(i64::MAX)))
        };

        when(anomalous)
            .then(lit(NULL).cast(DataType::String))
            .when(within(AgeBucket::UpTo12))
            .then(lit(AgeBucket::UpTo12.label()))
            .when(within(AgeBucket::From13To24))
            .then(lit(AgeBucket::From13To24.label()))
            .when(within(AgeBucket::From25To36))
            .then(lit(AgeBucket::From25To36.label()))
            .when(within(AgeBucket::From37To48))
            .then(lit(AgeBucket::From37To48.label()))
            .when(within(AgeBucket::From49To60))
            .then(lit(AgeBucket::From49To60.label()))
            .otherwise(lit(AgeBucket::Over60.label()))
            .alias(AGE_BUCKET)
    }
}
