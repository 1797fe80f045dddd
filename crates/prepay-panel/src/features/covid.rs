//! Pandemic window indicator and its incentive interaction.

use super::DerivedColumn;
use crate::columns::{COVID, COVID_INCENTIVE, INCENTIVE, PERIOD};
use polars::prelude::*;
use prepay_data::CovidWindow;

/// `covid = 1` iff `start <= period <= end`.
#[derive(Debug, Clone, Copy)]
pub struct CovidIndicatorFeature {
    window: CovidWindow,
}

impl CovidIndicatorFeature {
    /// Indicator for the given window.
    pub const fn new(window: CovidWindow) -> Self {
        Self { window }
    }
}

impl DerivedColumn for CovidIndicatorFeature {
    fn name(&self) -> &str {
        COVID
    }

    fn required_columns(&self) -> &[&str] {
        &[PERIOD]
    }

    fn expr(&self) -> Expr {
        col(PERIOD)
            .gt_eq(lit(self.window.start))
            .and(col(PERIOD).lt_eq(lit(self.window.end)))
            .cast(DataType::Int32)
            .alias(COVID)
    }
}

/// `covid_incentive = covid * incentive`, with a missing incentive taken as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CovidIncentiveFeature;

impl DerivedColumn for CovidIncentiveFeature {
    fn name(&self) -> &str {
        COVID_INCENTIVE
    }

    fn required_columns(&self) -> &[&str] {
        &[COVID, INCENTIVE]
    }

    fn expr(&self) -> Expr {
        (col(COVID).cast(DataType::Float64) * col(INCENTIVE).fill_null(lit(0.0)))
            .alias(COVID_INCENTIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covid_bounds_are_inclusive() {
        let window = CovidWindow {
            start: 202003,
            end: 202112,
        };
        let df = df!(PERIOD => [202002i64, 202003, 202112, 202201]).unwrap();
        let out = df
            .lazy()
            .with_column(CovidIndicatorFeature::new(window).expr())
            .collect()
            .unwrap();

        let covid: Vec<Option<i32>> = out
            .column(COVID)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(covid, vec![Some(0), Some(1), Some(1), Some(0)]);
    }

    #[test]
    fn test_covid_incentive_treats_missing_incentive_as_zero() {
        let df = df!(
            COVID => [1i32, 1, 0],
            INCENTIVE => [Some(0.75), None, Some(2.0)],
        )
        .unwrap();
        let out = df
            .lazy()
            .with_column(CovidIncentiveFeature.expr())
            .collect()
            .unwrap();

        let values: Vec<Option<f64>> =
            out.column(COVID_INCENTIVE).unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(0.75), Some(0.0), Some(0.0)]);
    }
}
