//! Refinancing incentive.

use super::DerivedColumn;
use crate::columns::{INCENTIVE, MARKET_RATE, ORIG_RATE};
use polars::prelude::*;

/// `incentive = orig_rate - market_rate`, null when the market rate is.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncentiveFeature;

impl DerivedColumn for IncentiveFeature {
    fn name(&self) -> &str {
        INCENTIVE
    }

    fn required_columns(&self) -> &[&str] {
        &[ORIG_RATE, MARKET_RATE]
    }

    fn expr(&self) -> Expr {
        (col(ORIG_RATE) - col(MARKET_RATE)).alias(INCENTIVE)
    }
}
