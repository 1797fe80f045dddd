//! Prepayment event indicator.

use super::DerivedColumn;
use crate::columns::{Y, ZERO_BALANCE_CODE};
use polars::prelude::*;

/// Zero-balance code of a voluntary prepayment or maturity.
pub const PREPAY_CODE: &str = "01";

/// Unpadded spelling of [`PREPAY_CODE`] seen in some extracts.
pub const PREPAY_CODE_UNPADDED: &str = "1";

/// `y = 1` iff the whitespace-trimmed zero-balance code is the prepayment
/// code, else `0`.
///
/// A missing code is an ordinary surviving month, so `y` is never null.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeFeature;

impl DerivedColumn for OutcomeFeature {
    fn name(&self) -> &str {
        Y
    }

    fn required_columns(&self) -> &[&str] {
        &[ZERO_BALANCE_CODE]
    }

    fn expr(&self) -> Expr {
        let code = col(ZERO_BALANCE_CODE)
            .cast(DataType::String)
            .str()
            .strip_chars(lit(NULL));
        code.clone()
            .eq(lit(PREPAY_CODE))
            .or(code.eq(lit(PREPAY_CODE_UNPADDED)))
            .fill_null(lit(false))
            .cast(DataType::Int32)
            .alias(Y)
    }
}
