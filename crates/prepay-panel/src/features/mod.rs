//! Derived panel columns.
//!
//! Each derived column is a pure expression over already-joined columns.
//! Columns are applied in order, so later features may read earlier ones.

pub mod age_bucket;
pub mod covid;
pub mod incentive;
pub mod outcome;

pub use age_bucket::{AgeBucket, AgeBucketFeature};
pub use covid::{CovidIncentiveFeature, CovidIndicatorFeature};
pub use incentive::IncentiveFeature;
pub use outcome::OutcomeFeature;

use polars::prelude::*;
use prepay_data::CovidWindow;

/// A column computed from other panel columns.
pub trait DerivedColumn: std::fmt::Debug {
    /// Output column name.
    fn name(&self) -> &str;

    /// Columns the expression reads.
    fn required_columns(&self) -> &[&str];

    /// Vectorized expression producing the column, aliased to [`Self::name`].
    fn expr(&self) -> Expr;
}

/// The panel's derived columns in application order.
pub fn standard_features(window: CovidWindow) -> Vec<Box<dyn DerivedColumn>> {
    vec![
        Box::new(OutcomeFeature),
        Box::new(IncentiveFeature),
        Box::new(CovidIndicatorFeature::new(window)),
        Box::new(CovidIncentiveFeature),
        Box::new(AgeBucketFeature),
    ]
}

/// Apply features one after another.
pub fn apply_features(frame: LazyFrame, features: &[Box<dyn DerivedColumn>]) -> LazyFrame {
    features
        .iter()
        .fold(frame, |lf, feature| lf.with_column(feature.expr()))
}
