//! Temporal samples.

use crate::error::Result;
use polars::prelude::*;
use prepay_data::SplitConfig;
use prepay_panel::columns::PERIOD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A period range of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sample {
    /// `period <= train_end`
    Train,
    /// `train_end < period <= validation_end`
    Validation,
    /// `period > validation_end`
    Test,
    /// `period <= validation_end`
    TrainValidation,
}

impl Sample {
    /// Samples every model is evaluated on.
    pub const EVALUATION: [Self; 3] = [Self::Train, Self::Validation, Self::Test];

    /// Label used in logs and result tables.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
            Self::TrainValidation => "train_validation",
        }
    }

    /// Row filter for this sample.
    pub fn filter(self, splits: &SplitConfig) -> Expr {
        let period = col(PERIOD);
        match self {
            Self::Train => period.lt_eq(lit(splits.train_end)),
            Self::Validation => period
                .clone()
                .gt(lit(splits.train_end))
                .and(period.lt_eq(lit(splits.validation_end))),
            Self::Test => period.gt(lit(splits.validation_end)),
            Self::TrainValidation => period.lt_eq(lit(splits.validation_end)),
        }
    }

    /// Rows of `panel` in this sample.
    pub fn select(self, panel: &DataFrame, splits: &SplitConfig) -> Result<DataFrame> {
        Ok(panel.clone().lazy().filter(self.filter(splits)).collect()?)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
