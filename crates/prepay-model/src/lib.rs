#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prepay/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod decomposition;
pub mod design;
pub mod error;
pub mod evaluate;
pub mod linalg;
pub mod logit;
pub mod lrt;
pub mod nested;
pub mod score;
pub mod split;
pub mod terms;

// Re-export main types
pub use decomposition::{
    BEHAVIORAL_TERMS, Counterfactual, CounterfactualRow, Decomposition, DecompositionRow,
    ExcessRow, ExcessTable, GroupKey, baseline_excess, counterfactual, weighted_decomposition,
};
pub use design::Design;
pub use error::{ModelError, Result};
pub use evaluate::{CalibrationRow, Evaluation, calibration, evaluate, log_loss};
pub use logit::{Coefficient, FittedModel, LogisticFitter};
pub use lrt::{LrTest, likelihood_ratio_test};
pub use nested::{NestedFit, Specification, fit_nested, fit_specification};
pub use score::{PROBABILITY, predict};
pub use split::Sample;
pub use terms::{Term, TermSet, parse_term_label};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
