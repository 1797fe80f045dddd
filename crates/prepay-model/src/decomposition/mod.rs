//! Counterfactual and excess-prepayment quantification.
//!
//! Every calculation here scores a sub-panel, usually the pandemic window,
//! with a subset of a fitted model's terms:
//!
//! - [`counterfactual`]: all terms against all but the behavioral interactions
//! - [`baseline_excess`]: observed outcomes against the pre-pandemic terms only
//! - [`weighted_decomposition`]: share-weighted attribution of the aggregate
//!   excess to groups
//!
//! The attribution is linear accounting, not a causal estimate.

pub mod counterfactual;
pub mod excess;
pub mod scenario;
pub mod weighted;

pub use counterfactual::{BEHAVIORAL_TERMS, Counterfactual, CounterfactualRow, counterfactual};
pub use excess::{ExcessRow, ExcessTable, GroupKey, baseline_excess};
pub use scenario::{PeriodRate, ScenarioPrediction, predict_scenario};
pub use weighted::{Decomposition, DecompositionRow, weighted_decomposition};
