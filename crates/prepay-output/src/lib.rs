#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prepay/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod records;
pub mod report;

pub use export::{ExportError, ExportFormat, Exporter, to_csv};
pub use records::{CoefficientRecord, CounterfactualRecord, DecompositionRecord, MetricRecord};
pub use report::PanelReport;
