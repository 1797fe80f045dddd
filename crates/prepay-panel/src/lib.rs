#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prepay/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod audit;
pub mod builder;
pub mod columns;
pub mod error;
pub mod features;

pub use aggregate::{AggregateSeriesRow, aggregate};
pub use audit::{PerformanceAudit, audit_performance};
pub use builder::{Panel, PanelBuildReport, PanelBuilder, build_panel};
pub use error::{PanelError, Result};
pub use features::{AgeBucket, DerivedColumn};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
