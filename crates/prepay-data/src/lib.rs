#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prepay/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod layout;
pub mod loader;
pub mod macro_rate;
pub mod manifest;
pub mod schema;

pub use cache::SnapshotCache;
pub use config::{CovidWindow, FitConfig, SplitConfig, StudyConfig};
pub use error::{DataError, Result};
pub use layout::{ArtifactReader, Layout};
pub use loader::{RawTables, RecordLoader};
pub use manifest::{FileKind, Manifest, ManifestEntry};
pub use schema::{Coercion, ColumnSpec, FieldSpec, fields};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
