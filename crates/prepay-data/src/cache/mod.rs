//! Parse cache for raw record files.

pub mod snapshot;

pub use snapshot::SnapshotCache;
