/// Pure derivations over store snapshots
pub mod aggregate;

/// Remote-then-local mutation sequencing
pub mod coordinator;

/// Display helpers and budget reports
pub mod report;

/// Data source contract and the in-memory mock provider
pub mod source;

/// Keyed in-memory collections
pub mod store;
