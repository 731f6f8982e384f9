//! The reconciliation passes. Each one fetches a remote collection, works
//! through it one record at a time, and reports what happened. A failure on
//! one record is logged and counted; only a failed fetch aborts the pass.

pub mod catalog;
pub mod listing;
pub mod order;
pub mod review;

use std::fmt;

pub use catalog::CatalogExporter;
pub use listing::ListingHandler;
pub use order::OrderHandler;
pub use review::{ReviewExporter, ReviewHandler};

/// Per-pass outcome counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    /// Records the pass looked at.
    pub fn total(&self) -> usize {
        self.synced + self.skipped + self.failed
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} synced, {} skipped, {} failed",
            self.synced, self.skipped, self.failed
        )
    }
}

/// Best-effort id for logging a record that failed to decode.
pub(crate) fn raw_id(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string())
}
