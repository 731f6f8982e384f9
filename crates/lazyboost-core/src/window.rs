//! Trailing lookback windows for sync passes.

use chrono::{DateTime, TimeDelta, Utc};

/// The interval a sync pass scans for new or changed records.
///
/// Sized by the caller to exceed the scheduling interval so that no record
/// falls between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Window ending at `now` and reaching back `lookback`.
    pub fn trailing(now: DateTime<Utc>, lookback: TimeDelta) -> Self {
        Self {
            start: now - lookback,
            end: now,
        }
    }

    /// Window ending now, reaching back `minutes`. Unsigned, so the start
    /// can never lie after the end.
    pub fn last_minutes(minutes: u32) -> Self {
        Self::trailing(Utc::now(), TimeDelta::minutes(i64::from(minutes)))
    }

    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }

    /// Strictly after the window start. The end is not checked: records
    /// touched while a pass is running still count as changed.
    pub fn changed_since_start(&self, ts: DateTime<Utc>) -> bool {
        ts > self.start
    }
}
