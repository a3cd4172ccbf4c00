//! Recency ordering and display shaping for reconstructed sessions.
//!
//! Both grouping strategies hand their output through here: sessions are
//! sorted newest first and capped to the caller's display limit, and the
//! execution timeline is shaped for left-to-right chart rendering.

use crate::model::{ExecutionRecord, SyncSession};

/// Default number of bars on the execution timeline chart.
pub const DEFAULT_CHART_LIMIT: usize = 20;

/// Sort sessions newest first (ties broken by id, newest first).
pub fn most_recent_first(sessions: &mut [SyncSession]) {
    sessions.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Truncate to the caller's display limit.
pub fn cap<T>(items: &mut Vec<T>, limit: usize) {
    items.truncate(limit);
}

/// Shape execution records for chart rendering: the `limit` most recent
/// records, in chronological order so bars read left to right.
#[must_use]
pub fn chart_series(records: &[ExecutionRecord], limit: usize) -> Vec<ExecutionRecord> {
    let mut ordered = records.to_vec();
    ordered.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    ordered.truncate(limit);
    ordered.reverse();
    ordered
}

/// Bar heights normalized against the longest duration in the series.
///
/// Records without a duration (still running) render as zero-height bars.
#[must_use]
pub fn relative_heights(records: &[ExecutionRecord]) -> Vec<f64> {
    let max = records
        .iter()
        .filter_map(|r| r.duration_seconds)
        .max()
        .unwrap_or(0);
    if max <= 0 {
        return vec![0.0; records.len()];
    }
    records
        .iter()
        .map(|r| r.duration_seconds.unwrap_or(0).max(0) as f64 / max as f64)
        .collect()
}
