//! Bounded-window pairing of execution records.
//!
//! The status log carries no run identifier, so a live `IN_PROGRESS` row
//! and the terminal row that later superseded it arrive as two unrelated
//! records. This pass pairs each unprocessed `IN_PROGRESS` record with
//! the first terminal record that started within the pairing window, and
//! leaves everything it cannot pair standalone: a stuck run must stay
//! visible to operators, and an orphaned completion is still a real
//! attempt. A pair that straddles the window boundary stays split; that
//! is an accepted limit of heuristic pairing, not a failure.

use std::collections::HashSet;

use chrono::Duration;
use tracing::debug;

use crate::model::{ExecutionRecord, SyncStatus};

/// Pair up in-progress and terminal records, preserving input order.
///
/// Every input id is consumed exactly once; the "already processed" set
/// is local to each call. Records with statuses outside the pairing rules
/// pass through unchanged.
#[must_use]
pub fn reconcile_window(records: &[ExecutionRecord], window: Duration) -> Vec<ExecutionRecord> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut out = Vec::with_capacity(records.len());

    for record in records {
        if seen.contains(&record.id) {
            continue;
        }
        match &record.status {
            SyncStatus::InProgress => {
                let terminal = records.iter().find(|other| {
                    !seen.contains(&other.id)
                        && other.id != record.id
                        && other.status.is_execution_terminal()
                        && other.start_time > record.start_time
                        && other.start_time - record.start_time <= window
                });
                if let Some(terminal) = terminal {
                    seen.insert(record.id);
                    seen.insert(terminal.id);
                    out.push(merge_pair(record, terminal));
                } else {
                    debug!(id = record.id, "no terminal counterpart in window");
                    seen.insert(record.id);
                    out.push(record.clone());
                }
            }
            status if status.is_execution_terminal() => {
                let open = records.iter().find(|other| {
                    !seen.contains(&other.id)
                        && other.id != record.id
                        && other.status == SyncStatus::InProgress
                        && other.start_time < record.start_time
                        && record.start_time - other.start_time <= window
                });
                if let Some(open) = open {
                    seen.insert(open.id);
                    seen.insert(record.id);
                    out.push(merge_pair(open, record));
                } else {
                    seen.insert(record.id);
                    out.push(record.clone());
                }
            }
            _ => {
                seen.insert(record.id);
                out.push(record.clone());
            }
        }
    }

    out
}

/// Merge an in-progress record with its terminal counterpart.
///
/// Start comes from the in-progress side, everything displayed comes from
/// the terminal side. Duration is recomputed from the pair; when that is
/// not positive (clock skew between writers) the terminal's own reported
/// duration stands.
fn merge_pair(open: &ExecutionRecord, terminal: &ExecutionRecord) -> ExecutionRecord {
    let duration_seconds = terminal
        .end_time
        .map(|end| (end - open.start_time).num_seconds())
        .filter(|secs| *secs > 0)
        .or(terminal.duration_seconds);

    ExecutionRecord {
        id: terminal.id,
        status: terminal.status.clone(),
        start_time: open.start_time,
        end_time: terminal.end_time,
        duration_seconds,
    }
}
