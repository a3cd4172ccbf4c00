//! Newline-delimited JSON ingestion.
//!
//! Timestamps are validated here, at the boundary: each line must carry an
//! RFC 3339 `processed_at`/`start_time`, and a line that fails to parse is
//! rejected with its line number rather than letting an unparsable
//! timestamp surface later as a nonsense duration. Rejected lines are
//! counted and logged; ingestion keeps going.

use std::io::BufRead;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::{Result, SynctraceError};
use crate::model::{ExecutionRecord, StatusEvent};
use crate::storage::SqliteStorage;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
}

/// Ingest status-log events, one JSON object per line.
pub fn ingest_events<R: BufRead>(reader: R, storage: &mut SqliteStorage) -> Result<IngestReport> {
    ingest_lines(reader, |event: StatusEvent| {
        storage.insert_event(&event).map(|_| ())
    })
}

/// Ingest execution records under `entity`, one JSON object per line.
pub fn ingest_executions<R: BufRead>(
    reader: R,
    entity: &str,
    storage: &mut SqliteStorage,
) -> Result<IngestReport> {
    ingest_lines(reader, |record: ExecutionRecord| {
        storage.insert_execution(entity, &record).map(|_| ())
    })
}

fn ingest_lines<R, T, F>(reader: R, mut store: F) -> Result<IngestReport>
where
    R: BufRead,
    T: DeserializeOwned,
    F: FnMut(T) -> Result<()>,
{
    let mut report = IngestReport::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(row) => {
                store(row)?;
                report.accepted += 1;
            }
            Err(e) => {
                let err = SynctraceError::Ingest {
                    line: idx + 1,
                    message: e.to_string(),
                };
                warn!(%err, "rejecting malformed row");
                report.rejected += 1;
            }
        }
    }
    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        "ingestion finished"
    );
    Ok(report)
}
