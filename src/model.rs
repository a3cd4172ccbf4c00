//! Core data model: raw status pings and the sessions reconstructed from them.
//!
//! The underlying log records individual status observations per
//! (schema, table, engine) key with no run identifier, so everything in
//! this crate works from these types: [`StatusEvent`] rows come in,
//! [`SyncSession`] intervals come out. All timestamps are
//! `chrono::DateTime<Utc>`; storage persists epoch milliseconds and ingest
//! parses RFC 3339, so values reaching the grouping passes are already
//! valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single sync ping as recorded by the replication worker.
///
/// Unknown wire statuses are preserved verbatim in [`SyncStatus::Other`]
/// and pass through reconciliation unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SyncStatus {
    FullLoad,
    InProgress,
    ListeningChanges,
    Error,
    NoData,
    Success,
    Other(String),
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FullLoad => "FULL_LOAD",
            Self::InProgress => "IN_PROGRESS",
            Self::ListeningChanges => "LISTENING_CHANGES",
            Self::Error => "ERROR",
            Self::NoData => "NO_DATA",
            Self::Success => "SUCCESS",
            Self::Other(s) => s,
        }
    }

    /// Statuses that can close an open flow.
    #[must_use]
    pub fn is_flow_terminal(&self) -> bool {
        matches!(self, Self::ListeningChanges | Self::Error | Self::NoData)
    }

    /// Statuses that terminate an execution record.
    #[must_use]
    pub fn is_execution_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl From<String> for SyncStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "FULL_LOAD" => Self::FullLoad,
            "IN_PROGRESS" => Self::InProgress,
            "LISTENING_CHANGES" => Self::ListeningChanges,
            "ERROR" => Self::Error,
            "NO_DATA" => Self::NoData,
            "SUCCESS" => Self::Success,
            _ => Self::Other(raw),
        }
    }
}

impl From<SyncStatus> for String {
    fn from(status: SyncStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tuple that scopes a sequence of status events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableKey {
    pub schema_name: String,
    pub table_name: String,
    pub db_engine: String,
}

impl TableKey {
    #[must_use]
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        db_engine: impl Into<String>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            db_engine: db_engine.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}@{}",
            self.schema_name, self.table_name, self.db_engine
        )
    }
}

/// One raw status observation for a key at a point in time.
///
/// `message` is the free-text column a status writer fills alongside an
/// `ERROR` ping; it is the source for [`SyncSession::error_message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: i64,
    pub schema_name: String,
    pub table_name: String,
    pub db_engine: String,
    pub status: SyncStatus,
    pub processed_at: DateTime<Utc>,
    #[serde(default)]
    pub record_count: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusEvent {
    #[must_use]
    pub fn key(&self) -> TableKey {
        TableKey::new(&self.schema_name, &self.table_name, &self.db_engine)
    }
}

/// A reconstructed interval representing one real sync attempt.
///
/// Invariants maintained by the grouping passes:
/// - `end_time >= start_time`, so `duration_seconds` is never negative
/// - `status_flow` is never empty and always has more than one entry
/// - `total_rows_processed` is the running maximum of observed
///   `record_count` values, not a sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSession {
    pub id: i64,
    pub schema_name: String,
    pub table_name: String,
    pub db_engine: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SyncStatus,
    pub status_flow: Vec<SyncStatus>,
    pub total_rows_processed: i64,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub record_ids: Vec<i64>,
    pub duration_seconds: i64,
}

/// An execution-shaped record as the timeline view consumes it.
///
/// Unlike [`StatusEvent`] these are not scoped to a table key; the caller
/// scopes them to whatever entity is being viewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: i64,
    pub status: SyncStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
}
