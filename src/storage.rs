//! SQLite store for the raw status log and execution history.
//!
//! Synchronous rusqlite in WAL mode. Timestamps are stored as epoch
//! milliseconds (i64); conversion to `DateTime<Utc>` happens in the row
//! mappers, so the grouping passes only ever see valid timestamps.
//!
//! # Tables
//!
//! - `status_log`: one row per status ping, keyed by
//!   (schema, table, engine) plus `processed_at`
//! - `sync_executions`: execution records per viewed entity, for the
//!   timeline chart

use std::path::Path;

use chrono::DateTime;
use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::error::{Result, SynctraceError, TimestampOutOfRange};
use crate::model::{ExecutionRecord, StatusEvent, SyncStatus, TableKey};

/// Current schema version, tracked via `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA synchronous = NORMAL;

-- Raw status log: append-only pings, no run identifier.
CREATE TABLE IF NOT EXISTS status_log (
    id INTEGER PRIMARY KEY,
    schema_name TEXT NOT NULL,
    table_name TEXT NOT NULL,
    db_engine TEXT NOT NULL,
    status TEXT NOT NULL,
    processed_at INTEGER NOT NULL,  -- epoch ms
    record_count INTEGER,
    message TEXT
);

CREATE INDEX IF NOT EXISTS idx_status_log_key_time
    ON status_log(schema_name, table_name, db_engine, processed_at);

-- Execution records scoped to a viewed entity (a CSV source, a table).
CREATE TABLE IF NOT EXISTS sync_executions (
    id INTEGER PRIMARY KEY,
    entity TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at INTEGER NOT NULL,    -- epoch ms
    ended_at INTEGER,               -- epoch ms
    duration_seconds INTEGER
);

CREATE INDEX IF NOT EXISTS idx_sync_executions_entity
    ON sync_executions(entity, started_at);
";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (creating if needed) a database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database; used throughout the tests.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(SynctraceError::Config(format!(
                "database schema v{version} is newer than this build supports (v{SCHEMA_VERSION})"
            )));
        }
        conn.execute_batch(SCHEMA_SQL)?;
        if version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(Self { conn })
    }

    /// Append a status ping. An id of 0 lets SQLite assign one; the
    /// assigned id is returned either way.
    pub fn insert_event(&mut self, event: &StatusEvent) -> Result<i64> {
        let explicit_id: Option<i64> = (event.id != 0).then_some(event.id);
        self.conn.execute(
            "INSERT INTO status_log
                (id, schema_name, table_name, db_engine, status, processed_at, record_count, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                explicit_id,
                event.schema_name,
                event.table_name,
                event.db_engine,
                event.status.as_str(),
                event.processed_at.timestamp_millis(),
                event.record_count,
                event.message,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Append an execution record under `entity`.
    pub fn insert_execution(&mut self, entity: &str, record: &ExecutionRecord) -> Result<i64> {
        let explicit_id: Option<i64> = (record.id != 0).then_some(record.id);
        self.conn.execute(
            "INSERT INTO sync_executions
                (id, entity, status, started_at, ended_at, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                explicit_id,
                entity,
                record.status.as_str(),
                record.start_time.timestamp_millis(),
                record.end_time.map(|t| t.timestamp_millis()),
                record.duration_seconds,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fetch one key's recent status pings, newest first.
    ///
    /// Over-fetches `session_limit * fetch_multiplier` raw rows so the
    /// flow grouper has enough events to reconstruct `session_limit`
    /// sessions.
    pub fn events_for_key(
        &self,
        key: &TableKey,
        session_limit: usize,
        fetch_multiplier: usize,
    ) -> Result<Vec<StatusEvent>> {
        let raw_limit = session_limit.saturating_mul(fetch_multiplier);
        debug!(key = %key, raw_limit, "fetching status log window");
        let mut stmt = self.conn.prepare(
            "SELECT id, schema_name, table_name, db_engine, status, processed_at, record_count, message
             FROM status_log
             WHERE schema_name = ?1 AND table_name = ?2 AND db_engine = ?3
             ORDER BY processed_at DESC, id DESC
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            params![
                key.schema_name,
                key.table_name,
                key.db_engine,
                i64::try_from(raw_limit).unwrap_or(i64::MAX),
            ],
            event_from_row,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Fetch every execution record for `entity`, in insertion order.
    pub fn executions_for_entity(&self, entity: &str) -> Result<Vec<ExecutionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, status, started_at, ended_at, duration_seconds
             FROM sync_executions
             WHERE entity = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![entity], execution_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Distinct (schema, table, engine) keys present in the status log.
    pub fn list_keys(&self) -> Result<Vec<TableKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT schema_name, table_name, db_engine
             FROM status_log
             ORDER BY schema_name, table_name, db_engine",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TableKey {
                schema_name: row.get(0)?,
                table_name: row.get(1)?,
                db_engine: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            Box::new(TimestampOutOfRange(ms)),
        )
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<StatusEvent> {
    let status: String = row.get(4)?;
    Ok(StatusEvent {
        id: row.get(0)?,
        schema_name: row.get(1)?,
        table_name: row.get(2)?,
        db_engine: row.get(3)?,
        status: SyncStatus::from(status),
        processed_at: timestamp_column(row, 5)?,
        record_count: row.get(6)?,
        message: row.get(7)?,
    })
}

fn execution_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    let status: String = row.get(1)?;
    let ended_ms: Option<i64> = row.get(3)?;
    let end_time = match ended_ms {
        Some(ms) => Some(
            DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Integer,
                    Box::new(TimestampOutOfRange(ms)),
                )
            })?,
        ),
        None => None,
    };
    Ok(ExecutionRecord {
        id: row.get(0)?,
        status: SyncStatus::from(status),
        start_time: timestamp_column(row, 2)?,
        end_time,
        duration_seconds: row.get(4)?,
    })
}
