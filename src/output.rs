//! CLI output: JSON for machines, aligned text for humans.
//!
//! Every command can emit machine-readable JSON with `--json`; the plain
//! renderings below exist for operators eyeballing a terminal. Rendering
//! never feeds back into the grouping passes.

use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::ingest::IngestReport;
use crate::model::{ExecutionRecord, SyncSession, SyncStatus, TableKey};

const CHART_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Plain,
}

pub struct OutputContext {
    mode: OutputMode,
}

impl OutputContext {
    #[must_use]
    pub fn new(json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Plain },
        }
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value).map_err(anyhow::Error::from)?);
        Ok(())
    }

    pub fn sessions(&self, sessions: &[SyncSession]) -> Result<()> {
        if self.is_json() {
            return self.json(&sessions);
        }
        if sessions.is_empty() {
            println!("no sessions reconstructed");
            return Ok(());
        }
        println!(
            "{:<6} {:<20} {:<20} {:>9} {:>12}  {:<18} FLOW",
            "ID", "START", "END", "DURATION", "ROWS", "STATUS"
        );
        for session in sessions {
            let flow: Vec<&str> = session.status_flow.iter().map(SyncStatus::as_str).collect();
            println!(
                "{:<6} {:<20} {:<20} {:>8}s {:>12}  {:<18} {}",
                session.id,
                session.start_time.format("%Y-%m-%d %H:%M:%S"),
                session.end_time.format("%Y-%m-%d %H:%M:%S"),
                session.duration_seconds,
                session.total_rows_processed,
                paint_status(&session.status),
                flow.join(" > "),
            );
            if let Some(message) = &session.error_message {
                println!("       {} {message}", "error:".red());
            }
        }
        Ok(())
    }

    pub fn timeline(&self, records: &[ExecutionRecord], heights: &[f64]) -> Result<()> {
        if self.is_json() {
            return self.json(&records);
        }
        if records.is_empty() {
            println!("no executions recorded");
            return Ok(());
        }
        for (record, height) in records.iter().zip(heights) {
            let width = (height * CHART_WIDTH as f64).round() as usize;
            let bar = "█".repeat(width.max(usize::from(record.duration_seconds.is_some())));
            let duration = record
                .duration_seconds
                .map_or_else(|| "running".to_string(), |secs| format!("{secs}s"));
            println!(
                "{:<20} {:<12} {} {}",
                record.start_time.format("%Y-%m-%d %H:%M:%S"),
                paint_status(&record.status),
                bar,
                duration,
            );
        }
        Ok(())
    }

    pub fn keys(&self, keys: &[TableKey]) -> Result<()> {
        if self.is_json() {
            return self.json(&keys);
        }
        if keys.is_empty() {
            println!("status log is empty");
            return Ok(());
        }
        for key in keys {
            println!("{key}");
        }
        Ok(())
    }

    pub fn ingest_report(&self, report: &IngestReport) -> Result<()> {
        if self.is_json() {
            return self.json(&serde_json::json!({
                "accepted": report.accepted,
                "rejected": report.rejected,
            }));
        }
        println!("ingested {} rows ({} rejected)", report.accepted, report.rejected);
        Ok(())
    }
}

fn paint_status(status: &SyncStatus) -> String {
    let text = status.as_str();
    match status {
        SyncStatus::Error => text.red().to_string(),
        SyncStatus::Success | SyncStatus::ListeningChanges => text.green().to_string(),
        SyncStatus::InProgress | SyncStatus::FullLoad => text.yellow().to_string(),
        SyncStatus::NoData | SyncStatus::Other(_) => text.dimmed().to_string(),
    }
}
