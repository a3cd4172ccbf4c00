//! Command-line interface.
//!
//! Thin dispatch layer: commands load config, open storage, call the
//! grouping passes, and hand results to [`crate::output`]. No
//! reconstruction logic lives here.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::model::TableKey;
use crate::output::OutputContext;
use crate::storage::SqliteStorage;
use crate::{flow, ingest, reconcile, timeline};

#[derive(Debug, Parser)]
#[command(
    name = "snt",
    version,
    about = "Reconstruct table-sync sessions from raw status logs"
)]
pub struct Cli {
    /// Path to a synctrace.toml config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the database path from config.
    #[arg(long, global = true, env = "SNT_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IngestKind {
    /// Status-log events.
    Log,
    /// Execution records (requires --entity).
    Runs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load newline-delimited JSON rows into the store.
    Ingest {
        #[arg(value_enum)]
        kind: IngestKind,
        /// Input file, or "-" for stdin.
        file: PathBuf,
        /// Entity the execution records belong to.
        #[arg(long)]
        entity: Option<String>,
    },
    /// Reconstruct sync sessions for one table key.
    Sessions {
        #[arg(long)]
        schema: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        engine: String,
        /// Maximum sessions to return (defaults to config).
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Render the execution timeline for one entity.
    Timeline {
        #[arg(long)]
        entity: String,
        /// Maximum bars to render (defaults to config).
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List known (schema, table, engine) keys.
    Keys,
}

/// Run a parsed command to completion.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    let out = OutputContext::new(cli.json);

    match cli.command {
        Command::Ingest { kind, file, entity } => {
            let mut storage = SqliteStorage::open(&config.db_path)?;
            let reader = open_input(&file)?;
            let report = match kind {
                IngestKind::Log => ingest::ingest_events(reader, &mut storage)?,
                IngestKind::Runs => {
                    let entity = entity
                        .context("--entity is required when ingesting execution records")?;
                    ingest::ingest_executions(reader, &entity, &mut storage)?
                }
            };
            out.ingest_report(&report)?;
        }
        Command::Sessions {
            schema,
            table,
            engine,
            limit,
        } => {
            let storage = SqliteStorage::open(&config.db_path)?;
            let key = TableKey::new(schema, table, engine);
            let limit = limit.unwrap_or(config.session_limit);
            let events = storage.events_for_key(&key, limit, config.fetch_multiplier)?;
            let sessions = flow::group_flows(&events, limit);
            out.sessions(&sessions)?;
        }
        Command::Timeline { entity, limit } => {
            let storage = SqliteStorage::open(&config.db_path)?;
            let records = storage.executions_for_entity(&entity)?;
            let reconciled = reconcile::reconcile_window(&records, config.pairing_window());
            let limit = limit.unwrap_or(config.chart_limit);
            let series = timeline::chart_series(&reconciled, limit);
            let heights = timeline::relative_heights(&series);
            out.timeline(&series, &heights)?;
        }
        Command::Keys => {
            let storage = SqliteStorage::open(&config.db_path)?;
            out.keys(&storage.list_keys()?)?;
        }
    }
    Ok(())
}

fn open_input(path: &std::path::Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}
