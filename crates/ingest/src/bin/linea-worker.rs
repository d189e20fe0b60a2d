//! linea-worker: stoppage event ingestion worker.
//!
//! Subcommands:
//! - `watch`: poll the sheet export and ingest new complete rows until Ctrl-C
//! - `submit`: ingest one record from a JSON file (form submission path)
//! - `list`: print stored events grouped by lineage
//! - `show`: print one event

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use tracing::info;

use linea_core::{Config, EventId, EventRecord};
use linea_ingest::{open_source, Ingestor, ScenarioDispatcher, SourceWatcher};
use linea_storage::{group_by_origin, EventStore};

// ── CLI ─────────────────────────────────────────────────────────────

/// Stoppage event ingestion: sheet watcher and direct submissions.
#[derive(Parser, Debug)]
#[command(name = "linea-worker", version, about)]
struct Cli {
    /// Override the events database path.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the sheet export and ingest new rows until interrupted.
    Watch {
        /// Sheet export to poll (.csv or .parquet).
        #[arg(long)]
        source: Option<PathBuf>,

        /// Poll interval in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Ingest one record from a JSON object keyed by column name.
    Submit {
        /// Path to the JSON record.
        file: PathBuf,

        /// Reporting user, overrides `Usuario` in the file.
        #[arg(long)]
        user: Option<String>,
    },
    /// Print stored events grouped by lineage root.
    List {
        /// Only events reported by this user.
        #[arg(long)]
        user: Option<String>,
    },
    /// Print one event.
    Show { id: EventId },
}

// ── commands ────────────────────────────────────────────────────────

async fn watch(config: &Config, ingestor: Ingestor) -> anyhow::Result<()> {
    let source = open_source(&config.watcher.source_path)
        .with_context(|| format!("cannot watch {}", config.watcher.source_path.display()))?;

    let watcher = SourceWatcher::new(source, ingestor, &config.watcher);
    watcher.start()?;
    info!(source = %config.watcher.source_path.display(), "watching for new rows, Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");
    watcher.stop().await;

    let stats = watcher.stats();
    info!(
        cycles = stats.cycles,
        ingested = stats.ingested,
        incomplete = stats.incomplete,
        failed = stats.failed,
        read_failures = stats.read_failures,
        "watcher summary"
    );
    Ok(())
}

async fn submit(ingestor: &Ingestor, file: &Path, user: Option<String>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let columns: IndexMap<String, String> =
        serde_json::from_str(&text).context("record must be a JSON object of strings")?;

    let mut record = EventRecord::from_columns(&columns)?;
    if let Some(user) = user {
        record.usuario = user;
    }

    let receipt = ingestor.ingest_direct(record).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

async fn list(store: &EventStore, user: Option<&str>) -> anyhow::Result<()> {
    let events = match user {
        Some(user) => store.fetch_by_user(user).await?,
        None => store.fetch_all().await?,
    };
    let grouped = group_by_origin(events);
    println!("{}", serde_json::to_string_pretty(&grouped)?);
    Ok(())
}

async fn show(store: &EventStore, id: EventId) -> anyhow::Result<()> {
    let event = store
        .fetch_by_id(id)
        .await?
        .with_context(|| format!("event {id} not found"))?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    linea_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(database) = cli.database {
        config.storage.database_path = database;
    }
    if let Command::Watch { source, interval_ms } = &cli.command {
        if let Some(source) = source {
            config.watcher.source_path = source.clone();
        }
        if let Some(ms) = interval_ms {
            config.watcher.poll_interval_ms = *ms;
        }
    }
    config.log_summary();

    let store = EventStore::open(&config.storage)
        .await
        .with_context(|| format!("cannot open event store at {}", config.storage.database_path.display()))?;

    let result = match cli.command {
        Command::Watch { .. } => {
            let ingestor = Ingestor::new(store.clone(), ScenarioDispatcher::new());
            watch(&config, ingestor).await
        }
        Command::Submit { file, user } => {
            let ingestor = Ingestor::new(store.clone(), ScenarioDispatcher::new());
            submit(&ingestor, &file, user).await
        }
        Command::List { user } => list(&store, user.as_deref()).await,
        Command::Show { id } => show(&store, id).await,
    };

    store.close().await;
    result
}
