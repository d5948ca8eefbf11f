//! Inspect and repair the offline queue on a device store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use straywatch::config::Config;
use straywatch::local_db::sync::LocalStore;
use straywatch::local_db::LocalDatabase;
use straywatch::offline::LastSync;
use straywatch::shared::report::QueueEntry;
use straywatch::telemetry;

#[derive(Parser)]
#[command(name = "straywatch-queue", version, about = "StrayWatch offline queue tool")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Store file, overrides the configured path
    #[arg(long)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue counts and last refresh
    Status,
    /// List queue entries
    List {
        /// Only entries at the retry ceiling
        #[arg(long)]
        exhausted: bool,
    },
    /// Reset an entry's retry count so the next drain picks it up
    Retry { id: String },
    /// Remove an entry without syncing it
    Discard { id: String },
    /// Put entries stuck in `syncing` back to `pending`
    Recover,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::new()?,
    };
    telemetry::init_tracing(config.log_filter());

    let path = cli.store.unwrap_or_else(|| config.store_path());
    tracing::debug!(path = %path.display(), "opening store");
    let db = LocalDatabase::open(&path).await?;
    let store = LocalStore::new(Arc::new(db));
    let max_retries = config.max_retries();

    match cli.command {
        Command::Status => {
            let stats = store.stats(max_retries).await?;
            let now = chrono::Utc::now().timestamp_millis();
            println!("store:      {}", path.display());
            println!("pending:    {}", stats.pending);
            println!("failed:     {}", stats.failed);
            println!("syncing:    {}", stats.syncing);
            println!("exhausted:  {}", stats.exhausted);
            println!("cached:     {}", store.cached_reports().await?.len());
            println!("last sync:  {}", LastSync::from_elapsed(now, store.last_sync_time().await?));
        }
        Command::List { exhausted } => {
            let entries = if exhausted {
                store.exhausted_entries(max_retries).await?
            } else {
                store.entries().await?
            };
            if entries.is_empty() {
                println!("queue is empty");
            }
            for entry in &entries {
                print_entry(entry);
            }
        }
        Command::Retry { id } => {
            let entry = store.retry_entry(&id).await?;
            println!("reset {}", entry.id);
        }
        Command::Discard { id } => {
            let entry = store.discard_entry(&id).await?;
            println!("discarded {} ({})", entry.id, entry.payload.name);
        }
        Command::Recover => {
            let count = store.recover_interrupted().await?;
            println!("recovered {} entries", count);
        }
    }

    Ok(())
}

fn print_entry(entry: &QueueEntry) {
    let created = chrono::DateTime::from_timestamp_millis(entry.created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{}  {:<8} retries={}  {}  {:<16} {}",
        entry.id,
        entry.status,
        entry.retry_count,
        created,
        entry.payload.category,
        entry.payload.name
    );
}
