//! Artfolio CLI - inspect the local sync state.
//!
//! This tool reads a file-backed cache store and reports cached artwork
//! collections, quota usage and pending sync operations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use artfolio_backend::FileKeyValueStore;
use artfolio_common::{OwnerId, StorageLocation, SyncStatus};
use artfolio_sync::{LocalRecordStore, PendingOperationLog, QuotaTracker};

#[derive(Parser)]
#[command(name = "artfolio")]
#[command(about = "Artfolio - offline sync state inspection")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path to the cache store file.
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show an owner's cached records and their sync state.
    Status {
        /// Owner (student) identifier.
        #[arg(short, long)]
        owner: String,
    },

    /// Show an owner's per-category quota usage.
    Quota {
        /// Owner (student) identifier.
        #[arg(short, long)]
        owner: String,
    },

    /// List pending sync operations, oldest first.
    Pending,

    /// List all owners with a cached collection.
    Owners,
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("artfolio")
        .join("store.json")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store_path = cli.store.unwrap_or_else(default_store_path);
    let store = Arc::new(
        FileKeyValueStore::open(&store_path)
            .await
            .with_context(|| format!("opening store at {}", store_path.display()))?,
    );

    match cli.command {
        Commands::Status { owner } => cmd_status(store, &owner).await,
        Commands::Quota { owner } => cmd_quota(store, &owner).await,
        Commands::Pending => cmd_pending(store).await,
        Commands::Owners => cmd_owners(store).await,
    }
}

async fn cmd_status(store: Arc<FileKeyValueStore>, owner: &str) -> Result<()> {
    let owner = OwnerId::new(owner).context("invalid owner id")?;
    let cache = LocalRecordStore::new(store);

    if !cache.is_cached(&owner).await {
        println!("No cached collection for {}", owner);
        return Ok(());
    }

    let records = cache.get(&owner).await;
    println!("{} cached record(s) for {}:", records.len(), owner);
    for record in records {
        let state = match (record.sync_status, record.storage_location) {
            (SyncStatus::Confirmed, _) => "confirmed",
            (SyncStatus::PendingUpload, _) => "pending upload",
            (SyncStatus::PendingDbSync, StorageLocation::Remote) => "pending record sync",
            (SyncStatus::PendingDbSync, StorageLocation::LocalOnly) => "pending sync",
        };
        println!(
            "  {:<40} {:<8} {:<20} {}",
            record.id,
            record.media_kind,
            state,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

async fn cmd_quota(store: Arc<FileKeyValueStore>, owner: &str) -> Result<()> {
    let owner = OwnerId::new(owner).context("invalid owner id")?;
    let cache = LocalRecordStore::new(store);
    let records = cache.get(&owner).await;

    let quota = QuotaTracker::default().compute(&records);
    println!("Quota usage for {}:", owner);
    println!("  images: {}/{}", quota.image.used, quota.image.limit);
    println!("  videos: {}/{}", quota.video.used, quota.video.limit);
    println!("  audio:  {}/{}", quota.audio.used, quota.audio.limit);

    Ok(())
}

async fn cmd_pending(store: Arc<FileKeyValueStore>) -> Result<()> {
    let log = PendingOperationLog::new(store);
    let operations = log.list_all().await?;

    if operations.is_empty() {
        println!("No pending operations");
        return Ok(());
    }

    println!("{} pending operation(s):", operations.len());
    for op in operations {
        println!(
            "  {:<40} {:<8} attempts: {:<3} last: {}",
            op.entity_id,
            op.kind,
            op.attempt_count,
            op.last_attempt_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

async fn cmd_owners(store: Arc<FileKeyValueStore>) -> Result<()> {
    let cache = LocalRecordStore::new(store);
    let owners = cache.owners().await?;

    if owners.is_empty() {
        println!("No cached collections");
        return Ok(());
    }

    for owner in owners {
        println!("{}", owner);
    }

    Ok(())
}
