//! AtlasLedger CLI
//!
//! Append to and query a file-backed entity store from the command line.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use atlasledger::log::LogRecovery;
use atlasledger::{Config, EntityStore, LogSyncStrategy, Metadata, QuerySpec, Store};

/// AtlasLedger CLI
#[derive(Parser, Debug)]
#[command(name = "atlasledger")]
#[command(about = "Append-only, versioned entity store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./atlasledger_data")]
    data_dir: PathBuf,

    /// fsync after every append instead of every 100
    #[arg(long)]
    sync_every_write: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one entity version
    Append {
        /// Payload as JSON
        #[arg(long)]
        data: String,

        /// Metadata as JSON (needs entity-type, author, timestamp)
        #[arg(long)]
        metadata: String,
    },

    /// Run a JSON query spec; prints one record per line
    Query {
        /// Query spec as JSON, e.g. {"entity-type":"transaction","id":"tx-1"}
        #[arg(long)]
        spec: String,
    },

    /// Check the log file without modifying it
    Verify,

    /// Print record and entity counts
    Stats,
}

fn main() {
    // Initialize tracing/logging (stderr, so stdout stays machine-readable)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlasledger=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> atlasledger::Result<()> {
    let Args {
        data_dir,
        sync_every_write,
        command,
    } = args;

    match command {
        Commands::Verify => {
            let report = LogRecovery::verify(&data_dir.join("entities.log"))?;
            println!(
                "records={} last_sequence={} valid_bytes={} bad_trailing_bytes={}",
                report.records_recovered, report.last_sequence, report.valid_len, report.bytes_discarded
            );
            if let Some(reason) = report.stop_reason {
                println!("stopped early: {}", reason);
            }
            Ok(())
        }
        Commands::Append { data, metadata } => {
            let data: Value = serde_json::from_str(&data)?;
            let metadata = Metadata::from_value(serde_json::from_str(&metadata)?)?;

            let store = open_store(&data_dir, sync_every_write)?;
            let receipt = store.append(data, metadata)?;
            println!("{}", serde_json::to_string(&receipt)?);
            store.close()
        }
        Commands::Query { spec } => {
            let spec = QuerySpec::from_json(&spec)?;

            let store = open_store(&data_dir, sync_every_write)?;
            for record in store.query(&spec)? {
                let record = record?;
                let line = serde_json::json!({
                    "id": record.id,
                    "entity-type": record.entity_type,
                    "version": record.version,
                    "sequence": record.sequence,
                    "hash": record.hash,
                    "data": record.data,
                    "metadata": record.metadata,
                });
                println!("{}", line);
            }
            store.close()
        }
        Commands::Stats => {
            let store = open_store(&data_dir, sync_every_write)?;
            println!("{}", serde_json::to_string(&store.stats())?);
            store.close()
        }
    }
}

fn open_store(data_dir: &Path, sync_every_write: bool) -> atlasledger::Result<Store> {
    let sync = if sync_every_write {
        LogSyncStrategy::EveryWrite
    } else {
        LogSyncStrategy::EveryNEntries { count: 100 }
    };
    let config = Config::builder()
        .data_dir(data_dir)
        .log_sync_strategy(sync)
        .build();
    Store::open(config)
}
