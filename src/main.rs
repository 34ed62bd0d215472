//! JSON Store CLI
//!
//! Reads and writes a store configured from environment variables, with
//! command-line flags taking precedence.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use json_store::{JsonStore, StoreOptions};

#[derive(Debug, Parser)]
#[command(name = "json-store", version, about = "Inspect and edit a JSON store")]
struct Cli {
    /// Namespace prefix for keys
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// File backing the local store
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a JSON value
    Set {
        key: String,
        /// JSON text; bare words are stored as strings
        value: String,
        /// Time to live in milliseconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Print a value as JSON
    Get { key: String },
    /// Delete a key
    Remove { key: String },
    /// Delete every key in scope
    Clear,
    /// List keys in scope
    Keys,
    /// Delete expired entries
    Purge,
}

fn main() -> Result<()> {
    // Defaults to warnings only so command output stays clean; override with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "json_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut options = StoreOptions::from_env();
    if let Some(namespace) = cli.namespace {
        options = options.with_namespace(namespace);
    }
    if let Some(path) = cli.path {
        options = options.with_storage_path(path);
    }

    let mut store = JsonStore::new(options).context("Failed to open store")?;
    store.on_change(|key, value| match value {
        Some(_) => info!(key, "Item changed"),
        None => info!(key, "Item removed"),
    });

    match cli.command {
        Command::Set { key, value, ttl } => {
            let value: Value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            store
                .set_item(&key, &value, ttl)
                .with_context(|| format!("Failed to set {key}"))?;
        }
        Command::Get { key } => {
            let value: Option<Value> = store
                .get_item(&key)
                .with_context(|| format!("Failed to get {key}"))?;
            match value {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("null"),
            }
        }
        Command::Remove { key } => {
            store
                .remove_item(&key)
                .with_context(|| format!("Failed to remove {key}"))?;
        }
        Command::Clear => store.clear().context("Failed to clear store")?,
        Command::Keys => {
            for key in store.keys() {
                println!("{key}");
            }
        }
        Command::Purge => {
            let purged = store.purge_expired().context("Failed to purge store")?;
            println!("{purged}");
        }
    }

    Ok(())
}
