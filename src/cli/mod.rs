//! Command-line interface.
//!
//! Every command writes JSON to the supplied writer, one value per line, so
//! output can be piped into `jq`. Filters are given as JSON in the
//! serialized [`MetadataFilter`] form.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stats` | Record count, dimension and size |
//! | `count` | Count records, optionally filtered |
//! | `list` | Page through records in id order |
//! | `get` | Fetch records by id |
//! | `search` | Top-K cosine search |
//! | `delete` | Delete records by id |
//! | `delete-where` | Delete records matching a filter |
//! | `clear` | Remove every record |
//! | `import` | Upsert records from JSON Lines |
//! | `index` | Incrementally index text documents from JSON Lines |
//!
//! # Example Usage
//!
//! ```bash
//! embedstore --path vectors.db import records.jsonl
//! embedstore --path vectors.db search --vector '[0.1, 0.9, 0.0]' --top-k 5 \
//!     --filter '{"equals": {"key": "type", "value": "doc"}}'
//! ```

mod read;
mod write;

use crate::config::StoreConfig;
use crate::models::MetadataFilter;
use crate::services::StoreFactory;
use crate::storage::VectorStore;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// embedstore - an embedded vector store with metadata filtering.
#[derive(Debug, Parser)]
#[command(name = "embedstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend name, overriding configuration.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database path, overriding configuration.
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show store statistics.
    Stats,

    /// Count records.
    Count {
        /// Metadata filter as JSON.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List records in id order.
    List {
        /// Page size.
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Records to skip.
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Metadata filter as JSON.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Fetch records by id.
    Get {
        /// Record ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Find the records most similar to a vector.
    Search {
        /// Query vector as a JSON array.
        #[arg(long)]
        vector: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Metadata filter as JSON.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Delete records by id.
    Delete {
        /// Record ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete every record matching a filter.
    DeleteWhere {
        /// Metadata filter as JSON.
        #[arg(short, long)]
        filter: String,
    },

    /// Remove every record and reset the dimension.
    Clear {
        /// Confirm the operation.
        #[arg(long)]
        yes: bool,
    },

    /// Upsert records from a JSON Lines file (`-` for stdin).
    Import {
        /// Input file.
        file: PathBuf,

        /// Records per transaction.
        #[arg(long, default_value = "500")]
        batch_size: usize,
    },

    /// Index text documents from a JSON Lines file (`-` for stdin).
    ///
    /// Uses the built-in feature-hashing embedder.
    Index {
        /// Input file of `{"id", "text", "metadata"}` objects.
        file: PathBuf,

        /// Embedding dimensions.
        #[arg(long, default_value = "384")]
        dimensions: usize,

        /// Delete indexed records whose id is absent from the input.
        #[arg(long)]
        prune: bool,
    },
}

/// Loads configuration for `cli`: the `--config` file or the default
/// location, then `EMBEDSTORE_*` variables, then command-line flags.
///
/// # Errors
///
/// Returns an error if an explicit config file cannot be loaded.
pub fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let config = match &cli.config {
        Some(path) => StoreConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StoreConfig::load_default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(backend) = &cli.backend {
        config.backend.clone_from(backend);
    }
    if let Some(path) = &cli.path {
        config.path = Some(path.clone());
    }
    Ok(config)
}

/// Runs `command` against the store described by `config`.
///
/// # Errors
///
/// Returns an error if the store cannot be created or the command fails.
pub fn run(command: Commands, config: &StoreConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let store = StoreFactory::create_shared(config)
        .with_context(|| format!("failed to open '{}' store", config.backend))?;
    let result = dispatch(command, &store, out);
    store.close();
    result
}

fn dispatch(
    command: Commands,
    shared: &Arc<dyn VectorStore>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let store = shared.as_ref();
    match command {
        Commands::Stats => read::stats(store, out),
        Commands::Count { filter } => read::count(store, filter.as_deref(), out),
        Commands::List {
            limit,
            offset,
            filter,
        } => read::list(store, limit, offset, filter.as_deref(), out),
        Commands::Get { ids } => read::get(store, &ids, out),
        Commands::Search {
            vector,
            top_k,
            filter,
        } => read::search(store, &vector, top_k, filter.as_deref(), out),
        Commands::Delete { ids } => write::delete(store, &ids, out),
        Commands::DeleteWhere { filter } => write::delete_where(store, &filter, out),
        Commands::Clear { yes } => write::clear(store, yes, out),
        Commands::Import { file, batch_size } => write::import(store, &file, batch_size, out),
        Commands::Index {
            file,
            dimensions,
            prune,
        } => write::index(shared, &file, dimensions, prune, out),
    }
}

/// Parses an optional JSON filter argument.
fn parse_filter(filter: Option<&str>) -> anyhow::Result<Option<MetadataFilter>> {
    filter
        .map(|json| {
            serde_json::from_str::<MetadataFilter>(json)
                .with_context(|| format!("invalid filter JSON: {json}"))
        })
        .transpose()
}

/// Writes `value` as one line of JSON.
fn emit<T: Serialize>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, value).context("failed to serialize output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}
