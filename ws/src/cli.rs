//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// winsync - serverless window discovery
#[derive(Parser, Debug)]
#[command(name = "winsync")]
#[command(author, version, about = "Discover and track cooperating windows through a shared store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Shared store directory (overrides config)
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one headless instance until Ctrl-C
    Run {
        /// Window left edge in screen pixels
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        x: i32,

        /// Window top edge in screen pixels
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        y: i32,

        /// Window width
        #[arg(short, long, default_value = "800")]
        w: i32,

        /// Window height
        #[arg(short = 'H', long, default_value = "600")]
        h: i32,

        /// Use this id instead of generating one
        #[arg(long)]
        id: Option<i64>,

        /// Metadata entries (key=value), repeatable
        #[arg(short, long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// JSON shape file re-read every tick; edit it to move the window
        #[arg(long)]
        shape_file: Option<PathBuf>,

        /// Clear all shared state before joining
        #[arg(long)]
        clear: bool,

        /// Stop after this many ticks
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Show the shared instance list
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove all shared state
    Clear,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parse `key=value` metadata arguments
///
/// Values that parse as JSON (numbers, booleans, quoted strings, objects)
/// keep their type; anything else is stored as a string.
pub fn parse_meta(entries: &[String]) -> eyre::Result<crate::MetaData> {
    let mut meta = crate::MetaData::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| eyre::eyre!("Metadata must be KEY=VALUE, got {:?}", entry))?;
        if key.is_empty() {
            return Err(eyre::eyre!("Metadata key is empty in {:?}", entry));
        }
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        meta.insert(key.to_string(), value);
    }
    Ok(meta)
}
