//! # practice-sync
//!
//! CLI tool for driving the offline practice engine.
//!
//! ## Commands
//!
//! - `status`: Show connectivity, cache, queue and progress
//! - `fill`: Pre-fetch items for a category
//! - `take`: Serve one cached item
//! - `answer`: Record an answer in the result queue
//! - `drain`: Submit queued results now
//! - `sweep`: Drop expired cached items
//! - `progress`: Show (or initialize) local progress
//!
//! ## Example
//!
//! ```bash
//! # Cache ten arithmetic items while online
//! practice-sync fill --category arithmetic --count 10
//!
//! # Later, offline
//! practice-sync take --category arithmetic
//! practice-sync answer --item q-1 --answer 23 --elapsed-ms 4200 --category arithmetic
//!
//! # Back online
//! practice-sync drain
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{answer, drain, fill, progress, status, sweep, take};

/// CLI tool for driving the offline practice engine.
#[derive(Parser, Debug)]
#[command(name = "practice-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding the offline database and practice-sync.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use the in-process mock work source, always online (for testing/demo)
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show connectivity, cache, queue and progress
    Status,

    /// Pre-fetch items for a category
    Fill {
        /// Category to fetch
        #[arg(long, short)]
        category: String,

        /// Number of items to request
        #[arg(long, short = 'n', default_value = "10")]
        count: usize,

        /// Difficulty tier (novice, beginner, intermediate, advanced, expert)
        #[arg(long, short)]
        difficulty: Option<String>,
    },

    /// Serve one cached item
    Take {
        /// Category to serve from
        #[arg(long, short)]
        category: String,
    },

    /// Record an answer in the result queue
    Answer {
        /// Remote item identifier
        #[arg(long)]
        item: String,

        /// The user's answer
        #[arg(long, short)]
        answer: String,

        /// Time spent answering, in milliseconds
        #[arg(long)]
        elapsed_ms: u64,

        /// Category the item belongs to
        #[arg(long, short)]
        category: String,
    },

    /// Submit queued results now
    Drain,

    /// Drop expired cached items
    Sweep,

    /// Show local progress
    Progress {
        /// Create a level-1 snapshot for the configured user first
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Status => {
            status::run(&data_dir, cli.mock).await?;
        }
        Commands::Fill {
            category,
            count,
            difficulty,
        } => {
            fill::run(&data_dir, cli.mock, &category, count, difficulty.as_deref()).await?;
        }
        Commands::Take { category } => {
            take::run(&data_dir, cli.mock, &category).await?;
        }
        Commands::Answer {
            item,
            answer,
            elapsed_ms,
            category,
        } => {
            answer::run(&data_dir, cli.mock, &item, &answer, elapsed_ms, &category).await?;
        }
        Commands::Drain => {
            drain::run(&data_dir, cli.mock).await?;
        }
        Commands::Sweep => {
            sweep::run(&data_dir, cli.mock).await?;
        }
        Commands::Progress { init } => {
            progress::run(&data_dir, cli.mock, init).await?;
        }
    }

    Ok(())
}

/// Log to stderr at `info` unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for practice-sync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "practice", "practice-sync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
