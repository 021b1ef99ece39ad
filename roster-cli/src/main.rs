//! # roster-cli
//!
//! CLI tool to inspect and edit the rostersync cache.
//!
//! ## Commands
//!
//! - `list`: Show an account's cached contacts or bookmarks
//! - `tags`: Show the tag index over one or more accounts
//! - `import`: Replace an account's cached contacts with a roster snapshot
//! - `export`: Print an account's cached contacts as a roster snapshot
//! - `replay`: Apply a roster snapshot through the sync engine
//!
//! ## Example
//!
//! ```bash
//! # Seed the cache from a snapshot file
//! roster-cli import --account me@example.org --file roster.json
//!
//! # Look at it
//! roster-cli list --account me@example.org
//! roster-cli tags --account me@example.org --account work@example.com
//!
//! # Round-trip
//! roster-cli export --account me@example.org > roster.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use roster_client::{JsonFileStore, RosterConfig};
use roster_core::ServiceKind;
use roster_types::Address;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{export, import, list, replay, tags};

/// CLI tool to inspect and edit the rostersync cache.
#[derive(Parser, Debug)]
#[command(name = "roster-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory (overrides the configuration)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show an account's cached items
    List {
        /// Account address
        #[arg(long, short)]
        account: Address,

        /// Only this backend (default: both)
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Show the tag index over the given accounts
    Tags {
        /// Account addresses
        #[arg(long = "account", short, required = true)]
        accounts: Vec<Address>,
    },

    /// Replace an account's cached contacts with a roster snapshot
    Import {
        /// Account address
        #[arg(long, short)]
        account: Address,

        /// Roster snapshot file (JSON)
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Print an account's cached contacts as a roster snapshot
    Export {
        /// Account address
        #[arg(long, short)]
        account: Address,
    },

    /// Apply a roster snapshot through the sync engine, as if a live
    /// service had reported it
    Replay {
        /// Account address
        #[arg(long, short)]
        account: Address,

        /// Roster snapshot file (JSON)
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Contacts,
    Bookmarks,
}

impl From<KindArg> for ServiceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Contacts => ServiceKind::Contacts,
            KindArg::Bookmarks => ServiceKind::Bookmarks,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RosterConfig::from_file(path)?,
        None => RosterConfig::default(),
    };
    init_logging(&config.logging.filter);

    // Determine cache directory
    let cache_dir = match cli.cache_dir.or_else(|| config.cache.directory.clone()) {
        Some(dir) => dir,
        None => default_cache_dir()?,
    };
    tracing::debug!("Using cache directory {}", cache_dir.display());

    tokio::fs::create_dir_all(&cache_dir)
        .await
        .context("Failed to create cache directory")?;
    let store = JsonFileStore::new(&cache_dir);

    match cli.command {
        Commands::List { account, kind } => {
            list::run(&store, &account, kind.map(ServiceKind::from)).await?;
        }
        Commands::Tags { accounts } => {
            tags::run(&store, &accounts).await?;
        }
        Commands::Import { account, file } => {
            import::run(&store, &account, &file).await?;
        }
        Commands::Export { account } => {
            export::run(&store, &account).await?;
        }
        Commands::Replay { account, file } => {
            let delay = config.writeback.delay_config()?;
            replay::run(&store, &account, &file, delay).await?;
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over the configured filter.
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default cache directory for roster-cli.
fn default_cache_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "rostersync", "roster-cli")
        .context("Could not determine home directory")?;
    Ok(dirs.cache_dir().to_path_buf())
}
