//! GrossBook CLI - ledger operations from command line
//!
//! Usage:
//! ```bash
//! grossbook deposit 1 100
//! grossbook withdraw 1 10 --currency EUR
//! grossbook transfer 1 2 40
//! grossbook balance 1
//! grossbook history 1 --limit 20 --mode amount
//! grossbook status
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod config;
mod db;

use commands::ledger::{self, LedgerCommand};

/// GrossBook - multi-user ledger on SQLite
#[derive(Parser)]
#[command(name = "grossbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, env = "GROSSBOOK_DB", default_value = "data/grossbook.db", global = true)]
    pub db: PathBuf,

    /// exchangeratesapi.io access key; without it only --rate conversions work
    #[arg(long, env = "EXCHANGE_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Exchange API base URL
    #[arg(
        long,
        env = "EXCHANGE_API_URL",
        default_value = grossbook_exchange::DEFAULT_API_URL,
        global = true
    )]
    pub exchange_url: String,

    /// Currency all balances are kept in
    #[arg(
        long,
        env = "SETTLEMENT_CURRENCY",
        default_value = grossbook_exchange::DEFAULT_SETTLEMENT_CURRENCY,
        global = true
    )]
    pub settlement_currency: String,

    /// Fixed rate used when no API key is set, e.g. --rate EUR=75
    #[arg(long = "rate", value_parser = config::parse_rate, global = true)]
    pub rates: Vec<config::FixedRate>,

    /// Upper bound for one request, exchange calls included
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub timeout_secs: u64,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Ledger(LedgerCommand),

    /// Initialize database with schema
    Init {
        /// Force re-initialization (drops existing data)
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_env();
    let cli = Cli::parse();
    config::init_tracing(cli.log_file.as_deref())?;

    // Ensure data directory exists
    config::ensure_parent_dir(&cli.db)?;

    match &cli.command {
        Commands::Init { force } => {
            db::init_database(&cli.db, *force).await?;
            println!("✅ Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db).await?;
        }

        Commands::Ledger(command) => {
            let book = config::open_ledger(&cli).await?;
            let outcome = ledger::run(&book, command, cli.timeout()).await;
            book.shutdown().await;

            if !outcome? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
