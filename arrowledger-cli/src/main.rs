//! Arrowledger CLI - operator tooling for the Arrow Financial ledger

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{doctor, list, logs, seed, setup, status};

/// arl - Arrow Financial ledger operator CLI
#[derive(Parser)]
#[command(name = "arl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the admin, taylor, and dad users
    Setup {
        /// Email domain for the created users
        #[arg(long, default_value = "arrowfinancial.com")]
        domain: String,
    },

    /// List transactions in display order
    List {
        /// Filter by category name
        #[arg(long)]
        category: Option<String>,
        /// Start date (DD/MM/YYYY, inclusive)
        #[arg(long)]
        from: Option<String>,
        /// End date (DD/MM/YYYY, inclusive)
        #[arg(long)]
        to: Option<String>,
        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,
        /// Page size (defaults to the configured page size)
        #[arg(long)]
        limit: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Seed sample transactions
    Seed {
        /// Number of transactions to create
        #[arg(long, default_value = "40")]
        count: usize,
    },

    /// Show ledger status and summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View the audit trail
    Logs {
        /// Filter by user id
        #[arg(long)]
        user: Option<String>,
        /// Filter by action (login, logout, create, update, delete, reorder, checkbox)
        #[arg(long)]
        action: Option<String>,
        /// Start date (DD/MM/YYYY, inclusive)
        #[arg(long)]
        from: Option<String>,
        /// End date (DD/MM/YYYY, inclusive)
        #[arg(long)]
        to: Option<String>,
        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,
        /// Page size (defaults to the configured audit page size)
        #[arg(long)]
        limit: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger health checks
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Setup { domain } => setup::run(&domain).await,
        Commands::List {
            category,
            from,
            to,
            page,
            limit,
            json,
        } => list::run(category, from, to, page, limit, json).await,
        Commands::Seed { count } => seed::run(count).await,
        Commands::Status { json } => status::run(json).await,
        Commands::Logs {
            user,
            action,
            from,
            to,
            page,
            limit,
            json,
        } => logs::run(user, action, from, to, page, limit, json).await,
        Commands::Doctor { json } => doctor::run(json).await,
    }
}
