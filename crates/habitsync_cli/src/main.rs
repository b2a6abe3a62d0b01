//! habitsync CLI
//!
//! Operator tools for a habitsync data directory.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics
//! - `verify` - Verify journal integrity
//! - `dump-journal` - Dump committed batches for debugging
//! - `sync` - Apply a sync request as a user and print the response
//! - `token` - Mint a bearer token

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// habitsync command-line tools.
#[derive(Parser)]
#[command(name = "habitsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long, env = "HABITSYNC_DATA")]
    data: Option<PathBuf>,

    /// Token signing secret
    #[arg(global = true, long, env = "HABITSYNC_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify journal integrity
    Verify,

    /// Dump committed batches for debugging
    DumpJournal {
        /// Maximum number of batches to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply a JSON sync request as a user and print the response
    Sync {
        /// User to act as
        #[arg(short, long)]
        user: Uuid,

        /// Request file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        request: String,
    },

    /// Mint a bearer token for a user
    Token {
        /// User the token authenticates as
        #[arg(short, long)]
        user: Uuid,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.data.ok_or("Data directory required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.data.ok_or("Data directory required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::DumpJournal { limit, format } => {
            let path = cli.data.ok_or("Data directory required for dump-journal")?;
            commands::dump_journal::run(&path, limit, &format)?;
        }
        Commands::Sync { user, request } => {
            let path = cli.data.ok_or("Data directory required for sync")?;
            commands::sync::run(&path, user, &request)?;
        }
        Commands::Token { user } => {
            let secret = cli.secret.ok_or("Signing secret required for token")?;
            commands::token::run(secret.as_bytes(), user)?;
        }
    }

    Ok(())
}
