//! # Casefile CLI Module
//!
//! This module implements the CLI interface for Casefile.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show record counts per collection
//! - `init` - Initialize a new database
//! - `import` - Load records from a JSON export
//! - `export` - Write every collection to a JSON file
//! - `dashboard` - Print dashboard aggregates
//! - `board` - Print the relationship graph for a search key

mod commands;

use crate::config::ConfigError;
use casefile_core::CasefileError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CasefileError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Casefile - investigative record server
///
/// Persons, the records linked to them, and the board that connects them.
#[derive(Parser, Debug)]
#[command(name = "casefile")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the redb database
    #[arg(short = 'D', long, global = true, default_value = "casefile.db")]
    pub database: PathBuf,

    /// Optional TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "0.0.0.0")]
        host: String,

        /// Port to bind to (overrides PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep records in memory instead of the database file
        #[arg(long)]
        memory: bool,
    },

    /// Show record counts per collection
    Status,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Import records from a JSON export
    Import {
        /// Input file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export every collection to a JSON file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print dashboard aggregates
    Dashboard {
        /// First day of the range (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Last day of the range (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Print the relationship graph for a search key
    Board {
        /// Key to search for (punctuation is ignored)
        #[arg(short, long)]
        search: String,

        /// Connect records to every matched person, not just the first
        #[arg(long)]
        all_persons: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CliError> {
    let json_mode = cli.json_mode;
    let db = cli.database.as_path();

    match cli.command {
        Some(Commands::Server { host, port, memory }) => {
            cmd_server(db, cli.config.as_deref(), &host, port, memory).await
        }
        Some(Commands::Status) | None => cmd_status(db, json_mode),
        Some(Commands::Init { force }) => cmd_init(db, force),
        Some(Commands::Import { file }) => cmd_import(db, &file),
        Some(Commands::Export { output }) => cmd_export(db, &output),
        Some(Commands::Dashboard { from, to }) => {
            cmd_dashboard(db, json_mode, from.as_deref(), to.as_deref())
        }
        Some(Commands::Board {
            search,
            all_persons,
        }) => cmd_board(db, json_mode, &search, all_persons),
    }
}
