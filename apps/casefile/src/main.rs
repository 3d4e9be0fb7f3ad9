//! # Casefile - Investigative Record Server
//!
//! The main binary: the Record Store and identity provider over HTTP, plus
//! administrative CLI commands against the same database.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  apps/casefile (THE BINARY)               │
//! │                                                           │
//! │  ┌─────────────┐    ┌──────────────────────────────────┐  │
//! │  │   CLI       │    │   HTTP API (axum)                │  │
//! │  │  (clap)     │    │   auth · records · board · files │  │
//! │  └──────┬──────┘    └────────────────┬─────────────────┘  │
//! │         └──────────────┬─────────────┘                    │
//! │                        ▼                                  │
//! │                ┌───────────────┐                          │
//! │                │ casefile-core │                          │
//! │                └───────────────┘                          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! casefile server --port 3001
//!
//! # CLI operations
//! casefile status
//! casefile import -f backup.json
//! casefile board --search 123.456.789-00
//! ```

use casefile::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // CASEFILE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CASEFILE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "casefile=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if cli.verbose {
        tracing::debug!(?cli, "Parsed command line");
    }
    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
   ___               __ _ _
  / __\__ _ ___  ___/ _(_) | ___
 / /  / _` / __|/ _ \ |_| | |/ _ \
/ /__| (_| \__ \  __/  _| | |  __/
\____/\__,_|___/\___|_| |_|_|\___|

  Casefile Record Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
