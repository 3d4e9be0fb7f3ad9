//! # Casefile Board
//!
//! Command-line board over a Casefile server.
//!
//! Reads configuration from environment variables:
//! - `CASEFILE_URL` - server URL (default: `http://localhost:3001`)
//! - `CASEFILE_EMAIL` / `CASEFILE_PASSWORD` - admin credentials
//!   (default: the development account)

use casefile_board::{CancelToken, DataCache, RecordClient};
use casefile_core::{EdgeAnchoring, RecordId, RecordKind};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

const DEFAULT_URL: &str = "http://localhost:3001";
const DEFAULT_EMAIL: &str = "admin@casefile.local";
const DEFAULT_PASSWORD: &str = "admin";

/// Casefile board client
#[derive(Parser, Debug)]
#[command(name = "casefile-board")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the relationship board for a key
    Search {
        key: String,

        /// Connect records to every matched person, not just the first
        #[arg(long)]
        all_persons: bool,
    },

    /// Suggest keys containing the typed digits
    Suggest { prefix: String },

    /// Show dashboard aggregates
    Dashboard,

    /// Create a record from a JSON object
    Create { collection: String, json: String },

    /// Patch a record with a JSON object
    Update {
        collection: String,
        id: u64,
        json: String,
    },

    /// Delete a record
    Delete { collection: String, id: u64 },
}

fn kind_of(collection: &str) -> Result<RecordKind, String> {
    RecordKind::from_collection(collection).ok_or_else(|| {
        let known: Vec<&str> = RecordKind::ALL.iter().map(|k| k.collection()).collect();
        format!(
            "unknown collection '{}'; expected one of: {}",
            collection,
            known.join(", ")
        )
    })
}

fn print_json(value: &impl serde::Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casefile_board=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let url = std::env::var("CASEFILE_URL").unwrap_or_else(|_| DEFAULT_URL.into());
    let email = std::env::var("CASEFILE_EMAIL").unwrap_or_else(|_| DEFAULT_EMAIL.into());
    let password = std::env::var("CASEFILE_PASSWORD").unwrap_or_else(|_| DEFAULT_PASSWORD.into());

    tracing::info!("Casefile board client, target: {}", url);

    let mut cache = DataCache::new(RecordClient::new(url));
    cache.login(&email, &password).await?;
    let token = CancelToken::never();

    match cli.command {
        Command::Search { key, all_persons } => {
            cache.fetch_all(&token).await?;
            let anchoring = if all_persons {
                EdgeAnchoring::AllPersons
            } else {
                EdgeAnchoring::FirstPerson
            };
            print_json(&cache.board(&key, anchoring))?;
        }
        Command::Suggest { prefix } => {
            cache.fetch_all(&token).await?;
            for key in cache.suggestions(&prefix) {
                println!("{}", key);
            }
        }
        Command::Dashboard => {
            cache.fetch_all(&token).await?;
            print_json(&cache.dashboard())?;
        }
        Command::Create { collection, json } => {
            let kind = kind_of(&collection)?;
            let data: Value = serde_json::from_str(&json)?;
            let id = cache.create_record(kind, data).await?;
            println!("Created {}/{}", kind, id);
        }
        Command::Update {
            collection,
            id,
            json,
        } => {
            let kind = kind_of(&collection)?;
            let patch: Map<String, Value> = serde_json::from_str(&json)?;
            cache.fetch_collection(kind, &token).await?;
            cache.mutate_record(kind, RecordId(id), patch).await?;
            if let Some(record) = cache.record(kind, RecordId(id)) {
                print_json(&record.to_json()?)?;
            }
        }
        Command::Delete { collection, id } => {
            let kind = kind_of(&collection)?;
            cache.delete_record(kind, RecordId(id)).await?;
            println!("Deleted {}/{}", kind, id);
        }
    }
    Ok(())
}
