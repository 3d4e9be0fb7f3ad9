//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! The export format is a JSON object keyed by collection name, each value an
//! array of record bodies as served by the API. Import reads the same shape.

use super::CliError;
use crate::api::{self, AppState};
use crate::config::ServerConfig;
use casefile_core::{
    CasefileError, DateRange, EdgeAnchoring, Record, RecordId, RecordKind, RecordStore, Stamp,
    StorageBackend, build_graph,
    primitives::MAX_IMPORT_RECORDS,
    system::{self, DashboardAggregates},
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for import (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Actor recorded on imported records that carry no `createdBy`.
const IMPORT_ACTOR: &str = "import";

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CasefileError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CasefileError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CasefileError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `path` to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CasefileError> {
    let canonical = path.canonicalize().map_err(|e| {
        CasefileError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CasefileError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve the parent of `path`, which must be an existing directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, CasefileError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CasefileError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CasefileError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CasefileError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CasefileError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CasefileError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &Path,
    config_path: Option<&Path>,
    host: &str,
    port: Option<u16>,
    memory: bool,
) -> Result<(), CliError> {
    let mut config = ServerConfig::load(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }
    let store = if memory {
        StorageBackend::default()
    } else {
        StorageBackend::open(db_path)?
    };

    println!("Casefile Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:        {}", host);
    println!("  Port:        {}", config.port);
    println!("  Environment: {}", config.environment);
    if memory {
        println!("  Storage:     in-memory");
    } else {
        println!("  Database:    {:?}", db_path);
    }
    println!("  Uploads:     {:?}", config.upload_dir);
    println!();
    println!("Endpoints:");
    println!("  GET  /api/health          - Health check");
    println!("  POST /api/auth/login      - Obtain a token");
    println!("  *    /api/{{collection}}    - Record CRUD");
    println!("  GET  /api/board           - Relationship graph");
    println!("  GET  /api/dashboard       - Dashboard aggregates");
    println!("  POST /api/upload          - File upload");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, config.port);
    api::run_server(&addr, AppState::new(store, config)).await?;
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show record counts per collection.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), CliError> {
    let store = StorageBackend::open(db_path)?;
    let mut counts = Map::new();
    for kind in RecordKind::ALL {
        counts.insert(kind.collection().to_string(), store.count(kind)?.into());
    }

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "collections": counts,
        }))?;
        return Ok(());
    }

    println!("Casefile Status");
    println!("===============");
    println!("Database: {:?}", db_path);
    println!();
    for kind in RecordKind::ALL {
        println!("{:<24} {}", kind.label(), store.count(kind)?);
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), CliError> {
    if db_path.exists() {
        if !force {
            return Err(CasefileError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            )
            .into());
        }
        std::fs::remove_file(db_path)
            .map_err(|e| CasefileError::IoError(format!("Remove database: {}", e)))?;
    }

    StorageBackend::open(db_path)?;
    println!("Initialized new database at {:?}", db_path);
    Ok(())
}

// =============================================================================
// IMPORT / EXPORT
// =============================================================================

/// Counts from an import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records stored under the id they carried.
    pub restored: usize,
    /// Records without an id, stored under a fresh one.
    pub inserted: usize,
}

/// Load an export document into `store`.
///
/// Records with an id keep it (and their version); records without one are
/// inserted. Unknown collection names are an error.
pub fn import_document(
    store: &mut dyn RecordStore,
    document: Value,
    stamp: &Stamp,
) -> Result<ImportSummary, CasefileError> {
    let Value::Object(collections) = document else {
        return Err(CasefileError::SerializationError(
            "import document must be an object keyed by collection".to_string(),
        ));
    };

    let total: usize = collections
        .values()
        .map(|v| v.as_array().map_or(0, Vec::len))
        .sum();
    if total > MAX_IMPORT_RECORDS {
        return Err(CasefileError::SerializationError(format!(
            "Import holds {} records, maximum is {}",
            total, MAX_IMPORT_RECORDS
        )));
    }

    let mut summary = ImportSummary::default();
    for (name, records) in collections {
        let kind = RecordKind::from_collection(&name).ok_or_else(|| {
            CasefileError::SerializationError(format!("Unknown collection: {}", name))
        })?;
        let Value::Array(records) = records else {
            return Err(CasefileError::SerializationError(format!(
                "Collection {} must be an array",
                name
            )));
        };
        for body in records {
            let record = Record::from_json(kind, body)?;
            if record.id() == RecordId(0) {
                store.insert(record, stamp)?;
                summary.inserted += 1;
            } else {
                store.restore(record)?;
                summary.restored += 1;
            }
        }
    }
    Ok(summary)
}

/// Dump every collection as an export document.
pub fn export_document(store: &dyn RecordStore) -> Result<Value, CasefileError> {
    let mut collections = Map::new();
    for kind in RecordKind::ALL {
        let records = store
            .list(kind)?
            .iter()
            .map(Record::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        collections.insert(kind.collection().to_string(), Value::Array(records));
    }
    Ok(Value::Object(collections))
}

/// Import records from a JSON export.
pub fn cmd_import(db_path: &Path, input: &Path) -> Result<(), CliError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| CasefileError::IoError(format!("Read file: {}", e)))?;
    let document: Value = serde_json::from_slice(&data)
        .map_err(|e| CasefileError::SerializationError(format!("Parse import: {}", e)))?;

    let mut store = StorageBackend::open(db_path)?;
    let stamp = Stamp::new(
        Some(IMPORT_ACTOR.to_string()),
        chrono::Utc::now().to_rfc3339(),
    );
    let summary = import_document(&mut store, document, &stamp)?;

    println!(
        "Imported {} records ({} with original ids, {} new)",
        summary.restored + summary.inserted,
        summary.restored,
        summary.inserted
    );
    Ok(())
}

/// Export every collection to a JSON file.
pub fn cmd_export(db_path: &Path, output: &Path) -> Result<(), CliError> {
    let validated_output = validate_output_path(output)?;
    let store = StorageBackend::open(db_path)?;

    let document = export_document(&store)?;
    let data = serde_json::to_vec_pretty(&document)
        .map_err(|e| CasefileError::SerializationError(e.to_string()))?;
    std::fs::write(&validated_output, &data)
        .map_err(|e| CasefileError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// DASHBOARD / BOARD
// =============================================================================

/// Print dashboard aggregates.
pub fn cmd_dashboard(
    db_path: &Path,
    json_mode: bool,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(), CliError> {
    let snapshot = StorageBackend::open(db_path)?.snapshot()?;
    let aggregates = match (from, to) {
        (Some(from), Some(to)) => system::compute_in_range(&snapshot, &DateRange::new(from, to)?),
        _ => system::compute(&snapshot),
    };

    if json_mode {
        print_json(&aggregates)?;
    } else {
        print_dashboard(&aggregates);
    }
    Ok(())
}

fn print_dashboard(aggregates: &DashboardAggregates) {
    println!("Casefile Dashboard");
    println!("==================");
    println!("Occurrences: {}", aggregates.total_occurrences);
    println!("Geolocated:  {}", aggregates.geolocated);
    println!("Persons:     {}", aggregates.total_persons);
    println!("Linkable:    {}", aggregates.connection_count);

    let tables = [
        ("By type", &aggregates.by_type),
        ("By severity", &aggregates.by_severity),
        ("By status", &aggregates.by_status),
        ("By unit", &aggregates.by_unit),
        ("By responsible", &aggregates.by_responsible),
        ("By month", &aggregates.by_month),
    ];
    for (title, table) in tables {
        if table.is_empty() {
            continue;
        }
        println!();
        println!("{}:", title);
        for (label, count) in table {
            println!("  {:<22} {}", label, count);
        }
    }
}

/// Print the relationship graph for `search`.
pub fn cmd_board(
    db_path: &Path,
    json_mode: bool,
    search: &str,
    all_persons: bool,
) -> Result<(), CliError> {
    let snapshot = StorageBackend::open(db_path)?.snapshot()?;
    let anchoring = if all_persons {
        EdgeAnchoring::AllPersons
    } else {
        EdgeAnchoring::FirstPerson
    };
    let graph = build_graph(search, &snapshot, anchoring);

    if json_mode {
        print_json(&graph)?;
        return Ok(());
    }

    if graph.is_empty() {
        println!("No person matches '{}'", search);
        return Ok(());
    }
    println!("Nodes:");
    for node in &graph.nodes {
        println!(
            "  {:<28} {:<22} {} ({:.0}, {:.0})",
            node.id.as_str(),
            node.kind.label(),
            node.title,
            node.x,
            node.y
        );
    }
    println!("Edges:");
    for edge in &graph.edges {
        println!("  {} -> {}", edge.from.as_str(), edge.to.as_str());
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use casefile_core::MemoryStore;
    use serde_json::json;

    fn stamp() -> Stamp {
        Stamp::new(None, "2024-05-01T00:00:00Z")
    }

    #[test]
    fn import_restores_ids_and_inserts_the_rest() {
        let mut store = MemoryStore::new();
        let document = json!({
            "persons": [
                {"id": 7, "displayName": "Jane", "key": "12345678900", "version": 3},
                {"displayName": "John", "key": "98765432100"}
            ],
            "vehicles": [{"plate": "ABC1234", "primaryLinkKey": "12345678900", "id": 2}]
        });

        let summary = import_document(&mut store, document, &stamp()).unwrap();
        assert_eq!(summary, ImportSummary { restored: 2, inserted: 1 });

        let jane = store.get(RecordKind::Person, RecordId(7)).unwrap().unwrap();
        assert_eq!(jane.meta().version, 3);
        // Fresh ids continue past restored ones.
        let john = &store.list(RecordKind::Person).unwrap()[1];
        assert_eq!(john.id(), RecordId(8));
        assert_eq!(john.meta().created_by, None);
    }

    #[test]
    fn import_rejects_unknown_collection() {
        let mut store = MemoryStore::new();
        let err = import_document(&mut store, json!({"aliens": []}), &stamp()).unwrap_err();
        assert!(matches!(err, CasefileError::SerializationError(_)));
    }

    #[test]
    fn export_then_import_preserves_records() {
        let mut source = MemoryStore::new();
        import_document(
            &mut source,
            json!({"persons": [{"displayName": "Jane", "key": "111"}]}),
            &stamp(),
        )
        .unwrap();
        let document = export_document(&source).unwrap();
        assert_eq!(document["persons"][0]["displayName"], "Jane");
        assert_eq!(document["occurrences"], json!([]));

        let mut target = MemoryStore::new();
        let summary = import_document(&mut target, document, &stamp()).unwrap();
        assert_eq!(summary.restored, 1);
        assert_eq!(
            source.list(RecordKind::Person).unwrap(),
            target.list(RecordKind::Person).unwrap()
        );
    }

    #[test]
    fn output_path_needs_existing_parent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(&dir.path().join("out.json")).is_ok());
        assert!(validate_output_path(&dir.path().join("missing/out.json")).is_err());
        assert!(validate_file_path(dir.path()).is_err());
    }
}
