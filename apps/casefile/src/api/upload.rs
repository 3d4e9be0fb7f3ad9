//! # File Ingestion
//!
//! `POST /api/upload` accepts up to [`MAX_UPLOAD_FILES`] multipart files,
//! writes them under the upload directory and answers with attachment
//! references. The files are then served statically at `/uploads/<name>`.

use super::{AppState, error::ApiError};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
};
use casefile_core::{Attachment, primitives::MAX_UPLOAD_FILES};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// URL prefix the upload directory is served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Strip directory components and anything outside a conservative charset.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Stored name: a random v4 uuid ahead of the sanitized original.
fn stored_name(original: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize_filename(original))
}

/// A fully read multipart file, not yet on disk.
struct PendingFile {
    original: String,
    content_type: String,
    bytes: Bytes,
}

/// Write a new file; an existing file of the same name is never replaced.
async fn write_new_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}

async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(file = %path.display(), error = %e, "Cannot remove partial upload");
        }
    }
}

/// Store every pending file or none of them.
async fn store_all(
    dir: &Path,
    pending: &[PendingFile],
) -> Result<Vec<String>, ApiError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Cannot create upload directory: {}", e)))?;

    let mut written = Vec::with_capacity(pending.len());
    let mut names = Vec::with_capacity(pending.len());
    for file in pending {
        let name = stored_name(&file.original);
        let path = dir.join(&name);
        if let Err(e) = write_new_file(&path, &file.bytes).await {
            // A half-written file may exist on some failures.
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                written.push(path);
            }
            remove_files(&written).await;
            return Err(ApiError::Internal(format!("Cannot store upload: {}", e)));
        }
        tracing::info!(file = %name, size = file.bytes.len(), "File uploaded");
        written.push(path);
        names.push(name);
    }
    Ok(names)
}

/// `POST /api/upload`
///
/// The whole body is read and checked before anything touches the disk, so
/// a rejected request leaves no files behind.
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    let mut pending = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };
        if pending.len() >= MAX_UPLOAD_FILES {
            return Err(ApiError::BadRequest(format!(
                "At most {} files per upload",
                MAX_UPLOAD_FILES
            )));
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Cannot read upload: {}", e)))?;
        pending.push(PendingFile {
            original,
            content_type,
            bytes,
        });
    }

    if pending.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let names = store_all(&state.config.upload_dir, &pending).await?;
    let uploaded_at = Utc::now().to_rfc3339();
    let attachments = pending
        .into_iter()
        .zip(names)
        .map(|(file, name)| Attachment {
            size: file.bytes.len() as u64,
            name: file.original,
            content_type: file.content_type,
            url: format!("{}/{}", UPLOADS_ROUTE, name),
            uploaded_at: uploaded_at.clone(),
        })
        .collect();
    Ok(Json(attachments))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\photo 1.jpg"), "photo_1.jpg");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "unnamed");
        assert_eq!(sanitize_filename("../"), "unnamed");
    }

    #[test]
    fn stored_names_are_distinct() {
        let names: std::collections::BTreeSet<String> =
            (0..100).map(|_| stored_name("scan.pdf")).collect();
        assert_eq!(names.len(), 100);
        assert!(names.iter().all(|n| n.ends_with("-scan.pdf")));
    }

    #[tokio::test]
    async fn existing_file_is_never_replaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("taken.pdf");
        write_new_file(&path, b"first").await.expect("first write");

        let err = write_new_file(&path, b"second").await.expect_err("second write");

        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).expect("read"), b"first");
    }
}
