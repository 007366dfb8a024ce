//! Disk-backed attachment store.
//!
//! Accepts uploaded files under the constraints the review workflow imposes
//! (PDF/DOC/DOCX, at most 5 MB each, at most 5 per request) and returns the
//! generated filenames used as stable attachment references. Stored files
//! are served back under the `/uploads` static path.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::AppError;
use crate::validation::rules;

pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_FILES_PER_REQUEST: usize = rules::MAX_ATTACHMENTS_PER_REQUEST;

/// Upper bound for a whole multipart request body: the maximum number of
/// files at their maximum size, plus headroom for the text fields and
/// multipart framing.
pub const MAX_REQUEST_BODY_BYTES: usize = MAX_FILES_PER_REQUEST * MAX_FILE_BYTES + 2 * 1024 * 1024;

const ALLOWED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// A file received in a multipart request, buffered in memory before it is
/// validated and persisted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn is_allowed_mime(content_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&content_type)
}

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Validates and persists a batch of uploaded files, returning the
    /// stored filenames in upload order.
    ///
    /// The batch is all-or-nothing: every file is checked against the
    /// count/type/size constraints before anything touches the disk, and a
    /// failed write removes the files already written, so callers never see
    /// a partially stored batch.
    pub async fn store_all(&self, files: Vec<UploadedFile>) -> Result<Vec<String>, AppError> {
        validate_batch(&files)?;

        if files.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))?;

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let name = stored_file_name(&file.original_name);
            if let Err(err) = tokio::fs::write(self.root.join(&name), &file.bytes).await {
                self.remove_all(&stored).await;
                return Err(AppError::InternalServerError(err.into()));
            }
            stored.push(name);
        }
        Ok(stored)
    }

    /// Best-effort removal of previously stored files.
    pub async fn remove_all(&self, names: &[String]) {
        for name in names {
            if let Err(err) = tokio::fs::remove_file(self.root.join(name)).await {
                tracing::warn!(file = %name, error = %err, "failed to remove stored attachment");
            }
        }
    }
}

fn validate_batch(files: &[UploadedFile]) -> Result<(), AppError> {
    rules::validate_attachment_count(files.len())?;
    for file in files {
        if !is_allowed_mime(&file.content_type) {
            return Err(AppError::BadRequest(
                "Only PDF and DOC files are allowed".to_string(),
            ));
        }
        if file.bytes.len() > MAX_FILE_BYTES {
            return Err(AppError::BadRequest(
                "File size too large. Maximum size is 5MB.".to_string(),
            ));
        }
    }
    Ok(())
}

fn stored_file_name(original_name: &str) -> String {
    format!(
        "files-{}{}",
        Uuid::new_v4(),
        extension_of(original_name)
    )
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
