use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{CartographyApi, ImportSummary};
use crate::error::SessionError;

use super::chunker::{encode, FileType};

// Set to false to silence per-chunk logging
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Share of the upload step each file accounts for.
pub const FILE_PROGRESS_WEIGHT: f64 = 50.0;

/// A selected CSV file, read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub async fn read(path: &Path) -> Result<Self, SessionError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SessionError::FileRead {
                    path: PathBuf::from(path),
                    source,
                })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, content })
    }
}

/// File slots of an upload. Pages is required to start, links is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedFiles {
    pub pages: Option<UploadFile>,
    pub links: Option<UploadFile>,
}

impl SelectedFiles {
    pub fn new(pages: UploadFile, links: Option<UploadFile>) -> Self {
        Self {
            pages: Some(pages),
            links,
        }
    }

    pub fn can_start(&self) -> bool {
        self.pages.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub chunks_sent: usize,
    pub rows_sent: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSummary {
    pub pages: UploadReport,
    pub links: UploadReport,
    pub import: ImportSummary,
}

/// Progress notification emitted after every acknowledged chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkProgress {
    pub file_type: FileType,
    pub completed: usize,
    pub total: usize,
    /// Completed share of this file scaled by its weight, offset by the
    /// files uploaded before it.
    pub percentage: f64,
}

pub struct Uploader {
    api: Arc<dyn CartographyApi>,
    rows_per_chunk: NonZeroUsize,
}

impl Uploader {
    pub fn new(api: Arc<dyn CartographyApi>, rows_per_chunk: NonZeroUsize) -> Self {
        Self {
            api,
            rows_per_chunk,
        }
    }

    /// Sends one file chunk by chunk, in order, stopping at the first failure.
    /// A cancelled `cancel_token` stops before the next chunk is sent.
    ///
    /// `on_progress` receives `completed / total * weight` after each chunk.
    pub async fn upload_file<F>(
        &self,
        project_id: &str,
        file: Option<&UploadFile>,
        file_type: FileType,
        weight: f64,
        cancel_token: &CancellationToken,
        mut on_progress: F,
    ) -> Result<UploadReport, SessionError>
    where
        F: FnMut(ChunkProgress) + Send,
    {
        let Some(file) = file else {
            return Ok(UploadReport::default());
        };

        let chunks = encode(file_type, &file.content, self.rows_per_chunk);
        if chunks.is_empty() {
            log_warn!("{} file {} has no data rows; nothing to upload", file_type, file.name);
            return Ok(UploadReport::default());
        }

        let total = chunks.len();
        log_info!(
            "Uploading {} ({} bytes) as {} {} chunks",
            file.name,
            file.content.len(),
            total,
            file_type
        );

        let mut report = UploadReport::default();
        for chunk in &chunks {
            if cancel_token.is_cancelled() {
                log_warn!(
                    "Upload of {} cancelled before chunk {}/{}",
                    file_type,
                    chunk.index + 1,
                    total
                );
                return Err(SessionError::Superseded);
            }

            self.api
                .import_chunk(project_id, chunk)
                .await
                .map_err(|source| {
                    log_error!(
                        "{} chunk {}/{} rejected: {}",
                        file_type,
                        chunk.index + 1,
                        total,
                        source
                    );
                    SessionError::ChunkUploadFailed {
                        file_type,
                        chunk_index: chunk.index,
                        total_chunks: total,
                        source,
                    }
                })?;

            report.chunks_sent += 1;
            report.rows_sent += chunk.row_count;
            log_debug!("{} chunk {}/{} uploaded", file_type, chunk.index + 1, total);

            on_progress(ChunkProgress {
                file_type,
                completed: report.chunks_sent,
                total,
                percentage: report.chunks_sent as f64 / total as f64 * weight,
            });
        }

        log_info!("Upload of {} done: {} rows", file_type, report.rows_sent);
        Ok(report)
    }

    /// Uploads pages then links, then finalizes the import once. Nothing more
    /// is sent once `cancel_token` is cancelled.
    pub async fn upload_all<F>(
        &self,
        project_id: &str,
        files: &SelectedFiles,
        cancel_token: &CancellationToken,
        mut on_progress: F,
    ) -> Result<UploadSummary, SessionError>
    where
        F: FnMut(ChunkProgress) + Send,
    {
        let pages = self
            .upload_file(
                project_id,
                files.pages.as_ref(),
                FileType::Pages,
                FILE_PROGRESS_WEIGHT,
                cancel_token,
                &mut on_progress,
            )
            .await?;

        let links = self
            .upload_file(
                project_id,
                files.links.as_ref(),
                FileType::Links,
                FILE_PROGRESS_WEIGHT,
                cancel_token,
                |progress: ChunkProgress| {
                    on_progress(ChunkProgress {
                        percentage: FILE_PROGRESS_WEIGHT + progress.percentage,
                        ..progress
                    })
                },
            )
            .await?;

        if cancel_token.is_cancelled() {
            log_warn!("Import of project {} cancelled before finalize", project_id);
            return Err(SessionError::Superseded);
        }

        let import = self
            .api
            .finalize_import(project_id)
            .await
            .map_err(SessionError::FinalizeFailed)?;

        log_info!(
            "Import finalized for project {}: {} rows{}",
            project_id,
            import.rows,
            import
                .message
                .as_deref()
                .map(|message| format!(" ({message})"))
                .unwrap_or_default()
        );

        Ok(UploadSummary {
            pages,
            links,
            import,
        })
    }
}
