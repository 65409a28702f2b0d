use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;
use crate::upload::FileType;

/// Errors surfaced by an analysis session. `Display` is the text shown to
/// the user in the error banner.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a pages file is required to start an analysis")]
    MissingPagesFile,

    #[error("an analysis is already being set up")]
    SessionBusy,

    #[error("could not read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not create project: {0}")]
    ProjectCreationFailed(#[source] ApiError),

    #[error("upload of {file_type} chunk {}/{total_chunks} failed: {source}", chunk_index + 1)]
    ChunkUploadFailed {
        file_type: FileType,
        chunk_index: usize,
        total_chunks: usize,
        #[source]
        source: ApiError,
    },

    #[error("could not finalize the upload: {0}")]
    FinalizeFailed(#[source] ApiError),

    #[error("analysis failed to start: {0}")]
    AnalysisStartFailed(String),

    #[error("could not fetch analysis status: {0}")]
    StatusFetchFailed(#[source] ApiError),

    #[error("analysis failed: {0}")]
    TerminalFailure(String),

    #[error("no completed analysis found for project {0}")]
    NoCompletedAnalysis(String),

    #[error("could not load results: {0}")]
    LoadFailed(#[source] ApiError),

    #[error("the session was reset before setup finished")]
    Superseded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_failure_reports_one_based_position() {
        let err = SessionError::ChunkUploadFailed {
            file_type: FileType::Links,
            chunk_index: 1,
            total_chunks: 3,
            source: ApiError::Status {
                status: 500,
                body: "disk full".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "upload of links chunk 2/3 failed: HTTP 500: disk full"
        );
    }
}
