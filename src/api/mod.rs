//! HTTP contract of the cartography backend.
//!
//! [`CartographyApi`] is the seam the upload orchestrator, the poller and the
//! session controller talk to; [`HttpApi`] is the reqwest implementation.

pub mod client;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;

use crate::results::AnalysisResult;
use crate::upload::Chunk;

pub use client::HttpApi;
pub use models::{
    AnalysisDetail, AnalysisRecord, AnalysisStarted, BackendProgress, ImportSummary, NewProject,
    ProgressResponse, ProjectCreated, SavedProject,
};

/// Project id used by the fixture endpoint.
pub const MOCK_PROJECT_ID: &str = "mock-project-id";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response; `body` is the raw response text.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid {context} response: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },
}

impl ApiError {
    /// Backend text for status errors, the error itself otherwise.
    pub fn backend_message(&self) -> String {
        match self {
            ApiError::Status { body, .. } if !body.is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait CartographyApi: Send + Sync {
    async fn create_project(&self, project: &NewProject) -> Result<ProjectCreated, ApiError>;

    async fn import_chunk(&self, project_id: &str, chunk: &Chunk) -> Result<(), ApiError>;

    async fn finalize_import(&self, project_id: &str) -> Result<ImportSummary, ApiError>;

    async fn start_analysis(&self, project_id: &str) -> Result<AnalysisStarted, ApiError>;

    async fn fetch_progress(&self, project_id: &str) -> Result<ProgressResponse, ApiError>;

    async fn list_saved_projects(&self) -> Result<Vec<SavedProject>, ApiError>;

    async fn list_analyses(&self, project_id: &str) -> Result<Vec<AnalysisRecord>, ApiError>;

    async fn fetch_analysis(
        &self,
        project_id: &str,
        analysis_id: i64,
    ) -> Result<AnalysisDetail, ApiError>;

    async fn fetch_mock_results(&self, project_id: &str) -> Result<AnalysisResult, ApiError>;
}
