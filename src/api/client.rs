use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;

use super::{
    AnalysisDetail, AnalysisRecord, AnalysisStarted, ApiError, CartographyApi, ImportSummary,
    NewProject, ProgressResponse, ProjectCreated, SavedProject,
};
use crate::results::AnalysisResult;
use crate::upload::Chunk;

/// reqwest-backed client rooted at `<base>/api/v1`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    /// `timeout` of `None` leaves the transport defaults in place.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        context: &'static str,
    ) -> Result<T, ApiError> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode {
            context,
            message: err.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &'static str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!("GET {url}");
        let response = self.client.get(&url).send().await?;
        Self::decode(response, context).await
    }
}

#[async_trait]
impl CartographyApi for HttpApi {
    async fn create_project(&self, project: &NewProject) -> Result<ProjectCreated, ApiError> {
        let url = self.url("/projects/");
        debug!("POST {url}");
        let response = self.client.post(&url).json(project).send().await?;
        Self::decode(response, "create project").await
    }

    async fn import_chunk(&self, project_id: &str, chunk: &Chunk) -> Result<(), ApiError> {
        let part = multipart::Part::text(chunk.payload.clone())
            .file_name(chunk.file_name())
            .mime_str("text/csv")?;

        let form = multipart::Form::new()
            .part("chunk_data", part)
            .text("file_type", chunk.file_type.as_str())
            .text("chunk_index", chunk.index.to_string())
            .text("total_chunks", chunk.total_chunks.to_string())
            .text("is_first_chunk", chunk.is_first.to_string())
            .text("is_last_chunk", chunk.is_last.to_string());

        let url = self.url(&format!("/projects/{project_id}/import-chunk"));
        let response = self.client.post(&url).multipart(form).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn finalize_import(&self, project_id: &str) -> Result<ImportSummary, ApiError> {
        let url = self.url(&format!("/projects/{project_id}/import-finalize"));
        let response = self.client.post(&url).send().await?;
        Self::decode(response, "import finalize").await
    }

    async fn start_analysis(&self, project_id: &str) -> Result<AnalysisStarted, ApiError> {
        let url = self.url(&format!("/projects/{project_id}/analyze-simple"));
        let response = self.client.post(&url).send().await?;
        Self::decode(response, "analyze").await
    }

    async fn fetch_progress(&self, project_id: &str) -> Result<ProgressResponse, ApiError> {
        self.get_json(&format!("/projects/{project_id}/progress"), "progress")
            .await
    }

    async fn list_saved_projects(&self) -> Result<Vec<SavedProject>, ApiError> {
        self.get_json("/projects/database/projects", "saved projects")
            .await
    }

    async fn list_analyses(&self, project_id: &str) -> Result<Vec<AnalysisRecord>, ApiError> {
        self.get_json(&format!("/projects/{project_id}/analyses"), "analyses")
            .await
    }

    async fn fetch_analysis(
        &self,
        project_id: &str,
        analysis_id: i64,
    ) -> Result<AnalysisDetail, ApiError> {
        self.get_json(
            &format!("/projects/{project_id}/analyses/{analysis_id}"),
            "analysis",
        )
        .await
    }

    async fn fetch_mock_results(&self, project_id: &str) -> Result<AnalysisResult, ApiError> {
        self.get_json(&format!("/projects/{project_id}/mock-results"), "mock results")
            .await
    }
}
