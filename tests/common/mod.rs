//! Shared test doubles for the integration suites.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use cartography_lib::api::{
    AnalysisDetail, AnalysisRecord, AnalysisStarted, ApiError, CartographyApi, ImportSummary,
    NewProject, ProgressResponse, ProjectCreated, SavedProject,
};
use cartography_lib::results::AnalysisResult;
use cartography_lib::upload::{Chunk, FileType};

/// One recorded call against the API, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProject(String),
    ImportChunk {
        file_type: FileType,
        index: usize,
        total_chunks: usize,
        is_first: bool,
        is_last: bool,
        rows: usize,
    },
    Finalize,
    StartAnalysis,
    FetchProgress,
    ListSavedProjects,
    ListAnalyses(String),
    FetchAnalysis(String, i64),
    FetchMockResults,
}

/// Scripted status response.
#[derive(Debug, Clone)]
pub enum ProgressStep {
    Respond(ProgressResponse),
    Unreachable,
}

/// In-memory backend that records every call. Progress steps are consumed in
/// order; the last one repeats forever.
pub struct MockCartographyApi {
    calls: Mutex<Vec<Call>>,
    progress: Mutex<VecDeque<ProgressStep>>,
    project_id: String,
    fail_create: bool,
    fail_chunk: Option<(FileType, usize)>,
    pause_chunk: Option<(FileType, usize)>,
    paused: Notify,
    resumed: Notify,
    fail_start: Option<String>,
    saved_projects: Vec<SavedProject>,
    analyses: Vec<AnalysisRecord>,
    analysis_results: HashMap<i64, AnalysisResult>,
    mock_results: Option<AnalysisResult>,
}

impl MockCartographyApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            progress: Mutex::new(VecDeque::from([ProgressStep::Respond(pending())])),
            project_id: "proj-1".to_string(),
            fail_create: false,
            fail_chunk: None,
            pause_chunk: None,
            paused: Notify::new(),
            resumed: Notify::new(),
            fail_start: None,
            saved_projects: Vec::new(),
            analyses: Vec::new(),
            analysis_results: HashMap::new(),
            mock_results: None,
        }
    }

    pub fn with_progress(self, steps: Vec<ProgressStep>) -> Self {
        assert!(!steps.is_empty(), "at least one progress step is required");
        *self.progress.lock().unwrap() = steps.into();
        self
    }

    pub fn failing_project_creation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_chunk(mut self, file_type: FileType, index: usize) -> Self {
        self.fail_chunk = Some((file_type, index));
        self
    }

    /// Holds the given chunk request open until [`Self::resume`] is called.
    pub fn pausing_at_chunk(mut self, file_type: FileType, index: usize) -> Self {
        self.pause_chunk = Some((file_type, index));
        self
    }

    /// Resolves once the paused chunk request has been received.
    pub async fn wait_until_paused(&self) {
        self.paused.notified().await;
    }

    pub fn resume(&self) {
        self.resumed.notify_one();
    }

    pub fn failing_analysis_start(mut self, body: &str) -> Self {
        self.fail_start = Some(body.to_string());
        self
    }

    pub fn with_saved_projects(mut self, projects: Vec<SavedProject>) -> Self {
        self.saved_projects = projects;
        self
    }

    pub fn with_analysis(mut self, record: AnalysisRecord, result: AnalysisResult) -> Self {
        self.analysis_results.insert(record.id, result);
        self.analyses.push(record);
        self
    }

    pub fn with_analysis_record(mut self, record: AnalysisRecord) -> Self {
        self.analyses.push(record);
        self
    }

    pub fn with_mock_results(mut self, result: AnalysisResult) -> Self {
        self.mock_results = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn chunk_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::ImportChunk { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn server_error(body: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        body: body.to_string(),
    }
}

#[async_trait]
impl CartographyApi for MockCartographyApi {
    async fn create_project(&self, project: &NewProject) -> Result<ProjectCreated, ApiError> {
        self.record(Call::CreateProject(project.name.clone()));
        if self.fail_create {
            return Err(server_error("database unavailable"));
        }
        Ok(ProjectCreated {
            id: self.project_id.clone(),
            name: Some(project.name.clone()),
            status: Some("created".to_string()),
        })
    }

    async fn import_chunk(&self, _project_id: &str, chunk: &Chunk) -> Result<(), ApiError> {
        self.record(Call::ImportChunk {
            file_type: chunk.file_type,
            index: chunk.index,
            total_chunks: chunk.total_chunks,
            is_first: chunk.is_first,
            is_last: chunk.is_last,
            rows: chunk.row_count,
        });
        if self.pause_chunk == Some((chunk.file_type, chunk.index)) {
            self.paused.notify_one();
            self.resumed.notified().await;
        }
        if self.fail_chunk == Some((chunk.file_type, chunk.index)) {
            return Err(server_error("disk full"));
        }
        Ok(())
    }

    async fn finalize_import(&self, project_id: &str) -> Result<ImportSummary, ApiError> {
        self.record(Call::Finalize);
        Ok(ImportSummary {
            project_id: Some(project_id.to_string()),
            rows: 0,
            message: Some("import complete".to_string()),
        })
    }

    async fn start_analysis(&self, _project_id: &str) -> Result<AnalysisStarted, ApiError> {
        self.record(Call::StartAnalysis);
        if let Some(body) = &self.fail_start {
            return Err(server_error(body));
        }
        Ok(AnalysisStarted {
            message: Some("analysis started".to_string()),
            status: Some("processing".to_string()),
        })
    }

    async fn fetch_progress(&self, _project_id: &str) -> Result<ProgressResponse, ApiError> {
        self.record(Call::FetchProgress);
        let step = {
            let mut steps = self.progress.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };
        match step {
            Some(ProgressStep::Respond(response)) => Ok(response),
            Some(ProgressStep::Unreachable) | None => Err(ApiError::Decode {
                context: "progress",
                message: "connection reset".to_string(),
            }),
        }
    }

    async fn list_saved_projects(&self) -> Result<Vec<SavedProject>, ApiError> {
        self.record(Call::ListSavedProjects);
        Ok(self.saved_projects.clone())
    }

    async fn list_analyses(&self, project_id: &str) -> Result<Vec<AnalysisRecord>, ApiError> {
        self.record(Call::ListAnalyses(project_id.to_string()));
        Ok(self.analyses.clone())
    }

    async fn fetch_analysis(
        &self,
        project_id: &str,
        analysis_id: i64,
    ) -> Result<AnalysisDetail, ApiError> {
        self.record(Call::FetchAnalysis(project_id.to_string(), analysis_id));
        match self.analysis_results.get(&analysis_id) {
            Some(results) => Ok(AnalysisDetail {
                results: results.clone(),
            }),
            None => Err(ApiError::Status {
                status: 404,
                body: "analysis not found".to_string(),
            }),
        }
    }

    async fn fetch_mock_results(&self, _project_id: &str) -> Result<AnalysisResult, ApiError> {
        self.record(Call::FetchMockResults);
        self.mock_results
            .clone()
            .ok_or_else(|| server_error("fixtures missing"))
    }
}

pub fn pending() -> ProgressResponse {
    ProgressResponse {
        status: "PENDING".to_string(),
        result: None,
        error: None,
        progress: None,
    }
}

pub fn running(step: u32, pct: f64, name: &str) -> ProgressResponse {
    serde_json::from_value(json!({
        "status": "PROGRESS",
        "progress": {
            "step": step,
            "total_steps": 4,
            "step_name": name,
            "progress_percentage": pct
        }
    }))
    .unwrap()
}

pub fn succeeded(result: AnalysisResult) -> ProgressResponse {
    ProgressResponse {
        status: "SUCCESS".to_string(),
        result: Some(result),
        error: None,
        progress: None,
    }
}

pub fn failed(error: &str) -> ProgressResponse {
    ProgressResponse {
        status: "FAILURE".to_string(),
        result: None,
        error: Some(error.to_string()),
        progress: None,
    }
}

/// Two clusters, one anomaly, three projected points.
pub fn sample_result() -> AnalysisResult {
    serde_json::from_value(json!({
        "total_pages": 5,
        "clusters": [
            {
                "cluster_id": 0,
                "theme": "pricing",
                "size": 3,
                "urls": ["https://a.test/p1", "https://a.test/p2", "https://a.test/p3"]
            },
            {
                "cluster_id": 1,
                "theme": "docs",
                "size": 2,
                "urls": ["https://a.test/d1", "https://a.test/d2"]
            }
        ],
        "proximities": [
            {
                "anomaly_score": 0.91,
                "cosine": 0.95,
                "hops": 4,
                "url_i": "https://a.test/p1",
                "url_j": "https://a.test/d2",
                "node_i": 0,
                "node_j": 4
            }
        ],
        "projection_2d": [
            { "x": 0.1, "y": 0.2, "url": "https://a.test/p1", "cluster": 0 },
            { "x": 0.4, "y": 0.9, "url": "https://a.test/d1", "cluster": 1 },
            { "x": 0.8, "y": 0.5, "url": "https://a.test/x", "cluster": null }
        ],
        "summary": { "graph_stats": { "total_edges": 7 } }
    }))
    .unwrap()
}

/// Header plus `rows` data lines.
pub fn pages_csv(rows: usize) -> String {
    let mut csv = String::from("url,title,content\n");
    for i in 0..rows {
        csv.push_str(&format!("https://a.test/page-{i},Page {i},body {i}\n"));
    }
    csv
}

pub fn links_csv(rows: usize) -> String {
    let mut csv = String::from("source,target\n");
    for i in 0..rows {
        csv.push_str(&format!("https://a.test/page-{i},https://a.test/page-{}\n", i + 1));
    }
    csv
}
