use serde::{Deserialize, Serialize};

use crate::results::AnalysisResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectCreated {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportSummary {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisStarted {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Raw progress block. Every field is optional; the backend sends `{}`
/// before the analysis starts reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendProgress {
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub step_name: Option<String>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<AnalysisResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<BackendProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestAnalysis {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub total_clusters: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub latest_analysis: Option<LatestAnalysis>,
}

impl SavedProject {
    /// Label used in project pickers: `name (N clusters, YYYY-MM-DD)`.
    pub fn label(&self) -> String {
        match &self.latest_analysis {
            Some(analysis) => {
                let date = analysis
                    .created_at
                    .split('T')
                    .next()
                    .unwrap_or(&analysis.created_at);
                format!("{} ({} clusters, {})", self.name, analysis.total_clusters, date)
            }
            None => format!("{} (no analysis)", self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub total_clusters: u64,
    #[serde(default)]
    pub total_anomalies: u64,
}

impl AnalysisRecord {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisDetail {
    pub results: AnalysisResult,
}
