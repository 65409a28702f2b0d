use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::BackendProgress;
use crate::upload::ChunkProgress;

/// Number of steps the backend reports for a full analysis run.
pub const ANALYSIS_TOTAL_STEPS: u32 = 4;

const DEFAULT_PROGRESS_TEXT: &str = "Analysis in progress...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failure,
    Analyzed,
    Error,
    /// Any other backend status (`CREATED`, `IMPORTED`, `ANALYZING`, ...).
    Other(String),
}

impl JobStatus {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "SUCCESS" => JobStatus::Success,
            "FAILURE" => JobStatus::Failure,
            "ANALYZED" => JobStatus::Analyzed,
            "ERROR" => JobStatus::Error,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Analyzed => "ANALYZED",
            JobStatus::Error => "ERROR",
            JobStatus::Other(value) => value,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Analyzed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failure | JobStatus::Error)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        JobStatus::parse(&value)
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall completion in percent, derived from the backend's step fields.
///
/// With a step position the per-step percentage is folded into the step's
/// slice of the bar; otherwise the raw percentage is used. Clamped to 0..=100.
pub fn normalize_percentage(
    step: Option<u32>,
    total_steps: Option<u32>,
    percentage: Option<f64>,
) -> f64 {
    let overall = match (step, total_steps, percentage) {
        (Some(step), Some(total), Some(pct)) if step > 0 && total > 0 => {
            let total = f64::from(total);
            (f64::from(step) - 1.0) / total * 100.0 + pct / total
        }
        (_, _, Some(pct)) => pct,
        _ => 0.0,
    };

    if overall.is_nan() {
        0.0
    } else {
        overall.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub status: JobStatus,
    pub step: u32,
    pub total_steps: u32,
    pub step_name: String,
    pub percentage: f64,
    pub message: Option<String>,
}

impl ProgressState {
    pub fn from_backend(status: JobStatus, progress: Option<&BackendProgress>) -> Self {
        let default = BackendProgress::default();
        let progress = progress.unwrap_or(&default);

        Self {
            status,
            step: progress.step.unwrap_or(0),
            total_steps: progress.total_steps.unwrap_or(0),
            step_name: progress.step_name.clone().unwrap_or_default(),
            percentage: normalize_percentage(
                progress.step,
                progress.total_steps,
                progress.progress_percentage,
            ),
            message: progress.message.clone(),
        }
    }

    /// Upload is step 1 of the run; `chunk.percentage` is progress within it.
    pub fn uploading(chunk: &ChunkProgress) -> Self {
        Self {
            status: JobStatus::Running,
            step: 1,
            total_steps: ANALYSIS_TOTAL_STEPS,
            step_name: format!("Upload {}", chunk.file_type),
            percentage: normalize_percentage(
                Some(1),
                Some(ANALYSIS_TOTAL_STEPS),
                Some(chunk.percentage),
            ),
            message: Some(format!(
                "Upload {}: {}/{} chunks",
                chunk.file_type, chunk.completed, chunk.total
            )),
        }
    }

    pub fn starting(step_name: &str) -> Self {
        Self {
            status: JobStatus::Running,
            step: 1,
            total_steps: ANALYSIS_TOTAL_STEPS,
            step_name: step_name.to_string(),
            percentage: 0.0,
            message: None,
        }
    }

    pub fn display_text(&self) -> &str {
        self.message
            .as_deref()
            .filter(|message| !message.is_empty())
            .or_else(|| Some(self.step_name.as_str()).filter(|name| !name.is_empty()))
            .unwrap_or(DEFAULT_PROGRESS_TEXT)
    }

    /// Status of a step indicator: done, current or upcoming.
    pub fn step_marker(&self, index: u32) -> StepMarker {
        if self.step == 0 || self.total_steps == 0 {
            StepMarker::Upcoming
        } else if index < self.step {
            StepMarker::Completed
        } else if index == self.step {
            StepMarker::Active
        } else {
            StepMarker::Upcoming
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMarker {
    Completed,
    Active,
    Upcoming,
}
