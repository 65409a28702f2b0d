use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::{CartographyApi, ProgressResponse};
use crate::error::SessionError;
use crate::results::AnalysisResult;

use super::state::{JobStatus, ProgressState};

// Set to false to silence per-tick logging
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Consecutive failed status fetches tolerated before giving up.
    /// `None` keeps polling forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(AnalysisResult),
    Failed(String),
}

/// What a single status response means for the polling loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TickDecision {
    Continue(ProgressState),
    Terminal(ProgressState, PollOutcome),
}

/// Maps one progress response to a progress snapshot and, for terminal
/// statuses, the session outcome.
pub fn interpret(response: ProgressResponse) -> TickDecision {
    let status = JobStatus::parse(&response.status);
    let progress = ProgressState::from_backend(status.clone(), response.progress.as_ref());

    if status.is_success() {
        let outcome = match response.result {
            Some(result) => PollOutcome::Succeeded(result),
            None => PollOutcome::Failed("analysis finished without a result payload".to_string()),
        };
        TickDecision::Terminal(progress, outcome)
    } else if status.is_failure() {
        let message = response
            .error
            .filter(|error| !error.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string());
        TickDecision::Terminal(progress, PollOutcome::Failed(message))
    } else {
        TickDecision::Continue(progress)
    }
}

pub struct ProgressPoller {
    api: Arc<dyn CartographyApi>,
    config: PollerConfig,
}

impl ProgressPoller {
    pub fn new(api: Arc<dyn CartographyApi>, config: PollerConfig) -> Self {
        Self { api, config }
    }

    /// Spawns the polling task. `on_update` runs for every decoded status,
    /// the terminal one included, `on_terminal` exactly once when polling
    /// ends on its own.
    /// Neither runs after the handle is cancelled.
    pub fn start_monitoring<U, T>(
        &self,
        project_id: String,
        on_update: U,
        on_terminal: T,
    ) -> PollerHandle
    where
        U: FnMut(ProgressState) + Send + 'static,
        T: FnOnce(PollOutcome) + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            self.api.clone(),
            project_id,
            self.config,
            cancel_token.clone(),
            on_update,
            on_terminal,
        ));

        PollerHandle {
            handle: Some(handle),
            cancel_token,
        }
    }
}

async fn polling_loop<U, T>(
    api: Arc<dyn CartographyApi>,
    project_id: String,
    config: PollerConfig,
    cancel_token: CancellationToken,
    mut on_update: U,
    on_terminal: T,
) where
    U: FnMut(ProgressState) + Send + 'static,
    T: FnOnce(PollOutcome) + Send + 'static,
{
    let start = tokio::time::Instant::now() + config.interval;
    let mut ticker = tokio::time::interval_at(start, config.interval);
    // A slow fetch swallows the ticks it overlapped; requests never stack up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut consecutive_failures: u32 = 0;
    let mut ticks: u64 = 0;

    log_info!("monitoring progress of project {}", project_id);

    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("progress monitoring of project {} cancelled", project_id);
                return;
            }
            _ = ticker.tick() => {}
        }

        ticks += 1;
        let response = api.fetch_progress(&project_id).await;

        if cancel_token.is_cancelled() {
            return;
        }

        match response {
            Ok(response) => {
                consecutive_failures = 0;
                log_debug!("poll #{} for {}: status {}", ticks, project_id, response.status);
                match interpret(response) {
                    TickDecision::Continue(progress) => on_update(progress),
                    TickDecision::Terminal(progress, outcome) => {
                        on_update(progress);
                        break outcome;
                    }
                }
            }
            Err(err) => {
                consecutive_failures += 1;
                log_warn!(
                    "{} (attempt {} for project {})",
                    SessionError::StatusFetchFailed(err),
                    consecutive_failures,
                    project_id
                );

                if let Some(limit) = config.max_consecutive_failures {
                    if consecutive_failures >= limit {
                        break PollOutcome::Failed(format!(
                            "status endpoint unreachable after {consecutive_failures} attempts"
                        ));
                    }
                }
            }
        }
    };

    match &outcome {
        PollOutcome::Succeeded(_) => log_info!("analysis of project {} succeeded", project_id),
        PollOutcome::Failed(message) => {
            log_warn!("analysis of project {} failed: {}", project_id, message)
        }
    }
    on_terminal(outcome);
}

/// Handle to a running poller. Stopping is idempotent.
pub struct PollerHandle {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl PollerHandle {
    /// Cancels the loop and waits for the task to exit.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("progress poller task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BackendProgress;
    use serde_json::json;

    fn response(status: &str) -> ProgressResponse {
        ProgressResponse {
            status: status.to_string(),
            result: None,
            error: None,
            progress: Some(BackendProgress {
                step: Some(2),
                total_steps: Some(4),
                step_name: Some("Embeddings".into()),
                progress_percentage: Some(50.0),
                message: None,
            }),
        }
    }

    #[test]
    fn success_statuses_carry_the_result() {
        for status in ["SUCCESS", "ANALYZED"] {
            let mut resp = response(status);
            resp.result = Some(serde_json::from_value(json!({"total_pages": 4})).unwrap());
            match interpret(resp) {
                TickDecision::Terminal(_, PollOutcome::Succeeded(result)) => {
                    assert_eq!(result.total_pages, 4)
                }
                other => panic!("unexpected decision {other:?}"),
            }
        }
    }

    #[test]
    fn failure_statuses_carry_the_message() {
        let mut resp = response("FAILURE");
        resp.error = Some("embedding service down".into());
        assert_eq!(
            interpret(resp),
            TickDecision::Terminal(
                ProgressState::from_backend(JobStatus::Failure, response("x").progress.as_ref()),
                PollOutcome::Failed("embedding service down".into())
            )
        );

        match interpret(response("ERROR")) {
            TickDecision::Terminal(_, PollOutcome::Failed(message)) => {
                assert_eq!(message, "Unknown error")
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn other_statuses_continue_with_normalized_progress() {
        for status in ["PENDING", "RUNNING", "ANALYZING", "imported"] {
            match interpret(response(status)) {
                TickDecision::Continue(progress) => assert_eq!(progress.percentage, 37.5),
                other => panic!("unexpected decision {other:?}"),
            }
        }
    }

    #[test]
    fn success_without_result_is_a_failure() {
        assert!(matches!(
            interpret(response("SUCCESS")),
            TickDecision::Terminal(_, PollOutcome::Failed(_))
        ));
    }
}
