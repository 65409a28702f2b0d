use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Local;
use log::{error, info, warn};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{CartographyApi, NewProject, SavedProject, MOCK_PROJECT_ID};
use crate::error::SessionError;
use crate::progress::{PollOutcome, PollerConfig, PollerHandle, ProgressPoller, ProgressState};
use crate::results::AnalysisResult;
use crate::upload::{SelectedFiles, Uploader, DEFAULT_ROWS_PER_CHUNK};

use super::{SessionPhase, SessionSnapshot};

pub const DEFAULT_PROJECT_DESCRIPTION: &str = "Analysis from the cartography client";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub rows_per_chunk: NonZeroUsize,
    pub poller: PollerConfig,
    pub project_description: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows_per_chunk: NonZeroUsize::new(DEFAULT_ROWS_PER_CHUNK)
                .unwrap_or(NonZeroUsize::MIN),
            poller: PollerConfig::default(),
            project_description: DEFAULT_PROJECT_DESCRIPTION.to_string(),
        }
    }
}

/// Drives one analysis at a time: project creation, upload, analysis start,
/// then progress monitoring until a terminal state.
///
/// State is published on a watch channel; UI adapters subscribe and render.
#[derive(Clone)]
pub struct SessionController {
    api: Arc<dyn CartographyApi>,
    config: SessionConfig,
    state: Arc<watch::Sender<SessionSnapshot>>,
    poller: Arc<Mutex<Option<PollerHandle>>>,
    /// Cancels the upload of the session currently being set up.
    setup_cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl SessionController {
    pub fn new(api: Arc<dyn CartographyApi>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::new());
        Self {
            api,
            config,
            state: Arc::new(state),
            poller: Arc::new(Mutex::new(None)),
            setup_cancel: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Resolves once the session reaches `Succeeded` or `Failed`.
    pub async fn wait_for_terminal(&self) -> SessionSnapshot {
        let mut rx = self.state.subscribe();
        let terminal = match rx.wait_for(|snapshot| snapshot.phase.is_terminal()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        terminal
    }

    /// Runs the setup phases and starts monitoring. Returns once the poller
    /// is running; any setup failure moves the session to `Failed`.
    pub async fn start_analysis(&self, files: SelectedFiles) -> Result<(), SessionError> {
        if !files.can_start() {
            return Err(SessionError::MissingPagesFile);
        }
        if self.state.borrow().phase.is_setting_up() {
            return Err(SessionError::SessionBusy);
        }

        self.cancel_poller().await;

        let session_id = Uuid::new_v4().to_string();
        let mut busy = false;
        self.state.send_if_modified(|snapshot| {
            if snapshot.phase.is_setting_up() {
                busy = true;
                return false;
            }
            snapshot.begin(session_id.clone());
            true
        });
        if busy {
            return Err(SessionError::SessionBusy);
        }

        info!("analysis session {} started", session_id);

        let cancel_token = CancellationToken::new();
        if let Some(previous) = self.setup_cancel.lock().await.replace(cancel_token.clone()) {
            previous.cancel();
        }

        match self.run_setup(&session_id, &files, &cancel_token).await {
            Ok(()) => Ok(()),
            Err(SessionError::Superseded) => {
                warn!("analysis session {} was reset during setup", session_id);
                Err(SessionError::Superseded)
            }
            Err(err) => {
                error!("analysis session {} aborted: {}", session_id, err);
                self.fail(&session_id, err.to_string());
                Err(err)
            }
        }
    }

    async fn run_setup(
        &self,
        session_id: &str,
        files: &SelectedFiles,
        cancel_token: &CancellationToken,
    ) -> Result<(), SessionError> {
        let project = self
            .api
            .create_project(&NewProject {
                name: format!("Analysis {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
                description: self.config.project_description.clone(),
            })
            .await
            .map_err(SessionError::ProjectCreationFailed)?;
        let project_id = project.id;
        info!("project {} created", project_id);

        self.transition(session_id, SessionPhase::Uploading, |snapshot| {
            snapshot.project_id = Some(project_id.clone());
            snapshot.progress = Some(ProgressState::starting("Uploading files"));
        })?;

        let uploader = Uploader::new(self.api.clone(), self.config.rows_per_chunk);
        let progress_state = self.state.clone();
        let progress_session = session_id.to_string();
        uploader
            .upload_all(&project_id, files, cancel_token, move |chunk| {
                progress_state.send_if_modified(|snapshot| {
                    if snapshot.session_id.as_deref() != Some(progress_session.as_str()) {
                        return false;
                    }
                    snapshot.progress = Some(ProgressState::uploading(&chunk));
                    true
                });
            })
            .await?;

        self.transition(session_id, SessionPhase::AnalysisStarting, |snapshot| {
            snapshot.progress = Some(ProgressState::starting("Starting analysis"));
        })?;

        self.api
            .start_analysis(&project_id)
            .await
            .map_err(|err| SessionError::AnalysisStartFailed(err.backend_message()))?;

        self.transition(session_id, SessionPhase::Monitoring, |_| {})?;
        self.spawn_poller(session_id, project_id).await;
        Ok(())
    }

    async fn spawn_poller(&self, session_id: &str, project_id: String) {
        let poller = ProgressPoller::new(self.api.clone(), self.config.poller);

        let update_state = self.state.clone();
        let update_session = session_id.to_string();
        let terminal_state = self.state.clone();
        let terminal_session = session_id.to_string();

        let handle = poller.start_monitoring(
            project_id,
            move |progress| {
                update_state.send_if_modified(|snapshot| {
                    if snapshot.session_id.as_deref() != Some(update_session.as_str())
                        || snapshot.phase != SessionPhase::Monitoring
                    {
                        return false;
                    }
                    snapshot.progress = Some(progress);
                    true
                });
            },
            move |outcome| {
                terminal_state.send_if_modified(|snapshot| {
                    if snapshot.session_id.as_deref() != Some(terminal_session.as_str())
                        || snapshot.phase != SessionPhase::Monitoring
                    {
                        return false;
                    }
                    match outcome {
                        PollOutcome::Succeeded(result) => {
                            snapshot.succeed(None, accept_result(result));
                        }
                        PollOutcome::Failed(message) => {
                            snapshot.fail(SessionError::TerminalFailure(message).to_string());
                        }
                    }
                    true
                });
            },
        );

        *self.poller.lock().await = Some(handle);
    }

    /// Moves to `next` if the snapshot still belongs to `session_id` and the
    /// transition is legal; `apply` runs in the same update.
    fn transition<F>(&self, session_id: &str, next: SessionPhase, apply: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut SessionSnapshot),
    {
        let mut moved = false;
        self.state.send_if_modified(|snapshot| {
            if snapshot.session_id.as_deref() != Some(session_id)
                || !snapshot.phase.can_transition_to(next)
            {
                return false;
            }
            info!("session {}: {:?} -> {:?}", session_id, snapshot.phase, next);
            snapshot.phase = next;
            apply(snapshot);
            moved = true;
            true
        });

        if moved {
            Ok(())
        } else {
            Err(SessionError::Superseded)
        }
    }

    fn fail(&self, session_id: &str, message: String) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.session_id.as_deref() != Some(session_id) {
                return false;
            }
            snapshot.fail(message);
            true
        });
    }

    async fn cancel_poller(&self) {
        let handle = self.poller.lock().await.take();
        if let Some(mut handle) = handle {
            if let Err(err) = handle.stop().await {
                warn!("failed to stop progress poller: {err:?}");
            }
        }
    }

    /// Stops any in-flight upload and monitoring, then returns to `Idle`.
    pub async fn reset(&self) {
        if let Some(cancel_token) = self.setup_cancel.lock().await.take() {
            cancel_token.cancel();
        }
        self.cancel_poller().await;
        self.state.send_modify(|snapshot| snapshot.reset());
    }

    pub async fn list_saved_projects(&self) -> Result<Vec<SavedProject>, SessionError> {
        self.api
            .list_saved_projects()
            .await
            .map_err(SessionError::LoadFailed)
    }

    /// Shows the first completed analysis of a saved project.
    pub async fn load_saved_project(
        &self,
        project_id: &str,
    ) -> Result<Arc<AnalysisResult>, SessionError> {
        if self.state.borrow().phase.is_setting_up() {
            return Err(SessionError::SessionBusy);
        }

        let loaded = async {
            let analyses = self
                .api
                .list_analyses(project_id)
                .await
                .map_err(SessionError::LoadFailed)?;
            let completed = analyses
                .iter()
                .find(|analysis| analysis.is_completed())
                .ok_or_else(|| SessionError::NoCompletedAnalysis(project_id.to_string()))?;
            info!(
                "loading analysis {} of project {}: {} clusters, {} anomalies",
                completed.id, project_id, completed.total_clusters, completed.total_anomalies
            );
            self.api
                .fetch_analysis(project_id, completed.id)
                .await
                .map_err(SessionError::LoadFailed)
        }
        .await;

        match loaded {
            Ok(detail) => Ok(self.show_results(project_id, detail.results).await),
            Err(err) => {
                self.show_error(&err);
                Err(err)
            }
        }
    }

    /// Shows the backend's fixture results without running an analysis.
    pub async fn load_mock_results(&self) -> Result<Arc<AnalysisResult>, SessionError> {
        if self.state.borrow().phase.is_setting_up() {
            return Err(SessionError::SessionBusy);
        }

        match self.api.fetch_mock_results(MOCK_PROJECT_ID).await {
            Ok(result) => Ok(self.show_results(MOCK_PROJECT_ID, result).await),
            Err(err) => {
                let err = SessionError::LoadFailed(err);
                self.show_error(&err);
                Err(err)
            }
        }
    }

    async fn show_results(&self, project_id: &str, result: AnalysisResult) -> Arc<AnalysisResult> {
        self.cancel_poller().await;

        let result = accept_result(result);
        let session_id = Uuid::new_v4().to_string();
        self.state.send_modify(|snapshot| {
            snapshot.reset();
            snapshot.session_id = Some(session_id);
            snapshot.succeed(Some(project_id.to_string()), result.clone());
        });
        result
    }

    fn show_error(&self, err: &SessionError) {
        error!("{err}");
        let message = err.to_string();
        self.state.send_modify(|snapshot| snapshot.error = Some(message));
    }
}

fn accept_result(result: AnalysisResult) -> Arc<AnalysisResult> {
    for cluster in result.inconsistent_clusters() {
        warn!(
            "cluster {} reports size {} but lists {} urls",
            cluster.cluster_id,
            cluster.size,
            cluster.urls.len()
        );
    }
    Arc::new(result)
}
