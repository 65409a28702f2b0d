use std::sync::Arc;

use serde::Serialize;

use crate::progress::ProgressState;
use crate::results::AnalysisResult;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    ProjectCreating,
    Uploading,
    AnalysisStarting,
    Monitoring,
    Succeeded,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Succeeded | SessionPhase::Failed)
    }

    /// Phases during which a new start must be refused.
    pub fn is_setting_up(&self) -> bool {
        matches!(
            self,
            SessionPhase::ProjectCreating | SessionPhase::Uploading | SessionPhase::AnalysisStarting
        )
    }

    pub fn can_transition_to(&self, next: SessionPhase) -> bool {
        use SessionPhase::*;

        match (*self, next) {
            (_, Failed) => true,
            (_, Idle) => true,
            (Idle | Succeeded | Failed | Monitoring, ProjectCreating) => true,
            (ProjectCreating, Uploading) => true,
            (Uploading, AnalysisStarting) => true,
            (AnalysisStarting, Monitoring) => true,
            (Monitoring, Succeeded) => true,
            // Saved projects and fixtures jump straight to results.
            (Idle | Succeeded | Failed, Succeeded) => true,
            _ => false,
        }
    }
}

/// Everything a UI adapter needs to render the session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Local id used to correlate log lines of one run.
    pub session_id: Option<String>,
    pub project_id: Option<String>,
    pub progress: Option<ProgressState>,
    pub progress_visible: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub result: Option<Arc<AnalysisResult>>,
}

impl SessionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, session_id: String) {
        *self = Self {
            phase: SessionPhase::ProjectCreating,
            session_id: Some(session_id),
            project_id: None,
            progress: None,
            progress_visible: true,
            error: None,
            result: None,
        };
    }

    pub fn fail(&mut self, message: String) {
        self.phase = SessionPhase::Failed;
        self.progress_visible = false;
        self.error = Some(message);
    }

    pub fn succeed(&mut self, project_id: Option<String>, result: Arc<AnalysisResult>) {
        self.phase = SessionPhase::Succeeded;
        self.progress_visible = false;
        self.error = None;
        if project_id.is_some() {
            self.project_id = project_id;
        }
        self.result = Some(result);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionPhase::*;

    #[test]
    fn happy_path_transitions() {
        let path = [Idle, ProjectCreating, Uploading, AnalysisStarting, Monitoring, Succeeded];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn phases_cannot_be_skipped() {
        assert!(!ProjectCreating.can_transition_to(AnalysisStarting));
        assert!(!Idle.can_transition_to(Monitoring));
        assert!(!Uploading.can_transition_to(Succeeded));
        assert!(!Uploading.can_transition_to(ProjectCreating));
    }

    #[test]
    fn results_can_replace_any_idle_or_finished_view() {
        assert_eq!(SessionPhase::default(), Idle);
        for phase in [Idle, Succeeded, Failed, Monitoring] {
            assert!(phase.can_transition_to(Succeeded), "{phase:?} -> Succeeded");
        }
        assert!(!AnalysisStarting.can_transition_to(Succeeded));
    }

    #[test]
    fn every_phase_can_fail() {
        for phase in [Idle, ProjectCreating, Uploading, AnalysisStarting, Monitoring] {
            assert!(phase.can_transition_to(Failed));
        }
    }

    #[test]
    fn failure_hides_progress() {
        let mut snapshot = SessionSnapshot::new();
        snapshot.begin("s-1".into());
        assert!(snapshot.progress_visible);
        snapshot.fail("could not create project".into());
        assert!(!snapshot.progress_visible);
        assert_eq!(snapshot.phase, Failed);
        assert!(snapshot.phase.is_terminal());
    }
}
