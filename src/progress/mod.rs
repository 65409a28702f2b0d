pub mod poller;
pub mod state;

pub use poller::{PollOutcome, PollerConfig, PollerHandle, ProgressPoller};
pub use state::{normalize_percentage, JobStatus, ProgressState, StepMarker};
