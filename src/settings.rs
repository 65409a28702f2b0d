use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    num::NonZeroUsize,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::progress::PollerConfig;
use crate::session::{SessionConfig, DEFAULT_PROJECT_DESCRIPTION};
use crate::upload::DEFAULT_ROWS_PER_CHUNK;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    /// Root of the versioned API, e.g. `https://host/base/api/v1`.
    pub api_base: String,
    pub rows_per_chunk: usize,
    pub poll_interval_ms: u64,
    /// `None` retries failed status fetches forever.
    pub max_consecutive_poll_failures: Option<u32>,
    /// `None` leaves the HTTP client's defaults in place.
    pub request_timeout_secs: Option<u64>,
    pub project_description: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            rows_per_chunk: DEFAULT_ROWS_PER_CHUNK,
            poll_interval_ms: 2000,
            max_consecutive_poll_failures: None,
            request_timeout_secs: None,
            project_description: DEFAULT_PROJECT_DESCRIPTION.into(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            rows_per_chunk: NonZeroUsize::new(self.rows_per_chunk).unwrap_or(NonZeroUsize::MIN),
            poller: PollerConfig {
                interval: Duration::from_millis(self.poll_interval_ms.max(1)),
                max_consecutive_failures: self.max_consecutive_poll_failures,
            },
            project_description: self.project_description.clone(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ClientSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing or unreadable JSON body falls
    /// back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!("Ignoring invalid settings file {}: {err}", path.display());
                    ClientSettings::default()
                }
            }
        } else {
            ClientSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn settings(&self) -> ClientSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: ClientSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &ClientSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
