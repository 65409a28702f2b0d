pub mod api;
pub mod commands;
pub mod error;
pub mod progress;
pub mod results;
pub mod session;
pub mod settings;
pub mod upload;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use api::HttpApi;
use commands::{Cli, Command};
use session::SessionController;
use settings::SettingsStore;

pub struct AppState {
    pub(crate) controller: SessionController,
    pub(crate) settings: SettingsStore,
}

impl AppState {
    /// Wires the HTTP client and the session controller from stored settings.
    /// `api_base` takes precedence over the file.
    pub fn new(settings: SettingsStore, api_base: Option<String>) -> Result<Self> {
        let mut current = settings.settings();
        if let Some(api_base) = api_base {
            current.api_base = api_base;
        }

        let api = HttpApi::new(&current.api_base, current.request_timeout())?;
        let controller = SessionController::new(Arc::new(api), current.session_config());

        Ok(Self {
            controller,
            settings,
        })
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }
}

pub async fn run() -> Result<()> {
    utils::logging::init();

    let cli = Cli::parse();
    log::info!("Cartography client starting up...");

    let settings = SettingsStore::new(cli.config.clone())?;
    log::debug!("Settings loaded from {}", settings.path().display());
    let state = AppState::new(settings, cli.api_base.clone())?;

    match &cli.command {
        Command::Analyze { pages, links, view } => {
            commands::analyze(&state, pages, links.as_deref(), view).await
        }
        Command::Projects => commands::list_projects(&state).await,
        Command::Load { project_id, view } => {
            commands::load_project(&state, project_id, view).await
        }
        Command::Mock { view } => commands::load_mock(&state, view).await,
        Command::Config { save } => commands::show_config(&state, cli.api_base.clone(), *save),
    }
}
