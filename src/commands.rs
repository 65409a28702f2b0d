//! Terminal adapters: each command turns CLI input into controller calls and
//! renders the controller's snapshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;

use crate::progress::{ProgressState, StepMarker};
use crate::results::{
    max_cluster_size, write_exports, AnalysisResult, AnomalyTable, ClusterTable, Stats,
};
use crate::session::{SessionController, SessionPhase, SessionSnapshot};
use crate::upload::{SelectedFiles, UploadFile};
use crate::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "cartography",
    about = "Upload page and link CSVs to the cartography API and inspect the analysis"
)]
pub struct Cli {
    /// Settings file (JSON). Missing file means defaults.
    #[arg(long, env = "CARTOGRAPHY_CONFIG", default_value = "cartography.json")]
    pub config: PathBuf,

    /// API root, e.g. http://localhost:8000/api/v1. Overrides the settings file.
    #[arg(long, env = "CARTOGRAPHY_API_BASE")]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload files, run the analysis and show the results.
    Analyze {
        /// Pages CSV (required).
        #[arg(long)]
        pages: PathBuf,

        /// Links CSV.
        #[arg(long)]
        links: Option<PathBuf>,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// List projects saved on the backend.
    Projects,
    /// Show the latest completed analysis of a saved project.
    Load {
        project_id: String,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Show the backend's fixture results.
    Mock {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print the effective settings.
    Config {
        /// Write them back to the settings file, `--api-base` included.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Directory for the CSV exports and the projection SVG.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Hide clusters with fewer pages than this.
    #[arg(long, default_value_t = 1)]
    pub min_cluster_size: usize,
}

fn controller_from_state(state: &AppState) -> SessionController {
    state.controller.clone()
}

pub async fn analyze(
    state: &AppState,
    pages: &Path,
    links: Option<&Path>,
    view: &ViewArgs,
) -> Result<()> {
    let controller = controller_from_state(state);

    let links = match links {
        Some(path) => Some(UploadFile::read(path).await?),
        None => None,
    };
    let files = SelectedFiles::new(UploadFile::read(pages).await?, links);

    let renderer = tokio::spawn(render_progress(controller.subscribe()));
    let snapshot = match controller.start_analysis(files).await {
        Ok(()) => controller.wait_for_terminal().await,
        Err(_) => controller.snapshot(),
    };
    renderer.abort();

    finish(snapshot, view).await
}

pub async fn list_projects(state: &AppState) -> Result<()> {
    let controller = controller_from_state(state);
    let projects = controller.list_saved_projects().await?;

    if projects.is_empty() {
        println!("No saved projects.");
    }
    for project in projects {
        println!("{}  {}", project.id, project.label());
    }
    Ok(())
}

pub async fn load_project(state: &AppState, project_id: &str, view: &ViewArgs) -> Result<()> {
    let controller = controller_from_state(state);
    let result = controller.load_saved_project(project_id).await?;
    present(&result, view).await
}

pub async fn load_mock(state: &AppState, view: &ViewArgs) -> Result<()> {
    let controller = controller_from_state(state);
    let result = controller.load_mock_results().await?;
    present(&result, view).await
}

pub fn show_config(state: &AppState, api_base: Option<String>, save: bool) -> Result<()> {
    let store = state.settings();
    let mut settings = store.settings();
    if let Some(api_base) = api_base {
        settings.api_base = api_base;
    }

    println!("{}", serde_json::to_string_pretty(&settings)?);
    if save {
        store.update(settings)?;
        println!("Saved to {}", store.path().display());
    }
    Ok(())
}

async fn finish(snapshot: SessionSnapshot, view: &ViewArgs) -> Result<()> {
    match (snapshot.phase, snapshot.result) {
        (SessionPhase::Succeeded, Some(result)) => present(&result, view).await,
        _ => bail!(snapshot
            .error
            .unwrap_or_else(|| "analysis did not complete".to_string())),
    }
}

async fn render_progress(mut rx: watch::Receiver<SessionSnapshot>) {
    let mut last_line = String::new();
    while rx.changed().await.is_ok() {
        let line = {
            let snapshot = rx.borrow_and_update();
            match (&snapshot.progress, snapshot.progress_visible) {
                (Some(progress), true) => progress_line(snapshot.phase, progress),
                _ => continue,
            }
        };
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
    }
}

fn progress_line(phase: SessionPhase, progress: &ProgressState) -> String {
    const BAR_WIDTH: usize = 30;
    let filled = ((progress.percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>5.1}% {}{:?}: {}",
        "#".repeat(filled.min(BAR_WIDTH)),
        "-".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
        progress.percentage,
        step_track(progress),
        phase,
        progress.display_text()
    )
}

/// One character per analysis step: `x` done, `>` current, `.` upcoming.
fn step_track(progress: &ProgressState) -> String {
    if progress.total_steps == 0 {
        return String::new();
    }
    let marks: String = (1..=progress.total_steps)
        .map(|step| match progress.step_marker(step) {
            StepMarker::Completed => 'x',
            StepMarker::Active => '>',
            StepMarker::Upcoming => '.',
        })
        .collect();
    format!("({marks}) ")
}

async fn present(result: &Arc<AnalysisResult>, view: &ViewArgs) -> Result<()> {
    let stats = Stats::from_result(result);
    println!(
        "{} pages, {} clusters, {} anomalies, {} links",
        stats.total_pages, stats.total_clusters, stats.total_anomalies, stats.total_links
    );
    let min_size = view.min_cluster_size.min(max_cluster_size(&result.clusters));
    print!("{}", ClusterTable::build(&result.clusters, min_size).render_text());
    print!("{}", AnomalyTable::build(&result.proximities).render_text());

    if let Some(dir) = &view.out {
        let files = write_exports(result, dir, Utc::now().date_naive()).await?;
        println!("Wrote {}", files.clusters.display());
        println!("Wrote {}", files.anomalies.display());
        match files.projection {
            Some(path) => println!("Wrote {}", path.display()),
            None => println!("No projection data to plot"),
        }
    }
    Ok(())
}
