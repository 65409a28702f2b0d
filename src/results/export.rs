use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::models::{AnalysisResult, Cluster, ProximityAnomaly};
use super::scatter::{PlotConfig, ScatterPlot};
use super::tables::sort_anomalies;

pub const CLUSTERS_HEADER: &str = "Cluster_ID,Theme,Nb_Pages,URL";
pub const ANOMALIES_HEADER: &str =
    "Anomaly_Score,Semantic_Similarity,Link_Distance,URL_Page_1,URL_Page_2,Node_ID_1,Node_ID_2";

/// Written for fields the pipeline leaves null, as the web client did.
const NULL_FIELD: &str = "null";

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// One row per (cluster, url) pair, every cluster regardless of view filters.
pub fn clusters_csv(clusters: &[Cluster]) -> String {
    let mut csv = String::from(CLUSTERS_HEADER);
    csv.push('\n');
    for cluster in clusters {
        for url in &cluster.urls {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                cluster.cluster_id,
                quote(cluster.theme.as_deref().unwrap_or(NULL_FIELD)),
                cluster.size,
                quote(url)
            ));
        }
    }
    csv
}

/// One row per anomaly, highest score first, scores to three decimals.
pub fn anomalies_csv(anomalies: &[ProximityAnomaly]) -> String {
    let mut csv = String::from(ANOMALIES_HEADER);
    csv.push('\n');
    for anomaly in sort_anomalies(anomalies) {
        csv.push_str(&format!(
            "{:.3},{:.3},{},{},{},{},{}\n",
            anomaly.anomaly_score,
            anomaly.cosine,
            anomaly
                .hops
                .map(|hops| hops.to_string())
                .unwrap_or_else(|| NULL_FIELD.to_string()),
            quote(&anomaly.url_i),
            quote(&anomaly.url_j),
            quote(&anomaly.node_i),
            quote(&anomaly.node_j)
        ));
    }
    csv
}

pub fn clusters_file_name(date: NaiveDate) -> String {
    format!("clusters_{}.csv", date.format("%Y-%m-%d"))
}

pub fn anomalies_file_name(date: NaiveDate) -> String {
    format!("anomalies_{}.csv", date.format("%Y-%m-%d"))
}

pub fn projection_file_name(date: NaiveDate) -> String {
    format!("projection_{}.svg", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Default)]
pub struct ExportedFiles {
    pub clusters: PathBuf,
    pub anomalies: PathBuf,
    pub projection: Option<PathBuf>,
}

/// Writes both CSV files and, when there is a projection, the SVG plot.
pub async fn write_exports(result: &AnalysisResult, dir: &Path, date: NaiveDate) -> Result<ExportedFiles> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let clusters = dir.join(clusters_file_name(date));
    tokio::fs::write(&clusters, clusters_csv(&result.clusters))
        .await
        .with_context(|| format!("Failed to write {}", clusters.display()))?;

    let anomalies = dir.join(anomalies_file_name(date));
    tokio::fs::write(&anomalies, anomalies_csv(&result.proximities))
        .await
        .with_context(|| format!("Failed to write {}", anomalies.display()))?;

    let projection = match ScatterPlot::layout(&result.projection_2d, PlotConfig::default()) {
        Some(plot) => {
            let path = dir.join(projection_file_name(date));
            tokio::fs::write(&path, plot.to_svg())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Some(path)
        }
        None => None,
    };

    Ok(ExportedFiles {
        clusters,
        anomalies,
        projection,
    })
}
