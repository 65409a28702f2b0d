use serde::{Deserialize, Deserializer, Serialize};

/// Completed analysis payload as returned by the progress and results endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    /// Saved analyses expose this list as `anomalies`.
    #[serde(default, alias = "anomalies")]
    pub proximities: Vec<ProximityAnomaly>,
    #[serde(default)]
    pub projection_2d: Vec<Point>,
    #[serde(default)]
    pub summary: Option<ResultSummary>,
}

impl AnalysisResult {
    pub fn total_edges(&self) -> u64 {
        self.summary
            .as_ref()
            .and_then(|summary| summary.graph_stats.as_ref())
            .map(|stats| stats.total_edges)
            .unwrap_or(0)
    }

    /// Clusters whose reported size disagrees with their URL list.
    pub fn inconsistent_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|cluster| !cluster.is_consistent())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub cluster_id: i64,
    /// Theme labelling is not implemented by the pipeline yet; it sends `null`.
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Cluster {
    pub fn is_consistent(&self) -> bool {
        self.size == self.urls.len()
    }
}

/// Pair of pages that are semantically close but far apart in the link graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProximityAnomaly {
    pub anomaly_score: f64,
    pub cosine: f64,
    /// Link distance. `None` when no links file was imported or the pages
    /// are not connected.
    #[serde(default)]
    pub hops: Option<u32>,
    pub url_i: String,
    pub url_j: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub node_i: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub node_j: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub url: String,
    #[serde(default)]
    pub cluster: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSummary {
    #[serde(default)]
    pub graph_stats: Option<GraphStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphStats {
    #[serde(default)]
    pub total_edges: u64,
}

/// Node ids come back as strings from the fixture endpoint and as integers
/// from the real pipeline.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
