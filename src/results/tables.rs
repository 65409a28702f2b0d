use std::cmp::Ordering;
use std::fmt::Write;

use super::models::{AnalysisResult, Cluster, ProximityAnomaly};
use super::scatter::category_color;

/// Visual severity bucket of an anomaly score. Thresholds are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Severity::High
        } else if score > 0.6 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total_pages: u64,
    pub total_clusters: usize,
    pub total_anomalies: usize,
    pub total_links: u64,
}

impl Stats {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            total_pages: result.total_pages,
            total_clusters: result.clusters.len(),
            total_anomalies: result.proximities.len(),
            total_links: result.total_edges(),
        }
    }
}

/// Clusters with at least `min_size` pages, in backend order.
pub fn filter_clusters(clusters: &[Cluster], min_size: usize) -> Vec<&Cluster> {
    let min_size = min_size.max(1);
    clusters
        .iter()
        .filter(|cluster| cluster.size >= min_size)
        .collect()
}

/// Upper bound for the minimum-size control.
pub fn max_cluster_size(clusters: &[Cluster]) -> usize {
    clusters.iter().map(|cluster| cluster.size).max().unwrap_or(1)
}

/// Anomalies ordered by descending score. Ties keep backend order.
pub fn sort_anomalies(anomalies: &[ProximityAnomaly]) -> Vec<&ProximityAnomaly> {
    let mut sorted: Vec<&ProximityAnomaly> = anomalies.iter().collect();
    sorted.sort_by(|a, b| {
        b.anomaly_score
            .partial_cmp(&a.anomaly_score)
            .unwrap_or(Ordering::Equal)
    });
    sorted
}

const UNTHEMED: &str = "(no theme)";

fn link_distance(hops: Option<u32>) -> String {
    match hops {
        Some(hops) => format!("{hops} links"),
        None => "no link path".to_string(),
    }
}

fn percent(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow<'a> {
    pub color: &'static str,
    pub cluster: &'a Cluster,
}

#[derive(Debug, Clone)]
pub struct ClusterTable<'a> {
    pub rows: Vec<ClusterRow<'a>>,
    pub total: usize,
    pub min_size: usize,
}

impl<'a> ClusterTable<'a> {
    pub fn build(clusters: &'a [Cluster], min_size: usize) -> Self {
        let rows = filter_clusters(clusters, min_size)
            .into_iter()
            .enumerate()
            .map(|(index, cluster)| ClusterRow {
                color: category_color(index),
                cluster,
            })
            .collect();

        Self {
            rows,
            total: clusters.len(),
            min_size: min_size.max(1),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Clusters ({}/{}), min size {}",
            self.rows.len(),
            self.total,
            self.min_size
        );
        for row in &self.rows {
            let _ = writeln!(
                out,
                "  [{}] {} ({} pages)",
                row.cluster.cluster_id,
                row.cluster.theme.as_deref().unwrap_or(UNTHEMED),
                row.cluster.size
            );
            for url in &row.cluster.urls {
                let _ = writeln!(out, "      {url}");
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRow<'a> {
    pub severity: Severity,
    pub anomaly: &'a ProximityAnomaly,
}

#[derive(Debug, Clone)]
pub struct AnomalyTable<'a> {
    pub rows: Vec<AnomalyRow<'a>>,
}

impl<'a> AnomalyTable<'a> {
    pub fn build(anomalies: &'a [ProximityAnomaly]) -> Self {
        let rows = sort_anomalies(anomalies)
            .into_iter()
            .map(|anomaly| AnomalyRow {
                severity: Severity::from_score(anomaly.anomaly_score),
                anomaly,
            })
            .collect();
        Self { rows }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Proximity anomalies ({})", self.rows.len());
        for row in &self.rows {
            let anomaly = row.anomaly;
            let _ = writeln!(
                out,
                "  {:>3}% [{}] similarity {}%, {}: {} <-> {}",
                percent(anomaly.anomaly_score),
                row.severity.label(),
                percent(anomaly.cosine),
                link_distance(anomaly.hops),
                anomaly.url_i,
                anomaly.url_j
            );
        }
        out
    }
}
