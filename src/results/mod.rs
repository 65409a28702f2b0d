pub mod export;
pub mod models;
pub mod scatter;
pub mod tables;

pub use export::{anomalies_csv, clusters_csv, write_exports, ExportedFiles};
pub use models::{AnalysisResult, Cluster, Point, ProximityAnomaly};
pub use scatter::{PlotConfig, ScatterPlot};
pub use tables::{max_cluster_size, AnomalyTable, ClusterTable, Severity, Stats};
