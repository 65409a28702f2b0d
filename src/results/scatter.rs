use std::fmt::Write;

use super::models::Point;

/// Ten-color qualitative palette; cluster colors cycle through it.
pub const CATEGORY_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

pub const UNCLUSTERED_COLOR: &str = "#999";

pub fn category_color(index: usize) -> &'static str {
    CATEGORY_PALETTE[index % CATEGORY_PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Canvas geometry for the projection plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotConfig {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    pub point_radius: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            margins: Margins {
                top: 20.0,
                right: 20.0,
                bottom: 40.0,
                left: 40.0,
            },
            point_radius: 5.0,
        }
    }
}

impl PlotConfig {
    pub fn inner_width(&self) -> f64 {
        self.width - self.margins.left - self.margins.right
    }

    pub fn inner_height(&self) -> f64 {
        self.height - self.margins.top - self.margins.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Fits the domain to the extent of `values`. `None` when empty.
    pub fn fit<I>(values: I, range: (f64, f64)) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut extent: Option<(f64, f64)> = None;
        for value in values.into_iter().filter(|v| v.is_finite()) {
            extent = Some(match extent {
                None => (value, value),
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
            });
        }
        extent.map(|domain| Self::new(domain, range))
    }

    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        // A single distinct value lands in the middle of the range.
        let t = if span == 0.0 { 0.5 } else { (value - d0) / span };
        r0 + t * (r1 - r0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlottedPoint {
    pub cx: f64,
    pub cy: f64,
    pub color: &'static str,
    pub url: String,
    pub cluster: Option<i64>,
}

impl PlottedPoint {
    pub fn hover_text(&self) -> String {
        let cluster = self
            .cluster
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        format!("URL: {}\nCluster: {}", self.url, cluster)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub cluster: i64,
    pub color: &'static str,
}

#[derive(Debug, Clone)]
pub struct ScatterPlot {
    pub config: PlotConfig,
    pub points: Vec<PlottedPoint>,
    pub legend: Vec<LegendEntry>,
}

impl ScatterPlot {
    /// Lays out the projection. Returns `None` when there is nothing to draw.
    pub fn layout(projection: &[Point], config: PlotConfig) -> Option<Self> {
        let x_scale = LinearScale::fit(projection.iter().map(|p| p.x), (0.0, config.inner_width()))?;
        let y_scale =
            LinearScale::fit(projection.iter().map(|p| p.y), (config.inner_height(), 0.0))?;

        // Colors follow first appearance, like an ordinal scale.
        let mut legend: Vec<LegendEntry> = Vec::new();
        for cluster in projection.iter().filter_map(|p| p.cluster) {
            if !legend.iter().any(|entry| entry.cluster == cluster) {
                legend.push(LegendEntry {
                    cluster,
                    color: category_color(legend.len()),
                });
            }
        }

        let points = projection
            .iter()
            .map(|point| {
                let color = point
                    .cluster
                    .and_then(|id| legend.iter().find(|entry| entry.cluster == id))
                    .map(|entry| entry.color)
                    .unwrap_or(UNCLUSTERED_COLOR);
                PlottedPoint {
                    cx: x_scale.apply(point.x),
                    cy: y_scale.apply(point.y),
                    color,
                    url: point.url.clone(),
                    cluster: point.cluster,
                }
            })
            .collect();

        Some(Self {
            config,
            points,
            legend,
        })
    }

    pub fn to_svg(&self) -> String {
        let cfg = &self.config;
        let inner_width = cfg.inner_width();
        let inner_height = cfg.inner_height();
        let mut svg = String::new();

        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
            cfg.width, cfg.height
        );
        let _ = writeln!(
            svg,
            r#"<g transform="translate({},{})">"#,
            cfg.margins.left, cfg.margins.top
        );
        let _ = writeln!(
            svg,
            r#"<line x1="0" y1="{h}" x2="{w}" y2="{h}" stroke="black"/><line x1="0" y1="0" x2="0" y2="{h}" stroke="black"/>"#,
            w = inner_width,
            h = inner_height
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">Dimension 1</text>"#,
            inner_width / 2.0,
            inner_height + 35.0
        );
        let _ = writeln!(
            svg,
            r#"<text transform="rotate(-90)" x="{}" y="-25" text-anchor="middle">Dimension 2</text>"#,
            -inner_height / 2.0
        );

        for point in &self.points {
            let _ = writeln!(
                svg,
                r##"<circle class="point" cx="{:.2}" cy="{:.2}" r="{}" fill="{}" stroke="#fff" stroke-width="1"><title>{}</title></circle>"##,
                point.cx,
                point.cy,
                cfg.point_radius,
                point.color,
                escape_xml(&point.hover_text())
            );
        }

        for (index, entry) in self.legend.iter().enumerate() {
            let _ = writeln!(
                svg,
                r#"<g class="legend" transform="translate({}, {})"><rect width="18" height="18" fill="{}"/><text x="24" y="9" dy=".35em" font-size="12px">Cluster {}</text></g>"#,
                inner_width - 100.0,
                index * 20,
                entry.color,
                entry.cluster
            );
        }

        svg.push_str("</g>\n</svg>\n");
        svg
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
