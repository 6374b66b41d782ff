//! ==============================================================================
//! chart.rs - line chart geometry, hover resolution and svg output
//! ==============================================================================
//!
//! purpose:
//!     turns one metric of a filtered reading window into plot coordinates
//!     and renders them as a standalone svg: threshold band underneath, axes,
//!     five date ticks, y bound labels, the line trace and an optional hover
//!     marker.
//!
//! coordinate model:
//!     x: linear over [min ts, max ts] -> [left pad, width - right pad]
//!     y: linear over [y min, y max]   -> [height - bottom pad, top pad]
//!     a zero-width domain is treated as width 1, so equal timestamps map to
//!     the left edge instead of dividing by zero.
//!
//! relationships:
//!     - used by: page.rs (inline charts), web.rs (chart + hover routes)
//!     - uses: domain.rs (MetricChart table, thresholds), html.rs (escaping)
//!
//! ==============================================================================

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Metric, Reading};
use crate::html::html_escape;

pub const CHART_HEIGHT: f64 = 200.0;
/// width used until the browser reports the container width
pub const DEFAULT_WIDTH: f64 = 600.0;
pub const MIN_WIDTH: f64 = 120.0;
pub const MAX_WIDTH: f64 = 4000.0;
/// evenly spaced time ticks, both ends included
pub const X_TICKS: usize = 5;
const BAND_OPACITY: f64 = 0.12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Padding {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self { left: 44.0, right: 10.0, top: 12.0, bottom: 26.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self::with_width(DEFAULT_WIDTH)
    }
}

impl ChartLayout {
    /// layout for a container `width` px wide; height is fixed
    pub fn with_width(width: f64) -> Self {
        let width = if width.is_finite() { width.clamp(MIN_WIDTH, MAX_WIDTH) } else { DEFAULT_WIDTH };
        Self { width, height: CHART_HEIGHT, padding: Padding::default() }
    }

    pub fn plot_left(&self) -> f64 {
        self.padding.left
    }

    pub fn plot_right(&self) -> f64 {
        self.width - self.padding.right
    }

    pub fn plot_top(&self) -> f64 {
        self.padding.top
    }

    pub fn plot_bottom(&self) -> f64 {
        self.height - self.padding.bottom
    }

    pub fn plot_width(&self) -> f64 {
        self.plot_right() - self.plot_left()
    }
}

// ==============================================================================
// scales
// ==============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, v: f64) -> f64 {
        let mut span = self.domain.1 - self.domain.0;
        if span == 0.0 || !span.is_finite() {
            span = 1.0;
        }
        self.range.0 + ((v - self.domain.0) / span) * (self.range.1 - self.range.0)
    }
}

/// where the y-axis bounds come from
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum YBounds {
    Fixed(f64, f64),
    /// min/max of the plotted values
    Data,
}

// ==============================================================================
// geometry
// ==============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlotPoint {
    /// position in the supplied series
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BandRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub x: f64,
    pub label: String,
}

/// a `[low, high]` value band drawn across the plot
#[derive(Clone, Copy, Debug)]
pub struct Band {
    pub low: f64,
    pub high: f64,
    pub color: &'static str,
}

#[derive(Clone, Debug)]
pub struct ChartGeometry {
    pub layout: ChartLayout,
    pub points: Vec<PlotPoint>,
    pub bands: Vec<BandRect>,
    pub ticks: Vec<Tick>,
    pub y_min: f64,
    pub y_max: f64,
    y_scale: LinearScale,
}

fn millis(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

impl ChartGeometry {
    /// geometry for one metric using its row of the chart table
    pub fn for_metric(readings: &[Reading], metric: Metric, layout: ChartLayout) -> Self {
        let cfg = metric.chart();
        let thr = metric.threshold();
        let series: Vec<(DateTime<Utc>, f64)> =
            readings.iter().map(|r| (r.timestamp, r.value(metric))).collect();
        let bands = [Band { low: thr.min, high: thr.max, color: cfg.band_color }];
        Self::build(&series, YBounds::Fixed(cfg.y_range.0, cfg.y_range.1), &bands, layout)
    }

    pub fn build(
        series: &[(DateTime<Utc>, f64)],
        y_bounds: YBounds,
        bands: &[Band],
        layout: ChartLayout,
    ) -> Self {
        let (x_min, x_max) = min_max(series.iter().map(|(t, _)| millis(*t))).unwrap_or((0.0, 0.0));
        let (y_min, y_max) = match y_bounds {
            YBounds::Fixed(lo, hi) => (lo, hi),
            YBounds::Data => min_max(series.iter().map(|(_, v)| *v)).unwrap_or((0.0, 1.0)),
        };

        let x_scale = LinearScale::new((x_min, x_max), (layout.plot_left(), layout.plot_right()));
        let y_scale = LinearScale::new((y_min, y_max), (layout.plot_bottom(), layout.plot_top()));

        let points = series
            .iter()
            .enumerate()
            .map(|(index, (ts, value))| PlotPoint {
                index,
                x: x_scale.apply(millis(*ts)),
                y: y_scale.apply(*value),
                timestamp: *ts,
                value: *value,
            })
            .collect();

        let bands = bands
            .iter()
            .map(|b| {
                let top = y_scale.apply(b.high);
                BandRect {
                    x: layout.plot_left(),
                    y: top,
                    width: layout.plot_width(),
                    height: (y_scale.apply(b.low) - top).max(0.0),
                    color: b.color,
                }
            })
            .collect();

        let ticks = if series.is_empty() {
            Vec::new()
        } else {
            (0..X_TICKS)
                .map(|i| {
                    let t = x_min + (i as f64 / (X_TICKS - 1) as f64) * (x_max - x_min);
                    let label = DateTime::<Utc>::from_timestamp_millis(t.round() as i64)
                        .map(|d| d.format("%b %-d").to_string())
                        .unwrap_or_default();
                    Tick { x: x_scale.apply(t), label }
                })
                .collect()
        };

        Self { layout, points, bands, ticks, y_min, y_max, y_scale }
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y_scale
    }

    /// svg path data; empty when there is nothing to plot
    pub fn path(&self) -> String {
        let mut d = String::new();
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                d.push(' ');
            }
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{cmd} {:.2} {:.2}", p.x, p.y);
        }
        d
    }

    /// identifies the plotted series: point count and last timestamp.
    /// a live append changes it even once the buffer is full
    pub fn series_key(&self) -> String {
        match self.points.last() {
            Some(p) => format!("{}-{}", self.points.len(), p.timestamp.timestamp_millis()),
            None => "0".to_string(),
        }
    }

    /// data point whose x is closest to `pointer_x` (first one wins ties)
    pub fn nearest(&self, pointer_x: f64) -> Option<&PlotPoint> {
        let mut best: Option<(&PlotPoint, f64)> = None;
        for p in &self.points {
            let dist = (p.x - pointer_x).abs();
            match best {
                Some((_, d)) if dist >= d => {}
                _ => best = Some((p, dist)),
            }
        }
        best.map(|(p, _)| p)
    }
}

// ==============================================================================
// tooltip
// ==============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tooltip {
    pub metric: Metric,
    pub index: usize,
    /// marker position
    pub x: f64,
    pub y: f64,
    /// text box position, offset from the marker
    pub left: f64,
    pub top: f64,
    pub lines: Vec<String>,
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// resolve a pointer offset to the tooltip for the nearest point
pub fn tooltip(geometry: &ChartGeometry, metric: Metric, pointer_x: f64) -> Option<Tooltip> {
    let p = geometry.nearest(pointer_x)?;
    Some(Tooltip {
        metric,
        index: p.index,
        x: p.x,
        y: p.y,
        left: p.x + 8.0,
        top: p.y + 8.0,
        lines: vec![format_timestamp(p.timestamp), (metric.chart().format_value)(p.value)],
    })
}

// ==============================================================================
// svg
// ==============================================================================

const AXIS_COLOR: &str = "#dbe4f3";
const LABEL_COLOR: &str = "#64748b";
const GUIDE_COLOR: &str = "#94a3b8";
const TOOLTIP_TEXT: &str = "#0f172a";

pub fn render_svg(geometry: &ChartGeometry, metric: Metric, hover: Option<&Tooltip>) -> String {
    let cfg = metric.chart();
    let l = &geometry.layout;
    let (w, h) = (l.width, l.height);
    let mut svg = String::with_capacity(2048 + geometry.points.len() * 24);

    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="img" aria-label="{title}" data-metric="{key}" data-series="{series}">"#,
        title = html_escape(cfg.title),
        key = metric.key(),
        series = geometry.series_key(),
    );

    for b in &geometry.bands {
        let _ = write!(
            svg,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" opacity="{BAND_OPACITY}"/>"#,
            b.x, b.y, b.width, b.height, b.color
        );
    }

    // axes
    let _ = write!(
        svg,
        r#"<line x1="{x0}" y1="{yb}" x2="{x1}" y2="{yb}" stroke="{AXIS_COLOR}"/><line x1="{x0}" y1="{yt}" x2="{x0}" y2="{yb}" stroke="{AXIS_COLOR}"/>"#,
        x0 = l.plot_left(),
        x1 = l.plot_right(),
        yt = l.plot_top(),
        yb = l.plot_bottom(),
    );

    for t in &geometry.ticks {
        let _ = write!(
            svg,
            r#"<g transform="translate({:.2}, {})"><line y2="6" stroke="{AXIS_COLOR}"/><text y="18" text-anchor="middle" font-size="11" fill="{LABEL_COLOR}">{}</text></g>"#,
            t.x,
            l.plot_bottom(),
            html_escape(&t.label)
        );
    }

    let y_scale = geometry.y_scale();
    let _ = write!(
        svg,
        r#"<text x="6" y="{:.2}" font-size="10" fill="{LABEL_COLOR}">{}</text><text x="6" y="{:.2}" font-size="10" fill="{LABEL_COLOR}">{}</text>"#,
        y_scale.apply(geometry.y_max),
        geometry.y_max,
        y_scale.apply(geometry.y_min),
        geometry.y_min
    );

    if !geometry.points.is_empty() {
        let _ = write!(
            svg,
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2.5"/>"#,
            geometry.path(),
            cfg.color
        );
    }

    if let Some(tip) = hover {
        let _ = write!(
            svg,
            r#"<g class="hover"><line x1="{x:.2}" x2="{x:.2}" y1="{}" y2="{}" stroke="{GUIDE_COLOR}" stroke-dasharray="3 3"/><circle cx="{x:.2}" cy="{y:.2}" r="3.5" fill="{}"/>"#,
            l.plot_top(),
            l.plot_bottom(),
            cfg.color,
            x = tip.x,
            y = tip.y,
        );
        for (i, line) in tip.lines.iter().enumerate() {
            let _ = write!(
                svg,
                r#"<text x="{:.2}" y="{:.2}" font-size="11" fill="{TOOLTIP_TEXT}">{}</text>"#,
                tip.left,
                tip.top + 12.0 * (i as f64 + 1.0),
                html_escape(line)
            );
        }
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}
