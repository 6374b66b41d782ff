//! ==============================================================================
//! web.rs - http surface of the dashboard
//! ==============================================================================
//!
//! routes:
//!     GET /                    full page; the query string is the view filter
//!     GET /charts/{metric}     one chart svg (?width=, optional ?hover=)
//!     GET /api/hover/{metric}  tooltip json for pointer ?x= at ?width=, flags a
//!                              ?series= that no longer matches the buffer
//!     GET /api/readings        filtered readings
//!     GET /api/summary         stats, safety scores, alerts, latest reading
//!     GET /export.csv          filtered readings as csv, 204 when empty
//!     GET /api/farms           farm catalog
//!
//! only GET / changes the view. every other route reads the view the last
//! page load selected, so chart and hover requests never reset the filter.
//!
//! ==============================================================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analytics::{Alert, DerivedStats, PerMetric};
use crate::chart::{render_svg, tooltip, ChartGeometry, ChartLayout, Tooltip};
use crate::dashboard::{Dashboard, Snapshot};
use crate::domain::{Farm, Metric, Reading, FARMS};
use crate::export::{to_csv, EXPORT_FILENAME};
use crate::page::{render_page, PageOptions};
use crate::view_state::ViewFilter;

// ==============================================================================
// shared state
// ==============================================================================

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<RwLock<Dashboard>>,
    pub page: PageOptions,
}

impl AppState {
    pub fn new(dashboard: Dashboard, page: PageOptions) -> Self {
        Self { dashboard: Arc::new(RwLock::new(dashboard)), page }
    }

    async fn snapshot(&self) -> Snapshot {
        let dash = self.dashboard.read().await;
        dash.snapshot().await
    }
}

// ==============================================================================
// errors
// ==============================================================================

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("unknown metric `{0}`, expected one of temp, ph, nh3, dox")]
    UnknownMetric(String),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::UnknownMetric(_) => StatusCode::NOT_FOUND,
        };
        tracing::debug!(error = %self, "request rejected");
        let body = serde_json::json!({"status": "error", "message": self.to_string()});
        (status, Json(body)).into_response()
    }
}

fn metric_from_path(key: String) -> Result<Metric, DashboardError> {
    Metric::from_key(&key).ok_or(DashboardError::UnknownMetric(key))
}

// ==============================================================================
// router
// ==============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/charts/:metric", get(chart_handler))
        .route("/api/hover/:metric", get(hover_handler))
        .route("/api/readings", get(readings_handler))
        .route("/api/summary", get(summary_handler))
        .route("/export.csv", get(export_handler))
        .route("/api/farms", get(farms_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// bind and serve until the listener fails
pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "dashboard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ==============================================================================
// handlers
// ==============================================================================

async fn page_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    let filter = ViewFilter::from_query(query.as_deref().unwrap_or(""));
    let snapshot = {
        let mut dash = state.dashboard.write().await;
        dash.sync(filter).await;
        dash.snapshot().await
    };
    Html(render_page(&snapshot, state.page))
}

#[derive(Debug, Deserialize)]
struct ChartParams {
    width: Option<f64>,
    hover: Option<f64>,
}

async fn chart_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<ChartParams>,
) -> Result<Response, DashboardError> {
    let metric = metric_from_path(key)?;
    let derived = state.snapshot().await.derived();
    let layout = ChartLayout::with_width(params.width.unwrap_or(state.page.chart_width));
    let geometry = ChartGeometry::for_metric(&derived.filtered, metric, layout);
    let hover = params.hover.and_then(|x| tooltip(&geometry, metric, x));
    let svg = render_svg(&geometry, metric, hover.as_ref());
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

#[derive(Debug, Deserialize)]
struct HoverParams {
    x: f64,
    width: Option<f64>,
    /// `data-series` of the svg the pointer is over
    series: Option<String>,
}

#[derive(Debug, Serialize)]
struct HoverTip {
    #[serde(flatten)]
    tooltip: Tooltip,
    plot_top: f64,
    plot_bottom: f64,
    series: String,
    /// the tooltip was resolved against newer points than the caller's svg
    stale: bool,
}

/// `null` when the filtered window has no points
async fn hover_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<HoverParams>,
) -> Result<Json<Option<HoverTip>>, DashboardError> {
    let metric = metric_from_path(key)?;
    let derived = state.snapshot().await.derived();
    let layout = ChartLayout::with_width(params.width.unwrap_or(state.page.chart_width));
    let geometry = ChartGeometry::for_metric(&derived.filtered, metric, layout);
    let series = geometry.series_key();
    let stale = params.series.as_deref().is_some_and(|shown| shown != series);
    let tip = tooltip(&geometry, metric, params.x).map(|tooltip| HoverTip {
        tooltip,
        plot_top: layout.plot_top(),
        plot_bottom: layout.plot_bottom(),
        series,
        stale,
    });
    Ok(Json(tip))
}

async fn readings_handler(State(state): State<AppState>) -> Json<Vec<Reading>> {
    Json(state.snapshot().await.derived().filtered)
}

#[derive(Debug, Serialize)]
struct Summary {
    farm: String,
    query: String,
    live: bool,
    #[serde(flatten)]
    stats: DerivedStats,
    safety: PerMetric<u8>,
    alerts: Vec<Alert>,
}

async fn summary_handler(State(state): State<AppState>) -> Json<Summary> {
    let snapshot = state.snapshot().await;
    let derived = snapshot.derived();
    Json(Summary {
        query: snapshot.filter.to_query(),
        farm: snapshot.farm_id,
        live: snapshot.live,
        stats: derived.stats,
        safety: derived.safety,
        alerts: derived.alerts,
    })
}

async fn export_handler(State(state): State<AppState>) -> Response {
    let derived = state.snapshot().await.derived();
    match to_csv(&derived.filtered) {
        None => StatusCode::NO_CONTENT.into_response(),
        Some(csv) => {
            tracing::info!(rows = derived.filtered.len(), "csv export");
            let disposition = format!("attachment; filename=\"{EXPORT_FILENAME}\"");
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
    }
}

async fn farms_handler() -> Json<Vec<Farm>> {
    Json(FARMS.to_vec())
}
