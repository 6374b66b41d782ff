use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use aqua_dashboard::dashboard::{Dashboard, DashboardSettings, NoiseFactory};
use aqua_dashboard::noise::{NoiseSource, ScriptedNoise};
use aqua_dashboard::page::PageOptions;
use aqua_dashboard::web::{router, AppState};

fn state() -> AppState {
    let noise: NoiseFactory =
        Arc::new(|| Box::new(ScriptedNoise::new(vec![0.2, 0.5, 0.8, 0.4])) as Box<dyn NoiseSource>);
    let dashboard = Dashboard::with_noise(DashboardSettings::default(), noise);
    AppState::new(dashboard, PageOptions { chart_width: 600.0, refresh_ms: 10_000 })
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let res = router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn page_renders_for_default_view() {
    let state = state();
    let (status, _, body) = get(&state, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h1>Current Farm</h1>"));
    assert!(body.contains("Blue Bay Salmon"));
    assert!(body.contains("<b>Records:</b> 29"));
}

#[tokio::test]
async fn page_query_switches_farm_for_later_requests() {
    let state = state();
    // switching farm drops the pond; the pond of the new farm applies afterwards
    get(&state, "/?farm=farm-b&pond=Pond+B2").await;
    let (_, _, body) = get(&state, "/api/summary").await;
    let summary: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(summary["query"].as_str().unwrap().starts_with("farm=farm-b&pond=All&"));

    let (status, _, _) = get(&state, "/?farm=farm-b&pond=Pond+B2").await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = get(&state, "/api/readings").await;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|r| r["farm"] == "farm-b" && r["pond"] == "Pond B2"));

    let (_, _, body) = get(&state, "/api/summary").await;
    let summary: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["farm"], "farm-b");
    assert_eq!(summary["count"].as_u64().unwrap() as usize, rows.len());
    assert!(summary["query"].as_str().unwrap().starts_with("farm=farm-b&pond=Pond+B2"));
}

#[tokio::test]
async fn chart_route_serves_svg_at_requested_width() {
    let state = state();
    let (status, headers, body) = get(&state, "/charts/ph?width=820").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
    assert!(body.starts_with("<svg"));
    assert!(body.contains(r#"width="820""#));
    assert!(body.contains("<path"));
}

#[tokio::test]
async fn unknown_metric_is_not_found() {
    let state = state();
    let (status, _, body) = get(&state, "/charts/salinity").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("salinity"));
    let (status, _, _) = get(&state, "/api/hover/salinity?x=10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hover_resolves_nearest_point() {
    let state = state();
    let (status, _, body) = get(&state, "/api/hover/temp?x=0&width=600").await;
    assert_eq!(status, StatusCode::OK);
    let tip: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(tip["index"], 0);
    assert_eq!(tip["x"], 44.0);
    assert_eq!(tip["left"], 52.0);
    assert_eq!(tip["lines"].as_array().unwrap().len(), 2);
    assert!(tip["lines"][1].as_str().unwrap().ends_with(" °C"));
    assert_eq!(tip["stale"], false);
}

fn series_attr(svg: &str) -> &str {
    let start = svg.find(r#"data-series=""#).unwrap() + r#"data-series=""#.len();
    let len = svg[start..].find('"').unwrap();
    &svg[start..start + len]
}

#[tokio::test]
async fn hover_flags_an_outdated_chart() {
    let state = state();
    let (_, _, svg) = get(&state, "/charts/temp?width=600").await;
    let shown = series_attr(&svg).to_string();

    let (_, _, body) = get(&state, &format!("/api/hover/temp?x=100&width=600&series={shown}")).await;
    let tip: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(tip["stale"], false);
    assert_eq!(tip["series"], shown.as_str());

    let (_, _, body) = get(&state, "/api/hover/temp?x=100&width=600&series=28-0").await;
    let tip: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(tip["stale"], true);
    assert_eq!(tip["series"], shown.as_str());
}

#[tokio::test]
async fn hover_on_empty_window_is_null() {
    let state = state();
    get(&state, "/?farm=farm-a&from=2099-01-01").await;
    let (status, _, body) = get(&state, "/api/hover/temp?x=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "null");
}

#[tokio::test]
async fn export_serves_csv_attachment() {
    let state = state();
    let (status, headers, body) = get(&state, "/export.csv").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"current-farm.csv\""
    );
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("ts,temp,ph,nh3,dox,farm,pond"));
    assert_eq!(lines.count(), 29);
}

#[tokio::test]
async fn export_rows_stay_well_formed_for_delimiter_farm_ids() {
    let state = state();
    for query in ["/?farm=north%2Csouth", "/?farm=a%0Ab", "/?farm=x%22y"] {
        get(&state, query).await;
        let (status, _, body) = get(&state, "/export.csv").await;
        assert_eq!(status, StatusCode::OK);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 30, "{query}");
        for row in &lines[1..] {
            let fields: Vec<&str> = row.split(',').collect();
            assert_eq!(fields.len(), 7, "{query}: {row}");
            assert_eq!(fields[5], "farm-a");
        }
    }
}

#[tokio::test]
async fn export_of_empty_window_has_no_content() {
    let state = state();
    get(&state, "/?farm=farm-c&to=2000-01-01").await;
    let (status, _, body) = get(&state, "/export.csv").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn farm_catalog_lists_three_farms() {
    let state = state();
    let (_, _, body) = get(&state, "/api/farms").await;
    let farms: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(farms.len(), 3);
    assert_eq!(farms[1]["id"], "farm-b");
    assert_eq!(farms[1]["ponds"].as_array().unwrap().len(), 3);
}
