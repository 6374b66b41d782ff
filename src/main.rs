//! ==============================================================================
//! main.rs - aquaculture dashboard entry point
//! ==============================================================================
//!
//! responsibilities:
//!     - load dashboard.toml (or defaults) and print the summary
//!     - initialise tracing from RUST_LOG or the configured level
//!     - build the dashboard view with its first generated series
//!     - serve the http surface until ctrl-c
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────┐
//!     │                  rust host (this file)               │
//!     │  ┌──────────────┐        ┌─────────────────────────┐ │
//!     │  │ web server   │ ─────> │ dashboard (RwLock)      │ │
//!     │  │ (axum)       │  sync  │  ├─ view store (filter) │ │
//!     │  └──────────────┘        │  ├─ reading buffer      │ │
//!     │                          │  └─ live feed (10s)     │ │
//!     │                          └─────────────────────────┘ │
//!     └──────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use aqua_dashboard::config::DashboardConfig;
use aqua_dashboard::dashboard::Dashboard;
use aqua_dashboard::page::PageOptions;
use aqua_dashboard::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Aquaculture Dashboard");
    println!("  Simulated pond telemetry, filterable and shareable");
    println!("===========================================================");

    // step 1: load configuration
    let config = DashboardConfig::load_or_default();
    config.print_summary();

    // step 2: logging, RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 3: dashboard view with the default farm loaded
    let settings = config.dashboard_settings();
    let dashboard = Dashboard::new(settings);
    let page = PageOptions {
        chart_width: config.chart.default_width,
        refresh_ms: settings.live.interval.as_millis() as u64,
    };
    let state = AppState::new(dashboard, page);

    // step 4: serve until the server fails or ctrl-c
    println!("[STARTUP] ✓ Dashboard live at http://{}", config.server.bind);
    tokio::select! {
        res = web::serve(&config.server.bind, state.clone()) => {
            if let Err(e) = &res {
                tracing::error!(error = %e, "web server error");
            }
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }

    state.dashboard.write().await.shutdown().await;
    Ok(())
}
