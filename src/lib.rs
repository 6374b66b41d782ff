//! ==============================================================================
//! aqua-dashboard - aquaculture pond telemetry dashboard
//! ==============================================================================
//!
//! simulates water-quality readings (temperature, pH, ammonia, dissolved
//! oxygen) for a small catalog of farms and serves a filterable dashboard
//! with kpis, threshold alerts, safety percentages, svg charts and csv export.
//!
//! module map:
//!
//! ```text
//!     domain ──> generator ──> buffer ──> live
//!        │                        │
//!        └──> analytics <── view_state
//!                 │
//!    html ──> chart, export ──> page ──> web
//!                                       │
//!     config ──> dashboard ─────────────┘
//! ```
//!
//! ==============================================================================

pub mod analytics;
pub mod buffer;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod export;
pub mod generator;
pub mod html;
pub mod live;
pub mod noise;
pub mod page;
pub mod view_state;
pub mod web;
