//! ==============================================================================
//! config.rs - dashboard configuration loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dashboard.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: listen address for the http server.
//!     - SeriesConfig: lookback window of the generated series.
//!     - LiveConfig: auto-refresh cadence, live step and buffer size.
//!     - ChartConfig: chart width used before the browser reports one.
//!     - LoggingConfig: default tracing filter.
//!
//! every section is optional; missing sections and keys take the defaults.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::buffer::DEFAULT_CAPACITY;
use crate::chart::DEFAULT_WIDTH;
use crate::dashboard::DashboardSettings;
use crate::generator::SeriesWindow;
use crate::live::LiveSettings;

pub const CONFIG_FILE: &str = "dashboard.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerConfig,
    pub series: SeriesConfig,
    pub live: LiveConfig,
    pub chart: ChartConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SeriesConfig {
    pub days: i64,
    pub step_hours: i64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        let window = SeriesWindow::default();
        Self { days: window.days, step_hours: window.step_hours }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LiveConfig {
    pub interval_seconds: u64,
    pub step_hours: i64,
    pub buffer_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self { interval_seconds: 10, step_hours: 6, buffer_capacity: DEFAULT_CAPACITY }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub default_width: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { default_width: DEFAULT_WIDTH }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl DashboardConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join(CONFIG_FILE),
            PathBuf::from("..").join("config").join(CONFIG_FILE),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// settings for the dashboard view. zero or negative values fall back
    /// to the smallest sane value
    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            window: SeriesWindow {
                days: self.series.days.max(0),
                step_hours: self.series.step_hours.max(1),
            },
            capacity: self.live.buffer_capacity.max(1),
            live: LiveSettings {
                interval: std::time::Duration::from_secs(self.live.interval_seconds.max(1)),
                step: chrono::Duration::hours(self.live.step_hours.max(1)),
            },
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│        DASHBOARD CONFIGURATION          │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Bind: {:<34}│", self.server.bind);
        println!("│ Series: {} days every {}h{:<17}│", self.series.days, self.series.step_hours, "");
        println!("│ Live Interval: {}s{:<24}│", self.live.interval_seconds, "");
        println!("│ Buffer Capacity: {:<23}│", self.live.buffer_capacity);
        println!("│ Log Level: {:<29}│", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
