//! ==============================================================================
//! domain.rs - readings, farm catalog and per-metric reference tables
//! ==============================================================================
//!
//! purpose:
//!     the shared vocabulary of the dashboard. every other module speaks in
//!     terms of `Reading`, `Farm` and `Metric`.
//!
//! relationships:
//!     - produced by: generator.rs (bulk series, live ticks)
//!     - consumed by: analytics.rs, chart.rs, export.rs, web.rs
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// a single sensor sample for one pond of one farm
///
/// field order matters: it is the column order of the csv export and the
/// key order of the json api.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// sample instant, serialized as iso-8601
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// water temperature in celsius
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub ph: f64,
    /// ammonia in mg/L
    #[serde(rename = "nh3")]
    pub ammonia: f64,
    /// dissolved oxygen in mg/L
    #[serde(rename = "dox")]
    pub dissolved_oxygen: f64,
    #[serde(rename = "farm")]
    pub farm_id: String,
    #[serde(rename = "pond")]
    pub pond_label: String,
}

impl Reading {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Ph => self.ph,
            Metric::Ammonia => self.ammonia,
            Metric::DissolvedOxygen => self.dissolved_oxygen,
        }
    }
}

// ==============================================================================
// farm catalog
// ==============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct Farm {
    pub id: &'static str,
    pub display_name: &'static str,
    pub ponds: &'static [&'static str],
}

pub static FARMS: [Farm; 3] = [
    Farm { id: "farm-a", display_name: "Blue Bay Salmon", ponds: &["Pond A1", "Pond A2"] },
    Farm { id: "farm-b", display_name: "Coral Prawn Estate", ponds: &["Pond B1", "Pond B2", "Pond B3"] },
    Farm { id: "farm-c", display_name: "Mussel Cove", ponds: &["Pond C1"] },
];

/// pond list used when a farm id is not in the catalog
pub const FALLBACK_PONDS: &[&str] = &["Pond"];

/// sentinel pond selection meaning "no pond filter"
pub const ALL_PONDS: &str = "All";

pub fn find_farm(id: &str) -> Option<&'static Farm> {
    FARMS.iter().find(|f| f.id == id)
}

pub fn default_farm() -> &'static Farm {
    &FARMS[0]
}

/// ponds for a farm id, falling back to a single synthetic pond
pub fn ponds_for(farm_id: &str) -> &'static [&'static str] {
    find_farm(farm_id).map(|f| f.ponds).unwrap_or(FALLBACK_PONDS)
}

// ==============================================================================
// metrics, thresholds and chart configuration
// ==============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "temp")]
    Temperature,
    #[serde(rename = "ph")]
    Ph,
    #[serde(rename = "nh3")]
    Ammonia,
    #[serde(rename = "dox")]
    DissolvedOxygen,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Ph,
        Metric::Ammonia,
        Metric::DissolvedOxygen,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Temperature => "temp",
            Metric::Ph => "ph",
            Metric::Ammonia => "nh3",
            Metric::DissolvedOxygen => "dox",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn threshold(self) -> &'static Threshold {
        &THRESHOLDS[self as usize]
    }

    pub fn chart(self) -> &'static MetricChart {
        &METRIC_CHARTS[self as usize]
    }
}

/// safe range for one metric, both ends inclusive
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Threshold {
    pub min: f64,
    pub max: f64,
    pub label: &'static str,
}

impl Threshold {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn badge(&self, value: f64) -> Badge {
        if value < self.min {
            Badge::Low
        } else if value > self.max {
            Badge::High
        } else {
            Badge::Ok
        }
    }
}

// indexed by `Metric as usize`
static THRESHOLDS: [Threshold; 4] = [
    Threshold { min: 24.0, max: 30.0, label: "Water Temp (°C)" },
    Threshold { min: 6.5, max: 8.2, label: "pH" },
    Threshold { min: 0.0, max: 0.5, label: "Ammonia (mg/L)" },
    Threshold { min: 6.5, max: 8.5, label: "Dissolved Oxygen (mg/L)" },
];

/// live panel classification of a value against its threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Low,
    Ok,
    High,
}

impl Badge {
    pub fn as_str(self) -> &'static str {
        match self {
            Badge::Low => "low",
            Badge::Ok => "ok",
            Badge::High => "high",
        }
    }
}

/// declarative chart settings, one row per metric
pub struct MetricChart {
    pub title: &'static str,
    /// fixed y-axis bounds
    pub y_range: (f64, f64),
    pub color: &'static str,
    pub band_color: &'static str,
    /// value line of the tooltip
    pub format_value: fn(f64) -> String,
}

fn fmt_temp(v: f64) -> String {
    format!("{v} °C")
}

fn fmt_ph(v: f64) -> String {
    format!("pH {v}")
}

fn fmt_ammonia(v: f64) -> String {
    format!("NH₃ {v} mg/L")
}

fn fmt_oxygen(v: f64) -> String {
    format!("DO {v} mg/L")
}

static METRIC_CHARTS: [MetricChart; 4] = [
    MetricChart {
        title: "Water Temperature (°C)",
        y_range: (20.0, 32.0),
        color: "#0ea5e9",
        band_color: "#22d3ee",
        format_value: fmt_temp,
    },
    MetricChart {
        title: "pH Level",
        y_range: (6.2, 8.6),
        color: "#10b981",
        band_color: "#34d399",
        format_value: fmt_ph,
    },
    MetricChart {
        title: "Ammonia (mg/L)",
        y_range: (0.0, 1.2),
        color: "#f59e0b",
        band_color: "#fbbf24",
        format_value: fmt_ammonia,
    },
    MetricChart {
        title: "Dissolved Oxygen (mg/L)",
        y_range: (5.5, 9.0),
        color: "#6366f1",
        band_color: "#818cf8",
        format_value: fmt_oxygen,
    },
];
