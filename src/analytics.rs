//! ==============================================================================
//! analytics.rs - filtering, aggregates, safety scores and alerts
//! ==============================================================================
//!
//! purpose:
//!     everything the dashboard shows besides the raw charts is derived here
//!     from the reading buffer and the current `ViewFilter`. all functions are
//!     pure; callers recompute on every request.
//!
//! empty input:
//!     an empty filtered window yields zero average/min/max and 0% safety for
//!     every metric. no aggregate can leave this module as NaN or infinity.
//!
//! relationships:
//!     - used by: web.rs (page, summary api, export), chart.rs callers
//!     - uses: domain.rs (thresholds), view_state.rs (ViewFilter)
//!
//! ==============================================================================

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::domain::{Metric, Reading};
use crate::view_state::ViewFilter;

// ==============================================================================
// filtering
// ==============================================================================

pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// last representable instant of `day`
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    day.and_time(last).and_utc()
}

pub fn matches(reading: &Reading, filter: &ViewFilter) -> bool {
    if !filter.pond.matches(&reading.pond_label) {
        return false;
    }
    if let Some(from) = filter.from {
        if reading.timestamp < start_of_day(from) {
            return false;
        }
    }
    if let Some(to) = filter.to {
        if reading.timestamp > end_of_day(to) {
            return false;
        }
    }
    true
}

/// readings passing the pond and date filters, in buffer order
pub fn filter_readings<'a>(
    readings: impl IntoIterator<Item = &'a Reading>,
    filter: &ViewFilter,
) -> Vec<Reading> {
    readings
        .into_iter()
        .filter(|r| matches(r, filter))
        .cloned()
        .collect()
}

// ==============================================================================
// per-metric container
// ==============================================================================

/// one value per metric, serialized under the metric keys
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PerMetric<T> {
    pub temp: T,
    pub ph: T,
    pub nh3: T,
    pub dox: T,
}

impl<T> PerMetric<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            temp: f(Metric::Temperature),
            ph: f(Metric::Ph),
            nh3: f(Metric::Ammonia),
            dox: f(Metric::DissolvedOxygen),
        }
    }

    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Temperature => &self.temp,
            Metric::Ph => &self.ph,
            Metric::Ammonia => &self.nh3,
            Metric::DissolvedOxygen => &self.dox,
        }
    }
}

// ==============================================================================
// aggregates
// ==============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MetricStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    pub fn over(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            average: sum / count as f64,
            min,
            max,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DerivedStats {
    pub metrics: PerMetric<MetricStats>,
    pub count: usize,
    /// last filtered reading in buffer order
    pub latest: Option<Reading>,
}

pub fn derive_stats(filtered: &[Reading]) -> DerivedStats {
    DerivedStats {
        metrics: PerMetric::from_fn(|m| MetricStats::over(filtered.iter().map(|r| r.value(m)))),
        count: filtered.len(),
        latest: filtered.last().cloned(),
    }
}

/// percent of readings inside the metric's threshold, per metric
pub fn safety_scores(filtered: &[Reading]) -> PerMetric<u8> {
    let total = filtered.len().max(1) as f64;
    PerMetric::from_fn(|m| {
        let threshold = m.threshold();
        let ok = filtered.iter().filter(|r| threshold.contains(r.value(m))).count();
        ((ok as f64 / total) * 100.0).round().clamp(0.0, 100.0) as u8
    })
}

// ==============================================================================
// alerts
// ==============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// value below the safe minimum
    Warning,
    /// value above the safe maximum
    Danger,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub metric: Metric,
    pub severity: Severity,
    pub message: String,
}

/// threshold alerts for the latest reading only, at most one per metric
pub fn latest_alerts(latest: Option<&Reading>) -> Vec<Alert> {
    let Some(latest) = latest else {
        return Vec::new();
    };

    Metric::ALL
        .into_iter()
        .filter_map(|metric| {
            let thr = metric.threshold();
            let v = latest.value(metric);
            if v > thr.max {
                Some(Alert {
                    metric,
                    severity: Severity::Danger,
                    message: format!("{} {} > max {}", thr.label, v, thr.max),
                })
            } else if v < thr.min {
                Some(Alert {
                    metric,
                    severity: Severity::Warning,
                    message: format!("{} {} < min {}", thr.label, v, thr.min),
                })
            } else {
                None
            }
        })
        .collect()
}

// ==============================================================================
// everything at once
// ==============================================================================

#[derive(Clone, Debug, Default, Serialize)]
pub struct Derived {
    pub filtered: Vec<Reading>,
    pub stats: DerivedStats,
    pub safety: PerMetric<u8>,
    pub alerts: Vec<Alert>,
}

pub fn derive_all<'a>(
    readings: impl IntoIterator<Item = &'a Reading>,
    filter: &ViewFilter,
) -> Derived {
    let filtered = filter_readings(readings, filter);
    let stats = derive_stats(&filtered);
    let safety = safety_scores(&filtered);
    let alerts = latest_alerts(stats.latest.as_ref());
    Derived { filtered, stats, safety, alerts }
}
