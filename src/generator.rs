//! ==============================================================================
//! generator.rs - synthetic pond telemetry
//! ==============================================================================
//!
//! purpose:
//!     stands in for real sensors. every metric is a baseline plus a slow
//!     sinusoid plus bounded uniform noise, rounded to two decimals.
//!
//! relationships:
//!     - used by: dashboard.rs (bulk series on load / farm switch)
//!     - used by: live.rs (one reading per tick via `reading_at`)
//!     - uses: noise.rs (random source), domain.rs (farm catalog)
//!
//! ==============================================================================

use chrono::{DateTime, Duration, Utc};

use crate::domain::{ponds_for, Reading};
use crate::noise::NoiseSource;

/// lowest ammonia value a reading can carry (mg/L)
pub const AMMONIA_FLOOR: f64 = 0.06;

const MS_PER_HOUR: f64 = 3.6e6;

/// lookback window and sampling step for a bulk series
#[derive(Clone, Copy, Debug)]
pub struct SeriesWindow {
    pub days: i64,
    pub step_hours: i64,
}

impl Default for SeriesWindow {
    fn default() -> Self {
        Self { days: 7, step_hours: 6 }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// one reading at `at` for `farm_id`, using the shared trend formulas
pub fn reading_at(at: DateTime<Utc>, farm_id: &str, noise: &mut dyn NoiseSource) -> Reading {
    let hours = at.timestamp_millis() as f64 / MS_PER_HOUR;

    let temperature = 23.0 + 3.0 * (hours / 6.0).sin() + (noise.unit() - 0.5) * 1.2;
    let ph = 6.9 + 0.5 * (hours / 10.0).sin() + (noise.unit() - 0.5) * 0.18;
    let ammonia = (0.12 + 0.25 * noise.unit()).max(AMMONIA_FLOOR);
    let dissolved_oxygen = 7.2 + 0.8 * (hours / 8.0).cos() + (noise.unit() - 0.5) * 0.3;

    let ponds = ponds_for(farm_id);
    let pond_label = ponds[noise.pick(ponds.len())].to_string();

    Reading {
        timestamp: at,
        temperature: round2(temperature),
        ph: round2(ph),
        ammonia: round2(ammonia).max(AMMONIA_FLOOR),
        dissolved_oxygen: round2(dissolved_oxygen),
        farm_id: farm_id.to_string(),
        pond_label,
    }
}

/// readings spanning `[now - days, now]`, one per step, oldest first
pub fn generate_series(
    farm_id: &str,
    window: SeriesWindow,
    now: DateTime<Utc>,
    noise: &mut dyn NoiseSource,
) -> Vec<Reading> {
    let step = Duration::hours(window.step_hours.max(1));
    let start = now - Duration::days(window.days.max(0));

    let mut out = Vec::new();
    let mut at = start;
    while at <= now {
        out.push(reading_at(at, farm_id, noise));
        at += step;
    }

    tracing::debug!(farm = farm_id, points = out.len(), "generated synthetic series");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{RandomNoise, ScriptedNoise};

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn seven_days_every_six_hours_is_29_points() {
        let mut noise = RandomNoise::from_entropy();
        let series = generate_series("farm-a", SeriesWindow::default(), fixed_now(), &mut noise);
        assert_eq!(series.len(), 29);
        assert_eq!(series.first().unwrap().timestamp, fixed_now() - Duration::days(7));
        assert_eq!(series.last().unwrap().timestamp, fixed_now());
    }

    #[test]
    fn ammonia_never_drops_to_floor_or_below_zero() {
        let mut noise = RandomNoise::from_entropy();
        for _ in 0..20 {
            for r in generate_series("farm-b", SeriesWindow::default(), Utc::now(), &mut noise) {
                assert!(r.ammonia > 0.0);
                assert!(r.ammonia >= AMMONIA_FLOOR);
            }
        }
        // lowest possible noise sample
        let mut zero = ScriptedNoise::constant(0.0);
        let r = reading_at(fixed_now(), "farm-a", &mut zero);
        assert!(r.ammonia >= AMMONIA_FLOOR);
    }

    #[test]
    fn values_are_rounded_to_two_decimals() {
        let mut noise = RandomNoise::from_entropy();
        for r in generate_series("farm-c", SeriesWindow::default(), fixed_now(), &mut noise) {
            for v in [r.temperature, r.ph, r.ammonia, r.dissolved_oxygen] {
                assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-6, "{v}");
            }
        }
    }

    #[test]
    fn ponds_come_from_the_farm_catalog() {
        let mut noise = RandomNoise::from_entropy();
        for r in generate_series("farm-b", SeriesWindow::default(), fixed_now(), &mut noise) {
            assert!(["Pond B1", "Pond B2", "Pond B3"].contains(&r.pond_label.as_str()));
            assert_eq!(r.farm_id, "farm-b");
        }
    }

    #[test]
    fn unknown_farm_falls_back_to_single_pond() {
        let mut noise = ScriptedNoise::constant(0.3);
        let series = generate_series("farm-x", SeriesWindow { days: 1, step_hours: 6 }, fixed_now(), &mut noise);
        assert!(!series.is_empty());
        assert!(series.iter().all(|r| r.pond_label == "Pond"));
    }

    #[test]
    fn midpoint_noise_yields_pure_trend() {
        let mut noise = ScriptedNoise::constant(0.5);
        let at = DateTime::<Utc>::from_timestamp_millis(0).unwrap();
        let r = reading_at(at, "farm-a", &mut noise);
        assert_eq!(r.temperature, 23.0);
        assert_eq!(r.ph, 6.9);
        assert_eq!(r.dissolved_oxygen, 8.0);

        let mut low = ScriptedNoise::constant(0.0);
        assert_eq!(reading_at(at, "farm-a", &mut low).ammonia, 0.12);
    }
}
