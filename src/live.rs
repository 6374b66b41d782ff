//! ==============================================================================
//! live.rs - live append loop
//! ==============================================================================
//!
//! purpose:
//!     while auto-refresh is on, appends one synthetic reading to the active
//!     view's buffer every interval, simulating a live feed.
//!
//! lifecycle:
//!     `LiveFeed::start` spawns the interval task and returns the only handle
//!     to it. `stop()` or dropping the handle cancels the task; once either
//!     returns no further append can land in the buffer.
//!
//! relationships:
//!     - used by: dashboard.rs (starts/stops the feed as the filter changes)
//!     - uses: generator.rs (trend formulas), buffer.rs (bounded append)
//!
//! ==============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dashboard::ViewData;
use crate::domain::Reading;
use crate::generator::reading_at;
use crate::noise::NoiseSource;

#[derive(Clone, Copy, Debug)]
pub struct LiveSettings {
    /// wall time between appends
    pub interval: std::time::Duration,
    /// timestamp distance between consecutive live readings
    pub step: chrono::Duration,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(10),
            step: chrono::Duration::hours(6),
        }
    }
}

/// the reading one tick produces: one step after the last buffered reading,
/// or one step after `now` when the buffer is empty
pub fn next_live_reading(
    last: Option<&Reading>,
    farm_id: &str,
    step: chrono::Duration,
    now: DateTime<Utc>,
    noise: &mut dyn NoiseSource,
) -> Reading {
    let base = last.map(|r| r.timestamp).unwrap_or(now);
    reading_at(base + step, farm_id, noise)
}

/// compute and append one tick's reading, returning a copy of it
pub fn append_tick(
    view: &mut ViewData,
    step: chrono::Duration,
    now: DateTime<Utc>,
    noise: &mut dyn NoiseSource,
) -> Reading {
    let reading = next_live_reading(view.buffer.last(), &view.farm_id, step, now, noise);
    view.buffer.push(reading.clone());
    reading
}

// ==============================================================================
// feed handle
// ==============================================================================

pub struct LiveFeed {
    handle: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl LiveFeed {
    pub fn start(
        view: Arc<RwLock<ViewData>>,
        settings: LiveSettings,
        mut noise: Box<dyn NoiseSource>,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick is immediate; the feed waits a full interval first
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let mut guard = view.write().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                let reading = append_tick(&mut guard, settings.step, Utc::now(), noise.as_mut());
                tracing::debug!(
                    farm = %reading.farm_id,
                    pond = %reading.pond_label,
                    ts = %reading.timestamp,
                    buffered = guard.buffer.len(),
                    "live reading appended"
                );
            }
        });

        tracing::info!(interval_s = settings.interval.as_secs(), "live feed started");
        Self { handle, cancelled }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// cancel the scheduled task
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
        tracing::info!("live feed stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ReadingBuffer;
    use crate::noise::{RandomNoise, ScriptedNoise};
    use std::time::Duration;

    fn empty_view(farm: &str) -> Arc<RwLock<ViewData>> {
        Arc::new(RwLock::new(ViewData {
            farm_id: farm.to_string(),
            buffer: ReadingBuffer::default(),
        }))
    }

    fn assert_spaced(readings: &[Reading], step: chrono::Duration) {
        for w in readings.windows(2) {
            assert!(w[1].timestamp > w[0].timestamp);
            assert_eq!(w[1].timestamp - w[0].timestamp, step);
        }
    }

    #[test]
    fn empty_buffer_starts_one_step_after_now() {
        let now = Utc::now();
        let step = chrono::Duration::hours(6);
        let mut noise = ScriptedNoise::constant(0.5);
        let r = next_live_reading(None, "farm-a", step, now, &mut noise);
        assert_eq!(r.timestamp, now + step);
    }

    #[test]
    fn three_manual_ticks_are_one_step_apart() {
        let mut view = ViewData {
            farm_id: "farm-c".into(),
            buffer: ReadingBuffer::default(),
        };
        let step = chrono::Duration::hours(6);
        let mut noise = RandomNoise::from_entropy();
        for _ in 0..3 {
            append_tick(&mut view, step, Utc::now(), &mut noise);
        }
        let readings = view.buffer.to_vec();
        assert_eq!(readings.len(), 3);
        assert_spaced(&readings, step);
        assert!(readings.iter().all(|r| r.pond_label == "Pond C1"));
    }

    #[test]
    fn ticks_respect_buffer_cap() {
        let mut view = ViewData {
            farm_id: "farm-a".into(),
            buffer: ReadingBuffer::new(5),
        };
        let mut noise = ScriptedNoise::constant(0.4);
        for _ in 0..12 {
            append_tick(&mut view, chrono::Duration::hours(6), Utc::now(), &mut noise);
        }
        assert_eq!(view.buffer.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn feed_appends_every_interval() {
        let view = empty_view("farm-a");
        let settings = LiveSettings::default();
        let feed = LiveFeed::start(view.clone(), settings, Box::new(RandomNoise::from_entropy()));

        tokio::time::sleep(Duration::from_secs(35)).await;

        let readings = view.read().await.buffer.to_vec();
        assert_eq!(readings.len(), 3);
        assert_spaced(&readings, settings.step);
        assert!(feed.is_running());
        feed.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_feed_appends_nothing() {
        let view = empty_view("farm-b");
        let feed = LiveFeed::start(view.clone(), LiveSettings::default(), Box::new(RandomNoise::from_entropy()));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(view.read().await.buffer.len(), 1);

        feed.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(view.read().await.buffer.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels_the_task() {
        let view = empty_view("farm-a");
        {
            let _feed = LiveFeed::start(view.clone(), LiveSettings::default(), Box::new(ScriptedNoise::constant(0.5)));
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(view.read().await.buffer.is_empty());
    }
}
