//! ==============================================================================
//! dashboard.rs - one dashboard view and its live feed
//! ==============================================================================
//!
//! purpose:
//!     owns everything behind a single dashboard view: the current filter,
//!     the reading buffer of the selected farm and, while auto-refresh is on,
//!     the live feed appending to that buffer.
//!
//! state flow:
//!
//! ```text
//!     ViewFilter (url) ──> sync() ──┬─ farm changed  -> stop feed, regenerate buffer
//!                                   ├─ auto on       -> start feed
//!                                   └─ auto off      -> stop feed
//!
//!     snapshot() ──> filter + buffer copy ──> analytics / chart / page
//! ```
//!
//! relationships:
//!     - used by: web.rs (one shared dashboard behind a RwLock)
//!     - uses: generator.rs, buffer.rs, live.rs, view_state.rs
//!
//! ==============================================================================

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::analytics::{derive_all, Derived};
use crate::buffer::{ReadingBuffer, DEFAULT_CAPACITY};
use crate::domain::Reading;
use crate::generator::{generate_series, SeriesWindow};
use crate::live::{LiveFeed, LiveSettings};
use crate::noise::{NoiseSource, RandomNoise};
use crate::view_state::{ViewFilter, ViewStore};

/// the farm a view shows and its buffered readings.
/// shared between the dashboard and its live task
#[derive(Clone, Debug)]
pub struct ViewData {
    pub farm_id: String,
    pub buffer: ReadingBuffer,
}

#[derive(Clone, Copy, Debug)]
pub struct DashboardSettings {
    pub window: SeriesWindow,
    pub capacity: usize,
    pub live: LiveSettings,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            window: SeriesWindow::default(),
            capacity: DEFAULT_CAPACITY,
            live: LiveSettings::default(),
        }
    }
}

/// builds a fresh noise source for each generated series and live feed
pub type NoiseFactory = Arc<dyn Fn() -> Box<dyn NoiseSource> + Send + Sync>;

/// copy of a view taken for one render
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub filter: ViewFilter,
    pub farm_id: String,
    pub readings: Vec<Reading>,
    pub live: bool,
}

impl Snapshot {
    pub fn derived(&self) -> Derived {
        derive_all(&self.readings, &self.filter)
    }
}

pub struct Dashboard {
    view: Arc<RwLock<ViewData>>,
    store: ViewStore,
    live: Option<LiveFeed>,
    settings: DashboardSettings,
    noise: NoiseFactory,
}

impl Dashboard {
    pub fn new(settings: DashboardSettings) -> Self {
        Self::with_noise(settings, Arc::new(|| Box::new(RandomNoise::from_entropy()) as Box<dyn NoiseSource>))
    }

    /// dashboard showing the default filter, buffer already generated
    pub fn with_noise(settings: DashboardSettings, noise: NoiseFactory) -> Self {
        let store = ViewStore::default();
        let farm_id = store.current().farm.clone();
        let buffer = Self::fresh_buffer(&farm_id, &settings, &noise);
        Self {
            view: Arc::new(RwLock::new(ViewData { farm_id, buffer })),
            store,
            live: None,
            settings,
            noise,
        }
    }

    fn fresh_buffer(farm_id: &str, settings: &DashboardSettings, noise: &NoiseFactory) -> ReadingBuffer {
        let mut source = noise();
        let series = generate_series(farm_id, settings.window, Utc::now(), source.as_mut());
        ReadingBuffer::from_readings(settings.capacity, series)
    }

    pub fn is_live(&self) -> bool {
        self.live.as_ref().is_some_and(LiveFeed::is_running)
    }

    /// apply a filter from the url and bring buffer and feed in line with it.
    /// returns the normalized filter now in effect
    pub async fn sync(&mut self, filter: ViewFilter) -> ViewFilter {
        let change = self.store.apply(filter);
        let current = self.store.current().clone();

        if change.farm_changed {
            self.stop_feed().await;
            let buffer = Self::fresh_buffer(&current.farm, &self.settings, &self.noise);
            let mut view = self.view.write().await;
            view.farm_id = current.farm.clone();
            view.buffer = buffer;
            tracing::info!(farm = %current.farm, readings = view.buffer.len(), "farm switched, buffer regenerated");
        }

        if change.auto_changed {
            tracing::info!(farm = %current.farm, auto = current.auto, "auto-refresh toggled");
        }

        if current.auto && self.live.is_none() {
            let feed = LiveFeed::start(self.view.clone(), self.settings.live, (self.noise)());
            self.live = Some(feed);
        } else if !current.auto {
            self.stop_feed().await;
        }

        current
    }

    /// cancel the feed while holding the view lock, so an in-flight tick
    /// either finished before this call or never appends
    async fn stop_feed(&mut self) {
        if let Some(feed) = self.live.take() {
            let _view = self.view.write().await;
            feed.stop();
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        let view = self.view.read().await;
        Snapshot {
            filter: self.store.current().clone(),
            farm_id: view.farm_id.clone(),
            readings: view.buffer.to_vec(),
            live: self.is_live(),
        }
    }

    pub async fn shutdown(&mut self) {
        self.stop_feed().await;
    }
}
