//! The drawing surface a chart lives on.
//!
//! [`ChartSurface`] is what the controller drives; [`SceneSurface`] keeps the whole scene in
//! memory so it can be serialized for a front end or inspected from tests.

use crate::domain::chart::Candle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChartId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SeriesId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    BandUpper,
    BandMiddle,
    BandLower,
    Support,
    Resistance,
}

/// A horizontal line drawn between two candle times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLine {
    pub label: String,
    pub price: f64,
    pub from: String,
    pub to: String,
    pub role: LineRole,
}

pub trait ChartSurface: Send {
    fn create_chart(&mut self, container: &str) -> ChartId;

    fn remove_chart(&mut self, chart: ChartId);

    fn set_candles(&mut self, chart: ChartId, candles: &[Candle]);

    /// Replaces the newest candle, keeping its position.
    fn update_last_candle(&mut self, chart: ChartId, candle: &Candle);

    fn fit_content(&mut self, chart: ChartId);

    /// First and last visible candle times.
    fn visible_range(&self, chart: ChartId) -> Option<(String, String)>;

    fn add_line(&mut self, chart: ChartId, line: OverlayLine) -> SeriesId;

    fn remove_series(&mut self, chart: ChartId, series: SeriesId);

    /// Replaces the chart area with a message; no chart is created.
    fn show_error(&mut self, container: &str, message: &str);

    fn scene(&self) -> ChartScene;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub id: ChartId,
    pub container: String,
    pub candles: Vec<Candle>,
    pub visible_range: Option<(String, String)>,
    pub lines: Vec<OverlayLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartScene {
    pub charts: Vec<ChartSnapshot>,
    pub error: Option<String>,
}

impl ChartScene {
    pub fn series_count(&self) -> usize {
        self.charts.iter().map(|c| c.lines.len()).sum()
    }
}

#[derive(Debug)]
struct ChartState {
    container: String,
    candles: Vec<Candle>,
    visible_range: Option<(String, String)>,
    series: BTreeMap<SeriesId, OverlayLine>,
}

#[derive(Debug, Default)]
struct SceneState {
    next_id: u64,
    charts: BTreeMap<ChartId, ChartState>,
    errors: BTreeMap<String, String>,
    created: usize,
}

impl SceneState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory surface. Clones share the same scene.
#[derive(Debug, Clone, Default)]
pub struct SceneSurface {
    state: Arc<Mutex<SceneState>>,
}

impl SceneSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charts created over the surface's lifetime, removed ones included.
    pub fn charts_created(&self) -> usize {
        self.lock().created
    }

    pub fn live_charts(&self) -> usize {
        self.lock().charts.len()
    }

    fn lock(&self) -> MutexGuard<'_, SceneState> {
        // A poisoned scene is still a valid scene; keep drawing.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ChartSurface for SceneSurface {
    fn create_chart(&mut self, container: &str) -> ChartId {
        let mut state = self.lock();
        let id = ChartId(state.next());
        state.errors.remove(container);
        state.created += 1;
        state.charts.insert(
            id,
            ChartState {
                container: container.to_string(),
                candles: Vec::new(),
                visible_range: None,
                series: BTreeMap::new(),
            },
        );
        id
    }

    fn remove_chart(&mut self, chart: ChartId) {
        if self.lock().charts.remove(&chart).is_none() {
            tracing::debug!(?chart, "remove_chart on unknown chart");
        }
    }

    fn set_candles(&mut self, chart: ChartId, candles: &[Candle]) {
        if let Some(c) = self.lock().charts.get_mut(&chart) {
            c.candles = candles.to_vec();
        }
    }

    fn update_last_candle(&mut self, chart: ChartId, candle: &Candle) {
        if let Some(last) = self
            .lock()
            .charts
            .get_mut(&chart)
            .and_then(|c| c.candles.last_mut())
        {
            *last = candle.clone();
        }
    }

    fn fit_content(&mut self, chart: ChartId) {
        if let Some(c) = self.lock().charts.get_mut(&chart) {
            c.visible_range = match (c.candles.first(), c.candles.last()) {
                (Some(first), Some(last)) => Some((first.time.clone(), last.time.clone())),
                _ => None,
            };
        }
    }

    fn visible_range(&self, chart: ChartId) -> Option<(String, String)> {
        self.lock()
            .charts
            .get(&chart)
            .and_then(|c| c.visible_range.clone())
    }

    fn add_line(&mut self, chart: ChartId, line: OverlayLine) -> SeriesId {
        let mut state = self.lock();
        let id = SeriesId(state.next());
        if let Some(c) = state.charts.get_mut(&chart) {
            c.series.insert(id, line);
        }
        id
    }

    fn remove_series(&mut self, chart: ChartId, series: SeriesId) {
        if let Some(c) = self.lock().charts.get_mut(&chart) {
            c.series.remove(&series);
        }
    }

    fn show_error(&mut self, container: &str, message: &str) {
        self.lock()
            .errors
            .insert(container.to_string(), message.to_string());
    }

    fn scene(&self) -> ChartScene {
        let state = self.lock();
        ChartScene {
            charts: state
                .charts
                .iter()
                .map(|(id, c)| ChartSnapshot {
                    id: *id,
                    container: c.container.clone(),
                    candles: c.candles.clone(),
                    visible_range: c.visible_range.clone(),
                    lines: c.series.values().cloned().collect(),
                })
                .collect(),
            error: state.errors.values().next().cloned(),
        }
    }
}
