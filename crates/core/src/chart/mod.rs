//! The single stock chart: candles, indicator overlays and the indicator cache.
//!
//! Only [`ChartController`] touches the surface. Every new load tears the previous chart and
//! its overlay series down first, so at most one chart exists at any time.

pub mod overlay;
pub mod surface;

use crate::api::DashboardApi;
use crate::domain::chart::{
    Candle, ChartData, ChartPeriod, IndicatorKind, IndicatorSnapshot, RealtimeQuote,
};
use crate::render::{render_into, sections, RenderTarget, Section, SectionView};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use surface::{ChartId, ChartSurface, SeriesId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSelection {
    pub ticker: String,
    pub period: ChartPeriod,
    /// Carried across ticker switches.
    pub active: BTreeSet<IndicatorKind>,
}

/// Network work a controller change is waiting on. Run it with [`ChartFetch::run`] and hand
/// the outcome to [`ChartController::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartFetch {
    Candles { ticker: String, period: ChartPeriod },
    Indicators { ticker: String },
}

pub enum ChartFetched {
    Candles {
        ticker: String,
        period: ChartPeriod,
        result: Result<ChartData>,
    },
    Indicators {
        ticker: String,
        result: Result<IndicatorSnapshot>,
    },
}

impl ChartFetch {
    pub async fn run(self, api: &DashboardApi) -> ChartFetched {
        match self {
            ChartFetch::Candles { ticker, period } => {
                let result = api.stock_chart(&ticker, period).await;
                ChartFetched::Candles {
                    ticker,
                    period,
                    result,
                }
            }
            ChartFetch::Indicators { ticker } => {
                let result = api.technical_indicators(&ticker).await;
                ChartFetched::Indicators { ticker, result }
            }
        }
    }
}

pub struct ChartController {
    surface: Box<dyn ChartSurface>,
    chart: Option<ChartId>,
    selection: Option<ChartSelection>,
    series: BTreeMap<IndicatorKind, Vec<SeriesId>>,
    /// Never invalidated for the life of the process.
    cache: HashMap<String, IndicatorSnapshot>,
    /// Tickers with an indicator fetch in flight.
    pending: BTreeSet<String>,
    candles: Vec<Candle>,
}

impl ChartController {
    pub fn new(surface: Box<dyn ChartSurface>) -> Self {
        Self {
            surface,
            chart: None,
            selection: None,
            series: BTreeMap::new(),
            cache: HashMap::new(),
            pending: BTreeSet::new(),
            candles: Vec::new(),
        }
    }

    pub fn selection(&self) -> Option<&ChartSelection> {
        self.selection.as_ref()
    }

    pub fn active_ticker(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.ticker.as_str())
    }

    pub fn has_chart(&self) -> bool {
        self.chart.is_some()
    }

    pub fn is_cached(&self, ticker: &str) -> bool {
        self.cache.contains_key(ticker)
    }

    /// Overlay series currently tracked for the live chart.
    pub fn series_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Tears down whatever chart is shown and selects `ticker` at `period`. The chart is
    /// built when the returned candle fetch completes.
    pub fn load_chart(
        &mut self,
        target: &mut dyn RenderTarget,
        ticker: &str,
        period: ChartPeriod,
    ) -> ChartFetch {
        self.remove_chart();
        let active = self
            .selection
            .take()
            .map(|s| s.active)
            .unwrap_or_default();
        self.selection = Some(ChartSelection {
            ticker: ticker.to_string(),
            period,
            active,
        });
        self.publish(target);
        ChartFetch::Candles {
            ticker: ticker.to_string(),
            period,
        }
    }

    /// Reloads the active ticker at a new period.
    pub fn change_period(
        &mut self,
        target: &mut dyn RenderTarget,
        period: ChartPeriod,
    ) -> Option<ChartFetch> {
        let Some(ticker) = self.active_ticker().map(str::to_string) else {
            tracing::warn!(%period, "period change without a selected stock");
            return None;
        };
        Some(self.load_chart(target, &ticker, period))
    }

    /// Flips `kind`. Turning an indicator on for a ticker without cached data returns the
    /// fetch that will draw it; if that fetch fails the indicator turns back off.
    pub fn toggle_indicator(
        &mut self,
        target: &mut dyn RenderTarget,
        kind: IndicatorKind,
    ) -> Option<ChartFetch> {
        let (Some(_), Some(selection)) = (self.chart, self.selection.as_mut()) else {
            tracing::warn!(%kind, "indicator toggle without an active chart");
            return None;
        };

        if selection.active.remove(&kind) {
            self.remove_indicator(kind);
            self.publish(target);
            return None;
        }
        selection.active.insert(kind);
        let ticker = selection.ticker.clone();

        if self.cache.contains_key(&ticker) {
            self.draw_indicator(&ticker, kind);
            self.publish(target);
            return None;
        }
        self.request_indicators(ticker)
    }

    /// Applies a finished fetch. Results for a ticker or period that is no longer selected
    /// only warm the cache. Returns follow-up fetches.
    pub fn complete(
        &mut self,
        target: &mut dyn RenderTarget,
        fetched: ChartFetched,
    ) -> Vec<ChartFetch> {
        match fetched {
            ChartFetched::Candles {
                ticker,
                period,
                result,
            } => self.finish_candles(target, &ticker, period, result),
            ChartFetched::Indicators { ticker, result } => {
                self.finish_indicators(target, ticker, result);
                Vec::new()
            }
        }
    }

    /// Amends the newest candle with a live price for the active ticker.
    pub fn apply_quote(&mut self, target: &mut dyn RenderTarget, quote: &RealtimeQuote) -> bool {
        let (Some(chart), Some(ticker)) = (self.chart, self.active_ticker()) else {
            return false;
        };
        if !quote.ticker.eq_ignore_ascii_case(ticker) {
            return false;
        }
        let Some(price) = quote.price.filter(|p| p.is_finite()) else {
            return false;
        };
        let Some(last) = self.candles.last_mut() else {
            return false;
        };
        if last.close == price {
            return false;
        }

        last.high = last.high.max(price);
        last.low = last.low.min(price);
        last.close = price;
        let amended = last.clone();
        self.surface.update_last_candle(chart, &amended);
        self.publish(target);
        true
    }

    /// Drops the chart, the selection and any fetch bookkeeping. The indicator cache survives.
    pub fn release(&mut self) {
        self.remove_chart();
        self.selection = None;
        self.pending.clear();
    }

    fn is_selected(&self, ticker: &str, period: ChartPeriod) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| s.ticker == ticker && s.period == period)
    }

    fn finish_candles(
        &mut self,
        target: &mut dyn RenderTarget,
        ticker: &str,
        period: ChartPeriod,
        result: Result<ChartData>,
    ) -> Vec<ChartFetch> {
        if !self.is_selected(ticker, period) {
            tracing::debug!(ticker, %period, "dropping chart data for a stale selection");
            return Vec::new();
        }
        self.remove_chart();

        let data = match result {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(ticker, %period, error = %err, "failed to load chart data");
                self.show_error(target, &format!("Failed to load chart for {ticker}"));
                return Vec::new();
            }
        };
        if let Some(message) = data.error {
            tracing::warn!(ticker, %period, error = %message, "chart endpoint returned an error");
            self.show_error(target, &message);
            return Vec::new();
        }
        if data.candles.is_empty() {
            tracing::info!(ticker, %period, "no candles for ticker");
            self.show_error(target, &format!("No chart data for {ticker}"));
            return Vec::new();
        }

        let chart = self.surface.create_chart(Section::StockChart.container());
        self.surface.set_candles(chart, &data.candles);
        self.surface.fit_content(chart);
        self.chart = Some(chart);
        self.candles = data.candles;
        tracing::debug!(ticker, %period, candles = self.candles.len(), "chart loaded");

        let follow_up = if self.cache.contains_key(ticker) {
            self.draw_active(ticker);
            None
        } else if self.selection.as_ref().is_some_and(|s| !s.active.is_empty()) {
            self.request_indicators(ticker.to_string())
        } else {
            None
        };
        self.publish(target);
        follow_up.into_iter().collect()
    }

    fn finish_indicators(
        &mut self,
        target: &mut dyn RenderTarget,
        ticker: String,
        result: Result<IndicatorSnapshot>,
    ) {
        self.pending.remove(&ticker);
        let current = self.active_ticker() == Some(ticker.as_str());

        match result {
            Ok(snapshot) => {
                self.cache.insert(ticker.clone(), snapshot);
            }
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "failed to load indicator data");
                if current && !self.cache.contains_key(&ticker) {
                    // Nothing for this ticker is drawn; what was switched on goes back off.
                    if let Some(selection) = self.selection.as_mut() {
                        selection.active.clear();
                    }
                }
            }
        }

        if current {
            self.draw_active(&ticker);
            self.publish(target);
        }
    }

    fn request_indicators(&mut self, ticker: String) -> Option<ChartFetch> {
        if !self.pending.insert(ticker.clone()) {
            return None;
        }
        Some(ChartFetch::Indicators { ticker })
    }

    fn draw_active(&mut self, ticker: &str) {
        let active: Vec<_> = self
            .selection
            .as_ref()
            .map(|s| s.active.iter().copied().collect())
            .unwrap_or_default();
        for kind in active {
            self.draw_indicator(ticker, kind);
        }
    }

    fn draw_indicator(&mut self, ticker: &str, kind: IndicatorKind) {
        self.remove_indicator(kind);
        let (Some(chart), Some(snapshot)) = (self.chart, self.cache.get(ticker)) else {
            return;
        };
        if !kind.draws_on_chart() {
            return;
        }

        let Some(range) = self.surface.visible_range(chart).or_else(|| {
            let first = self.candles.first()?;
            let last = self.candles.last()?;
            Some((first.time.clone(), last.time.clone()))
        }) else {
            return;
        };

        let ids = overlay::lines_for(kind, snapshot, &range)
            .into_iter()
            .map(|line| self.surface.add_line(chart, line))
            .collect();
        self.series.insert(kind, ids);
    }

    fn remove_indicator(&mut self, kind: IndicatorKind) {
        let Some(ids) = self.series.remove(&kind) else {
            return;
        };
        if let Some(chart) = self.chart {
            for id in ids {
                self.surface.remove_series(chart, id);
            }
        }
    }

    fn remove_chart(&mut self) {
        let kinds: Vec<_> = self.series.keys().copied().collect();
        for kind in kinds {
            self.remove_indicator(kind);
        }
        if let Some(chart) = self.chart.take() {
            self.surface.remove_chart(chart);
        }
        self.candles.clear();
    }

    fn show_error(&mut self, target: &mut dyn RenderTarget, message: &str) {
        self.surface
            .show_error(Section::StockChart.container(), message);
        self.publish(target);
    }

    fn publish(&self, target: &mut dyn RenderTarget) {
        render_into(target, Section::StockChart, &SectionView::Chart(self.surface.scene()));

        let active = self
            .selection
            .as_ref()
            .map(|s| s.active.clone())
            .unwrap_or_default();
        let snapshot = self
            .active_ticker()
            .and_then(|ticker| self.cache.get(ticker));
        render_into(
            target,
            Section::IndicatorReadout,
            &sections::indicator_readout(active, snapshot),
        );
    }
}
