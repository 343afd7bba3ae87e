//! The dashboard orchestrator.
//!
//! [`Dashboard`] owns every piece of runtime state: the API client, the render target, the
//! renderer registry, the chart controller, preferences, notifications and timers. All state
//! changes happen on the task that drives [`Dashboard::run`]. Fetches run as tasks of their
//! own and hand their payloads back to that loop, so timers, UI events and notification
//! expiry keep being served while a request is pending.

pub mod event;
pub mod notify;
pub mod timers;

use crate::api::DashboardApi;
use crate::chart::surface::ChartSurface;
use crate::chart::{ChartController, ChartFetch, ChartFetched};
use crate::domain::chart::{AiSummary, RealtimeQuote};
use crate::domain::market::{self, StockPick};
use crate::domain::preferences::{Language, Preferences};
use crate::render::{render_into, sections, RenderTarget, RendererRegistry, Section, SectionView};
use crate::storage::PreferenceStore;
use anyhow::Result;
use chrono::NaiveDate;
use event::{Tab, UiEvent};
use notify::{Level, Notifications};
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use timers::{Tick, Timers};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load dashboard data. Please try again later.";

/// What one `load_dashboard` pass got back. Sections that failed are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardLoad {
    pub indices: Option<Value>,
    pub picks: Option<Value>,
    pub etf_flows: Option<Value>,
    pub history_dates: Option<Value>,
}

impl DashboardLoad {
    pub fn succeeded(&self) -> usize {
        [
            &self.indices,
            &self.picks,
            &self.etf_flows,
            &self.history_dates,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded() == 0
    }
}

/// A request the dashboard is about to have in flight.
enum Fetch {
    Dashboard,
    Macro(Preferences),
    Prices(Vec<String>),
    Summary { ticker: String, language: Language },
    History(Option<NaiveDate>),
    Tab(Tab),
    Chart(ChartFetch),
}

/// A finished request, applied back on the loop's task.
enum Fetched {
    Dashboard(DashboardLoad),
    Macro {
        prefs: Preferences,
        result: Result<Value>,
    },
    Prices(Result<Vec<RealtimeQuote>>),
    Summary {
        ticker: String,
        language: Language,
        result: Result<AiSummary>,
    },
    History {
        date: Option<NaiveDate>,
        result: Result<Value>,
    },
    Tab {
        tab: Tab,
        result: Result<Value>,
    },
    Chart(ChartFetched),
}

impl Fetch {
    async fn run(self, api: DashboardApi) -> Fetched {
        match self {
            Fetch::Dashboard => Fetched::Dashboard(fetch_dashboard(&api).await),
            Fetch::Macro(prefs) => Fetched::Macro {
                prefs,
                result: api.macro_analysis(prefs.language, prefs.ai_model).await,
            },
            Fetch::Prices(tickers) => Fetched::Prices(api.realtime_prices(&tickers).await),
            Fetch::Summary { ticker, language } => {
                let result = api.ai_summary(&ticker, language).await;
                Fetched::Summary {
                    ticker,
                    language,
                    result,
                }
            }
            Fetch::History(date) => {
                let result = match date {
                    Some(date) => api.history(date).await,
                    None => api.smart_money().await,
                };
                Fetched::History { date, result }
            }
            Fetch::Tab(tab) => {
                let result = match tab {
                    Tab::Sectors => api.sector_heatmap().await,
                    Tab::Options => api.options_flow().await,
                    Tab::Risk => api.portfolio_risk().await,
                    Tab::Calendar => api.calendar().await,
                };
                Fetched::Tab { tab, result }
            }
            Fetch::Chart(fetch) => Fetched::Chart(fetch.run(&api).await),
        }
    }
}

enum Wake {
    Shutdown,
    Tick(Tick),
    Event(UiEvent),
    Done(std::result::Result<Fetched, JoinError>),
    Expire,
}

pub struct Dashboard {
    api: DashboardApi,
    target: Box<dyn RenderTarget>,
    registry: RendererRegistry,
    chart: ChartController,
    store: PreferenceStore,
    prefs: Preferences,
    notifications: Notifications,
    timers: Option<Timers>,
    events_tx: Option<mpsc::UnboundedSender<UiEvent>>,
    events_rx: Option<mpsc::UnboundedReceiver<UiEvent>>,
    inflight: JoinSet<Fetched>,
    prices_pending: bool,
    /// Preferences of the newest macro request still out.
    macro_pending: Option<Preferences>,
    tabs_pending: BTreeSet<Tab>,
    /// Picks currently in the table, latest or historical.
    picks: Vec<StockPick>,
    history_date: Option<NaiveDate>,
    /// Most recent history selection; older answers are dropped.
    history_request: Option<NaiveDate>,
    loaded_tabs: BTreeSet<Tab>,
    active_tab: Option<Tab>,
    initialized: bool,
}

impl Dashboard {
    pub fn new(
        api: DashboardApi,
        target: Box<dyn RenderTarget>,
        surface: Box<dyn ChartSurface>,
        store: PreferenceStore,
    ) -> Self {
        Self {
            api,
            target,
            registry: RendererRegistry::with_defaults(),
            chart: ChartController::new(surface),
            store,
            prefs: Preferences::default(),
            notifications: Notifications::default(),
            timers: None,
            events_tx: None,
            events_rx: None,
            inflight: JoinSet::new(),
            prices_pending: false,
            macro_pending: None,
            tabs_pending: BTreeSet::new(),
            picks: Vec::new(),
            history_date: None,
            history_request: None,
            loaded_tabs: BTreeSet::new(),
            active_tab: None,
            initialized: false,
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    pub fn picks(&self) -> &[StockPick] {
        &self.picks
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn chart(&self) -> &ChartController {
        &self.chart
    }

    pub fn timers_armed(&self) -> bool {
        self.timers.is_some()
    }

    /// Requests currently in flight.
    pub fn pending_fetches(&self) -> usize {
        self.inflight.len()
    }

    /// Date of the historical picks on screen; `None` while showing the latest.
    pub fn history_date(&self) -> Option<NaiveDate> {
        self.history_date
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Loads preferences, renders the first screen and arms the timers. The macro section is
    /// requested in the background. Safe to call again; every call hands out a sender for the
    /// same event channel.
    pub async fn initialize(&mut self) -> mpsc::UnboundedSender<UiEvent> {
        self.prefs = match self.store.load() {
            Ok(prefs) => prefs,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "failed to load preferences; using defaults");
                Preferences::default()
            }
        };
        self.render_preferences();

        let tx = match &self.events_tx {
            Some(tx) => tx.clone(),
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.events_tx = Some(tx.clone());
                self.events_rx = Some(rx);
                tx
            }
        };

        let load = self.load_dashboard().await;
        tracing::info!(sections = load.succeeded(), "dashboard loaded");
        let macro_fetch = self.macro_fetch();
        self.spawn_all(macro_fetch);
        self.update_clock();
        self.arm_timers();
        self.initialized = true;
        tx
    }

    /// Fetches the four core sections concurrently. Each failure only affects its own section;
    /// when all four fail the user gets one error notification.
    pub async fn load_dashboard(&mut self) -> DashboardLoad {
        let load = fetch_dashboard(&self.api).await;
        self.apply_load(&load);
        load
    }

    /// Fetches and renders the macro section, then waits out anything else in flight.
    pub async fn refresh_macro_section(&mut self) {
        let fetch = self.macro_fetch();
        self.await_fetches(fetch).await;
    }

    /// Pulls live prices for the displayed picks and the charted ticker.
    pub async fn refresh_prices(&mut self) {
        let fetch = self.price_fetch();
        self.await_fetches(fetch).await;
    }

    pub fn update_clock(&mut self) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        render_into(
            self.target.as_mut(),
            Section::LastUpdated,
            &SectionView::LastUpdated { time },
        );
    }

    /// Applies `event` and waits for the requests it starts.
    pub async fn handle_event(&mut self, event: UiEvent) {
        let fetches = self.dispatch(event);
        self.await_fetches(fetches).await;
    }

    /// Waits for every request in flight and applies the results, follow-ups included.
    pub async fn finish_fetches(&mut self) {
        while let Some(joined) = self.inflight.join_next().await {
            self.on_joined(joined);
        }
    }

    /// Drives timers, UI events and fetch completions until `shutdown` resolves, then tears
    /// down.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if !self.initialized {
            self.initialize().await;
        }
        tokio::pin!(shutdown);

        loop {
            let expiry = self.notifications.next_expiry();
            let wake = tokio::select! {
                _ = &mut shutdown => Wake::Shutdown,
                tick = next_tick(self.timers.as_mut()) => Wake::Tick(tick),
                Some(event) = next_event(self.events_rx.as_mut()) => Wake::Event(event),
                Some(joined) = self.inflight.join_next() => Wake::Done(joined),
                _ = sleep_until(expiry) => Wake::Expire,
            };

            match wake {
                Wake::Shutdown => break,
                Wake::Tick(Tick::Prices) => {
                    let fetch = self.price_fetch();
                    self.spawn_all(fetch);
                }
                Wake::Tick(Tick::Macro) => {
                    let fetch = self.macro_fetch();
                    self.spawn_all(fetch);
                }
                Wake::Tick(Tick::Clock) => self.update_clock(),
                Wake::Event(event) => {
                    let fetches = self.dispatch(event);
                    self.spawn_all(fetches);
                }
                Wake::Done(joined) => self.on_joined(joined),
                Wake::Expire => {
                    if self.notifications.expire(Instant::now()) {
                        self.render_notifications();
                    }
                }
            }
        }

        tracing::info!("dashboard shutting down");
        self.teardown();
    }

    /// Cancels timers and in-flight requests and releases the chart. Safe before `initialize`
    /// and when repeated.
    pub fn teardown(&mut self) {
        self.timers = None;
        self.inflight = JoinSet::new();
        self.prices_pending = false;
        self.macro_pending = None;
        self.tabs_pending.clear();
        self.chart.release();
        self.initialized = false;
    }

    fn arm_timers(&mut self) {
        self.timers = None;
        self.timers = Some(Timers::arm());
    }

    /// Synchronous half of an event: state changes and renders happen here, network work is
    /// returned.
    fn dispatch(&mut self, event: UiEvent) -> Vec<Fetch> {
        tracing::debug!(?event, "ui event");
        match event {
            UiEvent::SelectPick(ticker) => self.select_pick(&ticker),
            UiEvent::ChangePeriod(period) => self
                .chart
                .change_period(self.target.as_mut(), period)
                .map(Fetch::Chart)
                .into_iter()
                .collect(),
            UiEvent::ToggleIndicator(kind) => self
                .chart
                .toggle_indicator(self.target.as_mut(), kind)
                .map(Fetch::Chart)
                .into_iter()
                .collect(),
            UiEvent::SwitchTab(tab) => {
                self.active_tab = Some(tab);
                self.tab_fetch(tab).into_iter().collect()
            }
            UiEvent::SelectHistoryDate(date) => {
                self.history_request = date;
                vec![Fetch::History(date)]
            }
            UiEvent::ToggleLanguage => {
                self.prefs.language = self.prefs.language.toggled();
                self.preferences_changed();
                let mut fetches: Vec<Fetch> = self.macro_fetch().into_iter().collect();
                if let Some(ticker) = self.chart.active_ticker() {
                    fetches.push(Fetch::Summary {
                        ticker: ticker.to_string(),
                        language: self.prefs.language,
                    });
                }
                fetches
            }
            UiEvent::ToggleModel => {
                self.prefs.ai_model = self.prefs.ai_model.toggled();
                self.preferences_changed();
                self.macro_fetch().into_iter().collect()
            }
            UiEvent::DismissNotification(id) => {
                if self.notifications.dismiss(id) {
                    self.render_notifications();
                } else {
                    tracing::debug!(id, "no such notification");
                }
                Vec::new()
            }
            UiEvent::Reload => {
                self.loaded_tabs.clear();
                let mut fetches = vec![Fetch::Dashboard];
                fetches.extend(self.macro_fetch());
                if let Some(tab) = self.active_tab {
                    fetches.extend(self.tab_fetch(tab));
                }
                fetches
            }
        }
    }

    fn select_pick(&mut self, ticker: &str) -> Vec<Fetch> {
        let ticker = ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Vec::new();
        }
        let period = self
            .chart
            .selection()
            .map(|s| s.period)
            .unwrap_or_default();

        self.mark_selected(Some(&ticker));
        let chart = self.chart.load_chart(self.target.as_mut(), &ticker, period);
        vec![
            Fetch::Chart(chart),
            Fetch::Summary {
                ticker,
                language: self.prefs.language,
            },
        ]
    }

    fn macro_fetch(&mut self) -> Option<Fetch> {
        if self.macro_pending == Some(self.prefs) {
            tracing::debug!("macro refresh already in flight");
            return None;
        }
        self.macro_pending = Some(self.prefs);
        Some(Fetch::Macro(self.prefs))
    }

    fn price_fetch(&mut self) -> Option<Fetch> {
        if self.prices_pending {
            tracing::debug!("previous price refresh still in flight; skipping");
            return None;
        }
        let mut tickers: Vec<String> = self.picks.iter().map(|p| p.ticker.clone()).collect();
        if let Some(active) = self.chart.active_ticker() {
            if !tickers.iter().any(|t| t == active) {
                tickers.push(active.to_string());
            }
        }
        if tickers.is_empty() {
            return None;
        }
        self.prices_pending = true;
        Some(Fetch::Prices(tickers))
    }

    fn tab_fetch(&mut self, tab: Tab) -> Option<Fetch> {
        if self.loaded_tabs.contains(&tab) || !self.tabs_pending.insert(tab) {
            return None;
        }
        Some(Fetch::Tab(tab))
    }

    fn spawn_all(&mut self, fetches: impl IntoIterator<Item = Fetch>) {
        for fetch in fetches {
            self.inflight.spawn(fetch.run(self.api.clone()));
        }
    }

    async fn await_fetches(&mut self, fetches: impl IntoIterator<Item = Fetch>) {
        self.spawn_all(fetches);
        self.finish_fetches().await;
    }

    fn on_joined(&mut self, joined: std::result::Result<Fetched, JoinError>) {
        match joined {
            Ok(fetched) => {
                let follow_up = self.apply(fetched);
                self.spawn_all(follow_up);
            }
            Err(err) if err.is_cancelled() => {}
            Err(err) => tracing::error!(error = %err, "fetch task failed"),
        }
    }

    /// Applies a finished request. Returns any requests it leads to.
    fn apply(&mut self, fetched: Fetched) -> Vec<Fetch> {
        match fetched {
            Fetched::Dashboard(load) => self.apply_load(&load),
            Fetched::Macro { prefs, result } => self.apply_macro(prefs, result),
            Fetched::Prices(result) => self.apply_prices(result),
            Fetched::Summary {
                ticker,
                language,
                result,
            } => self.apply_summary(&ticker, language, result),
            Fetched::History { date, result } => self.apply_history(date, result),
            Fetched::Tab { tab, result } => self.apply_tab(tab, result),
            Fetched::Chart(fetched) => {
                return self
                    .chart
                    .complete(self.target.as_mut(), fetched)
                    .into_iter()
                    .map(Fetch::Chart)
                    .collect();
            }
        }
        Vec::new()
    }

    fn apply_load(&mut self, load: &DashboardLoad) {
        if let Some(payload) = &load.indices {
            self.render(Section::MarketIndices, payload);
        }
        if let Some(payload) = &load.picks {
            self.history_date = None;
            self.history_request = None;
            self.picks = market::parse_picks(payload);
            self.render(Section::SmartMoneyPicks, payload);
            self.reselect_pick();
        }
        if let Some(payload) = &load.etf_flows {
            self.render(Section::EtfFlows, payload);
        }
        if let Some(payload) = &load.history_dates {
            self.render(Section::HistoryDates, payload);
        }

        if load.all_failed() {
            tracing::error!("every dashboard section failed to load");
            self.notify(Level::Error, LOAD_FAILED_MESSAGE);
        }
    }

    fn apply_macro(&mut self, prefs: Preferences, result: Result<Value>) {
        if self.macro_pending == Some(prefs) {
            self.macro_pending = None;
        }
        if prefs != self.prefs {
            tracing::debug!(language = %prefs.language, model = %prefs.ai_model, "dropping macro analysis for old preferences");
            return;
        }
        match result {
            Ok(payload) => self.render(Section::MacroIndicators, &payload),
            Err(err) => {
                tracing::warn!(
                    language = %prefs.language,
                    model = %prefs.ai_model,
                    error = %format!("{err:#}"),
                    "macro refresh failed"
                );
            }
        }
    }

    fn apply_prices(&mut self, result: Result<Vec<RealtimeQuote>>) {
        self.prices_pending = false;
        let quotes = match result {
            Ok(quotes) => quotes,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "price refresh failed");
                return;
            }
        };

        let mut updated = false;
        for quote in &quotes {
            if let Some(pick) = self
                .picks
                .iter_mut()
                .find(|p| p.ticker.eq_ignore_ascii_case(&quote.ticker))
            {
                if let Some(price) = quote.price {
                    pick.price = Some(price);
                    updated = true;
                }
                if let Some(change) = quote.change_percent {
                    pick.day_change = Some(change);
                    updated = true;
                }
            }
            self.chart.apply_quote(self.target.as_mut(), quote);
        }

        if updated {
            render_into(
                self.target.as_mut(),
                Section::SmartMoneyPicks,
                &sections::picks_view(&self.picks),
            );
            self.reselect_pick();
        }
        tracing::debug!(quotes = quotes.len(), "prices refreshed");
    }

    fn apply_summary(&mut self, ticker: &str, language: Language, result: Result<AiSummary>) {
        if self.chart.active_ticker() != Some(ticker) || self.prefs.language != language {
            tracing::debug!(ticker, %language, "dropping AI summary for a stale selection");
            return;
        }
        let view = match result {
            Ok(summary) => sections::summary_view(&summary),
            Err(err) => {
                tracing::warn!(ticker, error = %format!("{err:#}"), "failed to load AI summary");
                SectionView::placeholder(format!("{} for {ticker}", sections::NO_SUMMARY))
            }
        };
        render_into(self.target.as_mut(), Section::AiSummary, &view);
    }

    fn apply_history(&mut self, date: Option<NaiveDate>, result: Result<Value>) {
        if date != self.history_request {
            tracing::debug!(?date, "dropping picks for a superseded history selection");
            return;
        }
        match result {
            Ok(payload) => {
                self.history_date = date;
                self.picks = market::parse_picks(&payload);
                self.render(Section::SmartMoneyPicks, &payload);
                self.reselect_pick();
            }
            Err(err) => {
                tracing::warn!(?date, error = %format!("{err:#}"), "failed to load historical picks");
                let label = date.map_or_else(|| "latest".to_string(), |d| d.to_string());
                self.notify(Level::Warning, format!("Failed to load picks for {label}"));
            }
        }
    }

    fn apply_tab(&mut self, tab: Tab, result: Result<Value>) {
        self.tabs_pending.remove(&tab);
        match result {
            Ok(payload) => {
                self.render(tab.section(), &payload);
                self.loaded_tabs.insert(tab);
            }
            Err(err) => {
                tracing::warn!(%tab, error = %format!("{err:#}"), "failed to load tab");
                render_into(
                    self.target.as_mut(),
                    tab.section(),
                    &SectionView::InlineError {
                        message: format!("Failed to load {tab} data"),
                    },
                );
            }
        }
    }

    fn preferences_changed(&mut self) {
        if let Err(err) = self.store.save(&self.prefs) {
            tracing::warn!(error = %format!("{err:#}"), "failed to save preferences");
        }
        self.render_preferences();
    }

    fn render(&mut self, section: Section, payload: &Value) {
        self.registry.render(self.target.as_mut(), section, payload);
    }

    fn render_preferences(&mut self) {
        let view = SectionView::Preferences {
            language: self.prefs.language.to_string(),
            ai_model: self.prefs.ai_model.to_string(),
        };
        render_into(self.target.as_mut(), Section::Preferences, &view);
    }

    fn render_notifications(&mut self) {
        render_into(
            self.target.as_mut(),
            Section::Notifications,
            &self.notifications.view(),
        );
    }

    fn notify(&mut self, level: Level, message: impl Into<String>) {
        self.notifications.push(level, message);
        self.render_notifications();
    }

    fn mark_selected(&mut self, ticker: Option<&str>) {
        let container = Section::SmartMoneyPicks.container();
        if !self.target.has_container(container) {
            return;
        }
        if let Err(err) = self.target.select_row(container, ticker) {
            tracing::warn!(error = %err, "failed to mark selected pick");
        }
    }

    /// Re-renders wipe the table's selection; put it back if the ticker is still listed.
    fn reselect_pick(&mut self) {
        let active = self
            .chart
            .active_ticker()
            .filter(|t| self.picks.iter().any(|p| p.ticker.eq_ignore_ascii_case(t)))
            .map(str::to_string);
        if active.is_some() {
            self.mark_selected(active.as_deref());
        }
    }
}

async fn fetch_dashboard(api: &DashboardApi) -> DashboardLoad {
    let (indices, picks, etf_flows, history_dates) = tokio::join!(
        api.market_indices(),
        api.smart_money(),
        api.etf_flows(),
        api.history_dates(),
    );

    DashboardLoad {
        indices: section_payload(Section::MarketIndices, indices),
        picks: section_payload(Section::SmartMoneyPicks, picks),
        etf_flows: section_payload(Section::EtfFlows, etf_flows),
        history_dates: section_payload(Section::HistoryDates, history_dates),
    }
}

fn section_payload(section: Section, result: Result<Value>) -> Option<Value> {
    match result {
        Ok(payload) => Some(payload),
        Err(err) => {
            tracing::warn!(%section, error = %format!("{err:#}"), "section unavailable");
            None
        }
    }
}

async fn next_tick(timers: Option<&mut Timers>) -> Tick {
    match timers {
        Some(timers) => timers.next().await,
        None => std::future::pending().await,
    }
}

async fn next_event(rx: Option<&mut mpsc::UnboundedReceiver<UiEvent>>) -> Option<UiEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
