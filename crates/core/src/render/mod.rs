//! Section rendering.
//!
//! Renderers turn a payload into a [`SectionView`]; a [`RenderTarget`] shows views in named
//! containers. Nothing in here knows about markup.

pub mod format;
pub mod sections;
pub mod target;
pub mod tone;
pub mod view;

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub use target::{JsonDirTarget, MemoryTarget};
pub use view::SectionView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    MarketIndices,
    SmartMoneyPicks,
    EtfFlows,
    HistoryDates,
    MacroIndicators,
    SectorHeatmap,
    OptionsFlow,
    PortfolioRisk,
    EconomicCalendar,
    AiSummary,
    IndicatorReadout,
    StockChart,
    Notifications,
    LastUpdated,
    Preferences,
}

impl Section {
    pub const ALL: [Section; 15] = [
        Section::MarketIndices,
        Section::SmartMoneyPicks,
        Section::EtfFlows,
        Section::HistoryDates,
        Section::MacroIndicators,
        Section::SectorHeatmap,
        Section::OptionsFlow,
        Section::PortfolioRisk,
        Section::EconomicCalendar,
        Section::AiSummary,
        Section::IndicatorReadout,
        Section::StockChart,
        Section::Notifications,
        Section::LastUpdated,
        Section::Preferences,
    ];

    pub fn container(self) -> &'static str {
        match self {
            Section::MarketIndices => "market-indices",
            Section::SmartMoneyPicks => "smart-money-picks",
            Section::EtfFlows => "etf-flows",
            Section::HistoryDates => "history-dates",
            Section::MacroIndicators => "macro-indicators",
            Section::SectorHeatmap => "sector-heatmap",
            Section::OptionsFlow => "options-flow",
            Section::PortfolioRisk => "portfolio-risk",
            Section::EconomicCalendar => "economic-calendar",
            Section::AiSummary => "ai-summary",
            Section::IndicatorReadout => "indicator-readout",
            Section::StockChart => "stock-chart",
            Section::Notifications => "notifications",
            Section::LastUpdated => "last-updated",
            Section::Preferences => "preferences",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.container())
    }
}

/// Where views end up. Each call replaces the container's whole content.
pub trait RenderTarget: Send {
    fn has_container(&self, container: &str) -> bool;

    /// Replacing a container also clears any row selection inside it.
    fn replace(&mut self, container: &str, view: &SectionView) -> Result<()>;

    /// Marks one row (by its key) as the only selected row, or clears the selection.
    fn select_row(&mut self, container: &str, key: Option<&str>) -> Result<()>;
}

/// Writes `view` into the section's container. A missing container or a failing target is
/// logged and otherwise ignored.
pub fn render_into(target: &mut dyn RenderTarget, section: Section, view: &SectionView) {
    let container = section.container();
    if !target.has_container(container) {
        tracing::warn!(container, "render target has no such container; skipping");
        return;
    }
    if let Err(err) = target.replace(container, view) {
        tracing::warn!(container, error = %err, "failed to render section");
    }
}

pub type Renderer = fn(&Value) -> SectionView;

/// Section → renderer, filled at startup. Sections without a renderer render nothing.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<Section, Renderer>,
}

impl RendererRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register(Section::MarketIndices, sections::render_indices)
            .register(Section::SmartMoneyPicks, sections::render_picks)
            .register(Section::EtfFlows, sections::render_etf_flows)
            .register(Section::HistoryDates, sections::render_history_dates)
            .register(Section::MacroIndicators, sections::render_macro)
            .register(Section::SectorHeatmap, sections::render_sector_heatmap)
            .register(Section::OptionsFlow, sections::render_options_flow)
            .register(Section::PortfolioRisk, sections::render_risk)
            .register(Section::EconomicCalendar, sections::render_calendar);
        registry
    }

    pub fn register(&mut self, section: Section, renderer: Renderer) -> &mut Self {
        self.renderers.insert(section, renderer);
        self
    }

    /// Renders `payload` into the section's container. Returns the view that was produced.
    pub fn render(
        &self,
        target: &mut dyn RenderTarget,
        section: Section,
        payload: &Value,
    ) -> Option<SectionView> {
        let Some(renderer) = self.renderers.get(&section) else {
            tracing::debug!(%section, "no renderer registered");
            return None;
        };
        let view = renderer(payload);
        render_into(target, section, &view);
        Some(view)
    }
}
