use crate::chart::surface::ChartScene;
use crate::domain::chart::IndicatorKind;
use crate::domain::market::{FlowDirection, Impact, MacroCategory};
use crate::render::tone::{ChangeTone, MarketSentiment, RiskGrade, ScoreTier, Severity};
use serde::Serialize;

/// Everything a render target can be asked to show. Values are already formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionView {
    Placeholder { message: String },
    InlineError { message: String },
    Indices { cards: Vec<IndexCard> },
    Picks { rows: Vec<PickRow> },
    EtfFlows(EtfFlowsView),
    HistoryDates { dates: Vec<String> },
    Macro(MacroView),
    SectorHeatmap { tiles: Vec<SectorTile> },
    OptionsFlow { rows: Vec<OptionsRow> },
    Risk(RiskView),
    Calendar { groups: Vec<CalendarGroup> },
    AiSummary(SummaryView),
    IndicatorReadout { readings: Vec<IndicatorReading> },
    Chart(ChartScene),
    Preferences { language: String, ai_model: String },
    LastUpdated { time: String },
    Notifications { items: Vec<NotificationItem> },
}

impl SectionView {
    pub fn placeholder(message: impl Into<String>) -> Self {
        SectionView::Placeholder {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexCard {
    pub name: String,
    pub price: String,
    pub change: String,
    pub tone: ChangeTone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickRow {
    /// Row identity.
    pub ticker: String,
    pub rank: usize,
    pub name: String,
    pub score: String,
    pub tier: ScoreTier,
    pub price: String,
    pub change: String,
    pub change_tone: ChangeTone,
    pub sector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_change: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtfFlowsView {
    pub sentiment_score: String,
    pub sentiment: MarketSentiment,
    pub inflows: Vec<FlowRow>,
    pub outflows: Vec<FlowRow>,
    pub ai_analysis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRow {
    pub ticker: String,
    pub name: String,
    pub flow_score: String,
    pub direction: FlowDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroView {
    pub cards: Vec<MacroCard>,
    pub ai_analysis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroCard {
    pub key: String,
    pub name: String,
    pub value: String,
    pub change: String,
    pub tone: ChangeTone,
    pub category: MacroCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorTile {
    pub ticker: String,
    pub name: String,
    pub change: String,
    pub tone: ChangeTone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsRow {
    pub ticker: String,
    pub expiration: String,
    pub pc_ratio: String,
    pub call_volume: String,
    pub put_volume: String,
    pub unusual: String,
    pub sentiment: String,
    pub tone: ChangeTone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCell {
    pub value: String,
    pub grade: Option<RiskGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskView {
    pub volatility: MetricCell,
    pub beta: MetricCell,
    pub diversification: MetricCell,
    pub risk_level: String,
    pub top_volatilities: Vec<VolatilityRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityRow {
    pub ticker: String,
    pub volatility: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarGroup {
    pub date: String,
    pub events: Vec<CalendarRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarRow {
    pub name: String,
    pub impact: Impact,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub ticker: String,
    pub summary: String,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReading {
    pub kind: IndicatorKind,
    pub value: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationItem {
    pub id: u64,
    pub severity: String,
    pub message: String,
}
