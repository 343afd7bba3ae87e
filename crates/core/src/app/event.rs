use crate::domain::chart::{ChartPeriod, IndicatorKind};
use crate::render::Section;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Lazily loaded sections behind tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tab {
    Sectors,
    Options,
    Risk,
    Calendar,
}

impl Tab {
    pub fn section(self) -> Section {
        match self {
            Tab::Sectors => Section::SectorHeatmap,
            Tab::Options => Section::OptionsFlow,
            Tab::Risk => Section::PortfolioRisk,
            Tab::Calendar => Section::EconomicCalendar,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Sectors => "sectors",
            Tab::Options => "options",
            Tab::Risk => "risk",
            Tab::Calendar => "calendar",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sectors" | "sector" | "heatmap" => Ok(Tab::Sectors),
            "options" | "option" | "options-flow" => Ok(Tab::Options),
            "risk" | "portfolio-risk" => Ok(Tab::Risk),
            "calendar" | "events" => Ok(Tab::Calendar),
            other => anyhow::bail!("unknown tab: {other}"),
        }
    }
}

/// Everything a user can do to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SelectPick(String),
    ChangePeriod(ChartPeriod),
    ToggleIndicator(IndicatorKind),
    SwitchTab(Tab),
    /// `None` goes back to the latest picks.
    SelectHistoryDate(Option<NaiveDate>),
    ToggleLanguage,
    ToggleModel,
    DismissNotification(u64),
    Reload,
}
