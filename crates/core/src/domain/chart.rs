use crate::domain::lenient::{self, field_text};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartPeriod {
    #[serde(rename = "1M")]
    OneMonth,
    #[default]
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "2Y")]
    TwoYears,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl ChartPeriod {
    /// Value of the `period` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            ChartPeriod::OneMonth => "1mo",
            ChartPeriod::ThreeMonths => "3mo",
            ChartPeriod::SixMonths => "6mo",
            ChartPeriod::OneYear => "1y",
            ChartPeriod::TwoYears => "2y",
            ChartPeriod::FiveYears => "5y",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartPeriod::OneMonth => "1M",
            ChartPeriod::ThreeMonths => "3M",
            ChartPeriod::SixMonths => "6M",
            ChartPeriod::OneYear => "1Y",
            ChartPeriod::TwoYears => "2Y",
            ChartPeriod::FiveYears => "5Y",
        }
    }
}

impl fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "1m" | "1mo" => ChartPeriod::OneMonth,
            "3m" | "3mo" => ChartPeriod::ThreeMonths,
            "6m" | "6mo" => ChartPeriod::SixMonths,
            "1y" => ChartPeriod::OneYear,
            "2y" => ChartPeriod::TwoYears,
            "5y" => ChartPeriod::FiveYears,
            other => bail!("unknown chart period: {other}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Rsi,
    Macd,
    Bollinger,
    SupportResistance,
}

impl IndicatorKind {
    /// RSI and MACD come back as current values only, so they are shown as a readout.
    pub fn draws_on_chart(self) -> bool {
        matches!(
            self,
            IndicatorKind::Bollinger | IndicatorKind::SupportResistance
        )
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Bollinger => "BB",
            IndicatorKind::SupportResistance => "S/R",
        })
    }
}

impl FromStr for IndicatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "rsi" => IndicatorKind::Rsi,
            "macd" => IndicatorKind::Macd,
            "bb" | "bollinger" => IndicatorKind::Bollinger,
            "sr" | "s/r" | "support" | "support_resistance" => IndicatorKind::SupportResistance,
            other => bail!("unknown indicator: {other}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub candles: Vec<Candle>,
    pub error: Option<String>,
}

impl ChartData {
    /// Candles are read from `candles`, or `data` as older servers send it.
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            candles: lenient::items(payload, &["candles", "data"]),
            error: field_text(payload, "error"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    #[serde(default, deserialize_with = "lenient::number")]
    pub macd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub signal: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub histogram: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    #[serde(default, deserialize_with = "lenient::number")]
    pub upper: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub middle: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lower: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub position: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub signal: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    #[serde(default, deserialize_with = "lenient::numbers")]
    pub support_levels: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::numbers")]
    pub resistance_levels: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub nearest_support: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub nearest_resistance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(default, deserialize_with = "lenient::text")]
    pub ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rsi: Option<f64>,
    #[serde(default)]
    pub macd: Option<MacdReading>,
    #[serde(default)]
    pub bollinger_bands: Option<BollingerBands>,
    #[serde(default)]
    pub support_resistance: Option<SupportResistance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeQuote {
    pub ticker: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiSummary {
    pub ticker: String,
    pub summary: Option<String>,
    pub updated: Option<String>,
}

impl AiSummary {
    pub fn from_payload(ticker: &str, payload: &Value) -> Self {
        Self {
            ticker: field_text(payload, "ticker").unwrap_or_else(|| ticker.to_string()),
            summary: field_text(payload, "summary"),
            updated: field_text(payload, "updated"),
        }
    }
}
