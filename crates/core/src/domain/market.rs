//! Section payloads as the dashboard reads them.
//!
//! Every reader takes the raw JSON body and returns view-ready rows; nothing here fails.

use crate::domain::lenient::{self, field_number, field_text};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketIndex {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub price: Option<f64>,
    #[serde(default, rename = "change", deserialize_with = "lenient::number")]
    pub change_percent: Option<f64>,
}

pub fn parse_indices(payload: &Value) -> Vec<MarketIndex> {
    lenient::items(payload, &["indices"])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockPick {
    pub rank: usize,
    pub ticker: String,
    pub name: Option<String>,
    pub score: Option<f64>,
    pub price: Option<f64>,
    pub change_since_rec: Option<f64>,
    pub sector: Option<String>,
    pub day_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPick {
    #[serde(default, deserialize_with = "lenient::text")]
    ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    final_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    composite_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    current_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    change_since_rec: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    sector: Option<String>,
}

/// Picks in payload order; rank is the 1-based position. Rows without a ticker are dropped
/// because the ticker is the row identity.
pub fn parse_picks(payload: &Value) -> Vec<StockPick> {
    lenient::items::<RawPick>(payload, &["top_picks", "picks"])
        .into_iter()
        .filter_map(|raw| raw.ticker.clone().map(|ticker| (ticker, raw)))
        .enumerate()
        .map(|(idx, (ticker, raw))| StockPick {
            rank: idx + 1,
            ticker,
            name: raw.name,
            score: raw.final_score.or(raw.composite_score),
            price: raw.current_price.or(raw.price),
            change_since_rec: raw.change_since_rec,
            sector: raw.sector,
            day_change: None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtfFlowEntry {
    pub ticker: String,
    pub name: Option<String>,
    pub flow_score: Option<f64>,
    pub direction: FlowDirection,
}

#[derive(Debug, Deserialize)]
struct RawEtf {
    #[serde(default, deserialize_with = "lenient::text")]
    ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    flow_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtfFlows {
    pub sentiment_score: Option<f64>,
    pub inflows: Vec<EtfFlowEntry>,
    pub outflows: Vec<EtfFlowEntry>,
    pub ai_analysis: Option<String>,
}

impl EtfFlows {
    pub fn is_empty(&self) -> bool {
        self.sentiment_score.is_none() && self.inflows.is_empty() && self.outflows.is_empty()
    }
}

pub fn parse_etf_flows(payload: &Value) -> EtfFlows {
    let entries = |key: &str, direction: FlowDirection| -> Vec<EtfFlowEntry> {
        lenient::items::<RawEtf>(payload, &[key])
            .into_iter()
            .filter_map(|raw| {
                Some(EtfFlowEntry {
                    ticker: raw.ticker?,
                    name: raw.name,
                    flow_score: raw.flow_score,
                    direction,
                })
            })
            .collect()
    };

    EtfFlows {
        sentiment_score: field_number(payload, "market_sentiment_score"),
        inflows: entries("top_inflows", FlowDirection::In),
        outflows: entries("top_outflows", FlowDirection::Out),
        ai_analysis: field_text(payload, "ai_analysis"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroCategory {
    Volatility,
    Crypto,
    Rates,
    Neutral,
}

impl MacroCategory {
    /// Case-insensitive substring match on the indicator key, first category wins.
    pub fn for_key(key: &str) -> Self {
        let key = key.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| key.contains(n));
        if has(&["vix", "volatility"]) {
            MacroCategory::Volatility
        } else if has(&["btc", "eth", "crypto", "bitcoin"]) {
            MacroCategory::Crypto
        } else if has(&["yield", "rate", "treasury", "bond"]) {
            MacroCategory::Rates
        } else {
            MacroCategory::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroIndicator {
    pub key: String,
    pub display_name: String,
    pub current_value: Option<f64>,
    pub change_percent: Option<f64>,
    pub category: MacroCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSnapshot {
    pub indicators: Vec<MacroIndicator>,
    pub ai_analysis: Option<String>,
}

/// Indicators come back keyed; cards are sorted by key so the output is stable.
pub fn parse_macro(payload: &Value) -> MacroSnapshot {
    let mut indicators: Vec<MacroIndicator> = payload
        .get("indicators")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(key, v)| MacroIndicator {
                    key: key.clone(),
                    display_name: field_text(v, "name")
                        .unwrap_or_else(|| macro_display_name(key)),
                    current_value: field_number(v, "current").or_else(|| field_number(v, "value")),
                    change_percent: field_number(v, "change")
                        .or_else(|| field_number(v, "change_1d")),
                    category: MacroCategory::for_key(key),
                })
                .collect()
        })
        .unwrap_or_default();
    indicators.sort_by(|a, b| a.key.cmp(&b.key));

    let english = field_text(payload, "lang").is_some_and(|l| l.eq_ignore_ascii_case("en"));
    let ai_analysis = if english {
        field_text(payload, "ai_analysis_en").or_else(|| field_text(payload, "ai_analysis"))
    } else {
        field_text(payload, "ai_analysis")
    };

    MacroSnapshot {
        indicators,
        ai_analysis,
    }
}

fn macro_display_name(key: &str) -> String {
    match key.to_ascii_uppercase().as_str() {
        "VIX" => "VIX".to_string(),
        "DXY" => "Dollar Index".to_string(),
        "2Y_YIELD" => "2Y Treasury".to_string(),
        "10Y_YIELD" => "10Y Treasury".to_string(),
        "YIELD_SPREAD" => "10Y-2Y Spread".to_string(),
        "GOLD" => "Gold".to_string(),
        "OIL" => "WTI Oil".to_string(),
        "BTC" => "Bitcoin".to_string(),
        "FEAR_GREED" => "Fear & Greed".to_string(),
        _ => key.replace('_', " "),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorPerformance {
    #[serde(default, deserialize_with = "lenient::text")]
    pub ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub change_pct: Option<f64>,
}

pub fn parse_sectors(payload: &Value) -> Vec<SectorPerformance> {
    lenient::items(payload, &["sectors"])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsFlowEntry {
    pub ticker: String,
    pub expiration: Option<String>,
    pub pc_ratio: Option<f64>,
    pub call_vol: Option<f64>,
    pub put_vol: Option<f64>,
    pub unusual_total: Option<f64>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOptionsFlow {
    #[serde(default, deserialize_with = "lenient::text")]
    ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    expiration: Option<String>,
    #[serde(default)]
    metrics: Value,
    #[serde(default)]
    unusual: Value,
    #[serde(default, deserialize_with = "lenient::text")]
    sentiment: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    error: Option<String>,
}

/// Rows the pipeline marked with an `error` are skipped.
pub fn parse_options_flow(payload: &Value) -> Vec<OptionsFlowEntry> {
    lenient::items::<RawOptionsFlow>(payload, &["options_flow"])
        .into_iter()
        .filter(|raw| raw.error.is_none())
        .filter_map(|raw| {
            Some(OptionsFlowEntry {
                ticker: raw.ticker?,
                expiration: raw.expiration,
                pc_ratio: field_number(&raw.metrics, "pc_ratio"),
                call_vol: field_number(&raw.metrics, "call_vol"),
                put_vol: field_number(&raw.metrics, "put_vol"),
                unusual_total: field_number(&raw.unusual, "total"),
                sentiment: raw.sentiment,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub volatility_pct: Option<f64>,
    pub beta: Option<f64>,
    pub diversification_ratio: Option<f64>,
    pub risk_level: Option<String>,
    /// Ticker and annualized volatility in percent, in payload order.
    pub individual_volatilities: Vec<(String, f64)>,
}

impl RiskMetrics {
    pub fn is_empty(&self) -> bool {
        self.volatility_pct.is_none()
            && self.beta.is_none()
            && self.diversification_ratio.is_none()
            && self.individual_volatilities.is_empty()
    }
}

pub fn parse_risk(payload: &Value) -> RiskMetrics {
    let metrics = payload.get("metrics").cloned().unwrap_or(Value::Null);
    let volatility_pct = field_number(&metrics, "portfolio_volatility_pct").or_else(|| {
        field_number(&metrics, "portfolio_volatility").map(|v| v * 100.0)
    });

    let individual_volatilities = payload
        .get("individual_volatilities")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(ticker, v)| lenient::as_number(v).map(|n| (ticker.clone(), n)))
                .collect()
        })
        .unwrap_or_default();

    RiskMetrics {
        volatility_pct,
        beta: field_number(&metrics, "beta"),
        diversification_ratio: field_number(&metrics, "diversification_ratio"),
        risk_level: field_text(&metrics, "risk_level"),
        individual_volatilities,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Impact {
    High,
    Medium,
    #[default]
    Low,
}

impl Impact {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Impact::High,
            Some("medium") => Impact::Medium,
            _ => Impact::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub date: String,
    pub name: String,
    pub impact: Impact,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default, deserialize_with = "lenient::text")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    event: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    impact: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    description: Option<String>,
}

pub fn parse_calendar(payload: &Value) -> Vec<CalendarEvent> {
    lenient::items::<RawEvent>(payload, &["events"])
        .into_iter()
        .filter_map(|raw| {
            Some(CalendarEvent {
                date: raw.date?,
                name: raw.event.unwrap_or_else(|| "-".to_string()),
                impact: Impact::parse(raw.impact.as_deref()),
                description: raw.description,
            })
        })
        .collect()
}

pub fn parse_history_dates(payload: &Value) -> Vec<String> {
    lenient::items::<Value>(payload, &["dates"])
        .iter()
        .filter_map(lenient::as_text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_prefer_final_score_and_current_price() {
        let payload = json!({"top_picks": [
            {"ticker": "AAA", "final_score": 85, "composite_score": 70, "current_price": 100, "price": 90},
            {"ticker": "BBB", "composite_score": 55, "price": 12.5},
            {"name": "no ticker"},
        ]});
        let picks = parse_picks(&payload);
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].rank, 1);
        assert_eq!(picks[0].score, Some(85.0));
        assert_eq!(picks[0].price, Some(100.0));
        assert_eq!(picks[1].rank, 2);
        assert_eq!(picks[1].score, Some(55.0));
        assert_eq!(picks[1].price, Some(12.5));
    }

    #[test]
    fn history_payloads_use_picks_key() {
        let payload = json!({"date": "2025-01-02", "picks": [{"ticker": "AAA"}]});
        assert_eq!(parse_picks(&payload)[0].ticker, "AAA");
    }

    #[test]
    fn macro_reads_both_value_shapes_and_sorts_by_key() {
        let payload = json!({
            "lang": "en",
            "ai_analysis": "ko text",
            "ai_analysis_en": "en text",
            "indicators": {
                "VIX": {"current": 18.2, "change": -3.1},
                "BTC": {"value": 97000, "change_1d": 1.2},
                "10Y_Yield": {"value": "4.31"},
            }
        });
        let snapshot = parse_macro(&payload);
        let keys: Vec<_> = snapshot.indicators.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["10Y_Yield", "BTC", "VIX"]);
        assert_eq!(snapshot.indicators[0].current_value, Some(4.31));
        assert_eq!(snapshot.indicators[0].category, MacroCategory::Rates);
        assert_eq!(snapshot.indicators[1].change_percent, Some(1.2));
        assert_eq!(snapshot.indicators[1].category, MacroCategory::Crypto);
        assert_eq!(snapshot.indicators[2].category, MacroCategory::Volatility);
        assert_eq!(snapshot.ai_analysis.as_deref(), Some("en text"));
    }

    #[test]
    fn macro_category_matching_is_case_insensitive() {
        assert_eq!(MacroCategory::for_key("vix"), MacroCategory::Volatility);
        assert_eq!(MacroCategory::for_key("Crypto_Index"), MacroCategory::Crypto);
        assert_eq!(MacroCategory::for_key("FED_RATE"), MacroCategory::Rates);
        assert_eq!(MacroCategory::for_key("GOLD"), MacroCategory::Neutral);
    }

    #[test]
    fn options_flow_skips_error_rows() {
        let payload = json!({"options_flow": [
            {"ticker": "AAPL", "expiration": "2025-01-17",
             "metrics": {"pc_ratio": 0.8, "call_vol": 1200, "put_vol": 960},
             "unusual": {"total": 3}, "sentiment": "Bullish"},
            {"ticker": "XYZ", "error": "No options available"},
        ]});
        let rows = parse_options_flow(&payload);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].put_vol, Some(960.0));
        assert_eq!(rows[0].unusual_total, Some(3.0));
    }

    #[test]
    fn calendar_defaults_impact_to_low() {
        let payload = json!({"events": [{"date": "2025-01-01", "event": "Jobs"}]});
        assert_eq!(parse_calendar(&payload)[0].impact, Impact::Low);
    }

    #[test]
    fn risk_falls_back_to_fractional_volatility() {
        let payload = json!({"metrics": {"portfolio_volatility": 0.184, "beta": 1.1}});
        let risk = parse_risk(&payload);
        assert!((risk.volatility_pct.unwrap() - 18.4).abs() < 1e-9);
        assert_eq!(risk.beta, Some(1.1));
        assert!(risk.individual_volatilities.is_empty());
    }
}
