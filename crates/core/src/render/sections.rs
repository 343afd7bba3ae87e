//! One renderer per dashboard section: payload in, view out.
//!
//! Renderers never fail. An empty payload yields the section's placeholder and every missing
//! field has a fallback.

use crate::domain::chart::{AiSummary, IndicatorKind, IndicatorSnapshot};
use crate::domain::market::{
    self, CalendarEvent, EtfFlowEntry, EtfFlows, MacroSnapshot, RiskMetrics, StockPick,
};
use crate::render::format;
use crate::render::tone;
use crate::render::view::*;
use serde_json::Value;
use std::collections::BTreeMap;

pub const NO_INDICES: &str = "Market data unavailable";
pub const NO_PICKS: &str = "No smart money picks available";
pub const NO_ETF_FLOWS: &str = "No ETF flow data";
pub const NO_HISTORY: &str = "No analysis history";
pub const NO_MACRO: &str = "Macro analysis unavailable";
pub const NO_SECTORS: &str = "No sector data";
pub const NO_OPTIONS: &str = "No options flow data";
pub const NO_RISK: &str = "No risk metrics";
pub const NO_EVENTS: &str = "No upcoming economic events";
pub const NO_SUMMARY: &str = "No AI summary";

const TOP_VOLATILITIES: usize = 10;

pub fn render_indices(payload: &Value) -> SectionView {
    let indices = market::parse_indices(payload);
    if indices.is_empty() {
        return SectionView::placeholder(NO_INDICES);
    }

    SectionView::Indices {
        cards: indices
            .into_iter()
            .map(|idx| IndexCard {
                name: format::text(idx.name.as_deref()),
                price: format::price(idx.price),
                change: format::percent(idx.change_percent),
                tone: tone::change_tone(idx.change_percent),
            })
            .collect(),
    }
}

pub fn render_picks(payload: &Value) -> SectionView {
    picks_view(&market::parse_picks(payload))
}

/// Also used after a live price pass, which mutates picks without a new payload.
pub fn picks_view(picks: &[StockPick]) -> SectionView {
    if picks.is_empty() {
        return SectionView::placeholder(NO_PICKS);
    }

    SectionView::Picks {
        rows: picks
            .iter()
            .map(|p| PickRow {
                ticker: p.ticker.clone(),
                rank: p.rank,
                name: p.name.clone().unwrap_or_else(|| p.ticker.clone()),
                score: format::decimal(p.score, 1),
                tier: tone::score_tier(p.score),
                price: format::price(p.price),
                change: format::percent(p.change_since_rec),
                change_tone: tone::change_tone(p.change_since_rec),
                sector: format::text(p.sector.as_deref()),
                day_change: p.day_change.map(|c| format::percent(Some(c))),
            })
            .collect(),
    }
}

pub fn render_etf_flows(payload: &Value) -> SectionView {
    etf_flows_view(&market::parse_etf_flows(payload))
}

fn etf_flows_view(flows: &EtfFlows) -> SectionView {
    if flows.is_empty() {
        return SectionView::placeholder(NO_ETF_FLOWS);
    }

    let rows = |entries: &[EtfFlowEntry]| -> Vec<FlowRow> {
        entries
            .iter()
            .map(|e| FlowRow {
                ticker: e.ticker.clone(),
                name: format::text(e.name.as_deref()),
                flow_score: format::decimal(e.flow_score, 1),
                direction: e.direction,
            })
            .collect()
    };

    SectionView::EtfFlows(EtfFlowsView {
        sentiment_score: format::decimal(flows.sentiment_score, 1),
        sentiment: tone::market_sentiment(flows.sentiment_score),
        inflows: rows(&flows.inflows),
        outflows: rows(&flows.outflows),
        ai_analysis: flows.ai_analysis.clone(),
    })
}

pub fn render_history_dates(payload: &Value) -> SectionView {
    let dates = market::parse_history_dates(payload);
    if dates.is_empty() {
        return SectionView::placeholder(NO_HISTORY);
    }
    SectionView::HistoryDates { dates }
}

pub fn render_macro(payload: &Value) -> SectionView {
    macro_view(&market::parse_macro(payload))
}

fn macro_view(snapshot: &MacroSnapshot) -> SectionView {
    if snapshot.indicators.is_empty() {
        return SectionView::placeholder(NO_MACRO);
    }

    SectionView::Macro(MacroView {
        cards: snapshot
            .indicators
            .iter()
            .map(|i| MacroCard {
                key: i.key.clone(),
                name: i.display_name.clone(),
                value: format::price(i.current_value),
                change: format::percent(i.change_percent),
                tone: tone::change_tone(i.change_percent),
                category: i.category,
            })
            .collect(),
        ai_analysis: snapshot.ai_analysis.clone(),
    })
}

pub fn render_sector_heatmap(payload: &Value) -> SectionView {
    let sectors = market::parse_sectors(payload);
    if sectors.is_empty() {
        return SectionView::placeholder(NO_SECTORS);
    }

    SectionView::SectorHeatmap {
        tiles: sectors
            .into_iter()
            .map(|s| SectorTile {
                ticker: format::text(s.ticker.as_deref()),
                name: s
                    .name
                    .or_else(|| s.ticker.clone())
                    .unwrap_or_else(|| format::MISSING_TEXT.to_string()),
                change: format::percent(s.change_pct),
                tone: tone::change_tone(s.change_pct),
            })
            .collect(),
    }
}

pub fn render_options_flow(payload: &Value) -> SectionView {
    let rows = market::parse_options_flow(payload);
    if rows.is_empty() {
        return SectionView::placeholder(NO_OPTIONS);
    }

    SectionView::OptionsFlow {
        rows: rows
            .into_iter()
            .map(|r| OptionsRow {
                tone: tone::sentiment_tone(r.sentiment.as_deref()),
                sentiment: format::text(r.sentiment.as_deref()),
                ticker: r.ticker,
                expiration: format::text(r.expiration.as_deref()),
                pc_ratio: format::decimal(r.pc_ratio, 2),
                call_volume: format::count(r.call_vol),
                put_volume: format::count(r.put_vol),
                unusual: format::count(r.unusual_total),
            })
            .collect(),
    }
}

pub fn render_risk(payload: &Value) -> SectionView {
    risk_view(&market::parse_risk(payload))
}

fn risk_view(risk: &RiskMetrics) -> SectionView {
    if risk.is_empty() {
        return SectionView::placeholder(NO_RISK);
    }

    let mut vols = risk.individual_volatilities.clone();
    vols.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    vols.truncate(TOP_VOLATILITIES);

    SectionView::Risk(RiskView {
        volatility: MetricCell {
            value: risk
                .volatility_pct
                .map(|v| format!("{}%", format::decimal(Some(v), 2)))
                .unwrap_or_else(|| format::NOT_AVAILABLE.to_string()),
            grade: risk.volatility_pct.map(tone::volatility_grade),
        },
        beta: MetricCell {
            value: format::decimal(risk.beta, 2),
            grade: risk.beta.map(tone::beta_grade),
        },
        diversification: MetricCell {
            value: format::decimal(risk.diversification_ratio, 2),
            grade: risk.diversification_ratio.map(tone::diversification_grade),
        },
        risk_level: format::text(risk.risk_level.as_deref()),
        top_volatilities: vols
            .into_iter()
            .map(|(ticker, v)| VolatilityRow {
                ticker,
                volatility: format!("{}%", format::decimal(Some(v), 2)),
            })
            .collect(),
    })
}

pub fn render_calendar(payload: &Value) -> SectionView {
    calendar_view(&market::parse_calendar(payload))
}

/// Groups by date; `BTreeMap` keeps dates ascending and each bucket keeps insertion order.
fn calendar_view(events: &[CalendarEvent]) -> SectionView {
    if events.is_empty() {
        return SectionView::placeholder(NO_EVENTS);
    }

    let mut by_date: BTreeMap<&str, Vec<CalendarRow>> = BTreeMap::new();
    for e in events {
        by_date.entry(e.date.as_str()).or_default().push(CalendarRow {
            name: e.name.clone(),
            impact: e.impact,
            severity: tone::impact_severity(e.impact),
            description: format::text(e.description.as_deref()),
        });
    }

    SectionView::Calendar {
        groups: by_date
            .into_iter()
            .map(|(date, events)| CalendarGroup {
                date: date.to_string(),
                events,
            })
            .collect(),
    }
}

pub fn summary_view(summary: &AiSummary) -> SectionView {
    match summary.summary.as_deref() {
        Some(text) => SectionView::AiSummary(SummaryView {
            ticker: summary.ticker.clone(),
            summary: text.to_string(),
            updated: summary.updated.clone(),
        }),
        None => SectionView::placeholder(format!("{NO_SUMMARY} for {}", summary.ticker)),
    }
}

/// Readout for indicators that have no chart geometry (RSI, MACD).
pub fn indicator_readout(
    active: impl IntoIterator<Item = IndicatorKind>,
    snapshot: Option<&IndicatorSnapshot>,
) -> SectionView {
    let readings = active
        .into_iter()
        .filter(|k| !k.draws_on_chart())
        .map(|kind| match kind {
            IndicatorKind::Rsi => {
                let rsi = snapshot.and_then(|s| s.rsi);
                IndicatorReading {
                    kind,
                    value: format::decimal(rsi, 2),
                    detail: rsi_zone(rsi).to_string(),
                }
            }
            _ => {
                let macd = snapshot.and_then(|s| s.macd.clone()).unwrap_or_default();
                IndicatorReading {
                    kind,
                    value: format::decimal(macd.macd, 2),
                    detail: format!(
                        "signal {} / histogram {} ({})",
                        format::decimal(macd.signal, 2),
                        format::decimal(macd.histogram, 2),
                        format::text(macd.trend.as_deref())
                    ),
                }
            }
        })
        .collect();

    SectionView::IndicatorReadout { readings }
}

fn rsi_zone(rsi: Option<f64>) -> &'static str {
    match rsi {
        Some(v) if v >= 70.0 => "Overbought",
        Some(v) if v <= 30.0 => "Oversold",
        Some(_) => "Neutral",
        None => format::NOT_AVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::MacdReading;
    use serde_json::json;

    #[test]
    fn every_section_has_a_placeholder_for_empty_payloads() {
        let cases: [(fn(&Value) -> SectionView, &str); 9] = [
            (render_indices, NO_INDICES),
            (render_picks, NO_PICKS),
            (render_etf_flows, NO_ETF_FLOWS),
            (render_history_dates, NO_HISTORY),
            (render_macro, NO_MACRO),
            (render_sector_heatmap, NO_SECTORS),
            (render_options_flow, NO_OPTIONS),
            (render_risk, NO_RISK),
            (render_calendar, NO_EVENTS),
        ];

        for payload in [json!({}), json!([]), Value::Null, json!("garbage"), json!({"indices": null})] {
            for (render, message) in cases {
                assert_eq!(render(&payload), SectionView::placeholder(message));
            }
        }
    }

    #[test]
    fn single_pick_renders_rank_tier_and_signed_change() {
        let payload = json!({"top_picks": [
            {"ticker": "AAA", "final_score": 85, "current_price": 100, "change_since_rec": 2.5, "sector": "Tech"}
        ]});
        let SectionView::Picks { rows } = render_picks(&payload) else {
            panic!("expected picks view");
        };
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.rank, 1);
        assert_eq!(row.ticker, "AAA");
        assert_eq!(row.tier, tone::ScoreTier::High);
        assert_eq!(row.change, "+2.50%");
        assert_eq!(row.price, "100.00");
        assert_eq!(row.sector, "Tech");
        assert_eq!(row.name, "AAA");
    }

    #[test]
    fn picks_with_missing_numbers_render_not_available() {
        let payload = json!({"top_picks": [{"ticker": "BBB", "current_price": null}]});
        let SectionView::Picks { rows } = render_picks(&payload) else {
            panic!("expected picks view");
        };
        assert_eq!(rows[0].price, "N/A");
        assert_eq!(rows[0].change, "N/A");
        assert_eq!(rows[0].score, "N/A");
        assert_eq!(rows[0].sector, "-");
    }

    #[test]
    fn calendar_groups_dates_ascending() {
        let payload = json!({"events": [
            {"date": "2025-01-02", "event": "CPI", "impact": "High"},
            {"date": "2025-01-01", "event": "Jobs", "impact": "Low"},
        ]});
        let SectionView::Calendar { groups } = render_calendar(&payload) else {
            panic!("expected calendar view");
        };
        let dates: Vec<_> = groups.iter().map(|g| g.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-01-01", "2025-01-02"]);
        assert_eq!(groups[1].events[0].severity, tone::Severity::Severe);
        assert_eq!(groups[0].events[0].severity, tone::Severity::Neutral);
    }

    #[test]
    fn calendar_keeps_insertion_order_within_a_date() {
        let payload = json!([
            {"date": "2025-01-03", "event": "B", "impact": "Medium"},
            {"date": "2025-01-03", "event": "A"},
        ]);
        let SectionView::Calendar { groups } = render_calendar(&payload) else {
            panic!("expected calendar view");
        };
        let names: Vec<_> = groups[0].events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(groups[0].events[1].impact, crate::domain::market::Impact::Low);
    }

    #[test]
    fn risk_grades_and_top_ten_volatilities() {
        let vols: serde_json::Map<String, Value> = (1..=12)
            .map(|i| (format!("T{i:02}"), json!(i as f64 * 5.0)))
            .collect();
        let payload = json!({
            "metrics": {"portfolio_volatility_pct": 18.5, "beta": 1.3, "diversification_ratio": 2.4, "risk_level": "Medium"},
            "individual_volatilities": vols,
        });
        let SectionView::Risk(risk) = render_risk(&payload) else {
            panic!("expected risk view");
        };
        assert_eq!(risk.volatility.value, "18.50%");
        assert_eq!(risk.volatility.grade, Some(tone::RiskGrade::Moderate));
        assert_eq!(risk.beta.grade, Some(tone::RiskGrade::Poor));
        assert_eq!(risk.diversification.grade, Some(tone::RiskGrade::Good));
        assert_eq!(risk.top_volatilities.len(), 10);
        assert_eq!(risk.top_volatilities[0].ticker, "T12");
        assert_eq!(risk.top_volatilities[0].volatility, "60.00%");
        assert_eq!(risk.top_volatilities[9].ticker, "T03");
    }

    #[test]
    fn macro_cards_carry_category_treatment() {
        let payload = json!({"indicators": {
            "VIX": {"current": 14.2, "change": 1.5},
            "GOLD": {"value": 2650.4, "change_1d": -0.3},
        }});
        let SectionView::Macro(view) = render_macro(&payload) else {
            panic!("expected macro view");
        };
        assert_eq!(view.cards[0].key, "GOLD");
        assert_eq!(view.cards[0].value, "2,650.40");
        assert_eq!(view.cards[0].category, market::MacroCategory::Neutral);
        assert_eq!(view.cards[1].category, market::MacroCategory::Volatility);
        assert_eq!(view.cards[1].change, "+1.50%");
    }

    #[test]
    fn etf_flows_split_directions() {
        let payload = json!({
            "market_sentiment_score": 64.2,
            "top_inflows": [{"ticker": "XLK", "name": "Technology", "flow_score": 81.3}],
            "top_outflows": [{"ticker": "XLE", "flow_score": 22.0}],
            "ai_analysis": "Risk-on rotation",
        });
        let SectionView::EtfFlows(view) = render_etf_flows(&payload) else {
            panic!("expected etf view");
        };
        assert_eq!(view.sentiment, tone::MarketSentiment::Bullish);
        assert_eq!(view.inflows[0].direction, market::FlowDirection::In);
        assert_eq!(view.outflows[0].direction, market::FlowDirection::Out);
        assert_eq!(view.outflows[0].name, "-");
    }

    #[test]
    fn readout_lists_only_value_indicators() {
        let snapshot = IndicatorSnapshot {
            rsi: Some(72.4),
            macd: Some(MacdReading {
                macd: Some(1.2),
                signal: Some(0.8),
                histogram: Some(0.4),
                trend: Some("Bullish".to_string()),
            }),
            ..Default::default()
        };
        let view = indicator_readout(
            [IndicatorKind::Rsi, IndicatorKind::Bollinger, IndicatorKind::Macd],
            Some(&snapshot),
        );
        let SectionView::IndicatorReadout { readings } = view else {
            panic!("expected readout");
        };
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, "72.40");
        assert_eq!(readings[0].detail, "Overbought");
        assert_eq!(readings[1].detail, "signal 0.80 / histogram 0.40 (Bullish)");
    }
}
