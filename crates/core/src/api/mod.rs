pub mod error;
pub mod http;
pub mod json;

use crate::api::error::{ApiError, ApiErrorKind};
use crate::domain::chart::{AiSummary, ChartData, ChartPeriod, IndicatorSnapshot, RealtimeQuote};
use crate::domain::preferences::{AiModel, Language};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_FETCH_BUDGET: Duration = Duration::from_secs(30);

const PORTFOLIO_PATH: &str = "/api/us/portfolio";
const SMART_MONEY_PATH: &str = "/api/us/smart-money";
const ETF_FLOWS_PATH: &str = "/api/us/etf-flows";
const HISTORY_DATES_PATH: &str = "/api/us/history-dates";
const MACRO_ANALYSIS_PATH: &str = "/api/us/macro-analysis";
const SECTOR_HEATMAP_PATH: &str = "/api/us/sector-heatmap";
const OPTIONS_FLOW_PATH: &str = "/api/us/options-flow";
const PORTFOLIO_RISK_PATH: &str = "/api/us/portfolio-risk";
const CALENDAR_PATH: &str = "/api/us/calendar";
const REALTIME_PRICES_PATH: &str = "/api/realtime-prices";

/// Moves JSON between the dashboard and the API server.
///
/// Implementations report failures as [`ApiError`] inside `anyhow::Error`.
#[async_trait::async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get_json(&self, path: &str, query: &[(&'static str, String)]) -> Result<Value>;

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Typed access to every endpoint the dashboard reads, each call bounded by the fetch budget.
#[derive(Clone)]
pub struct DashboardApi {
    transport: Arc<dyn ApiTransport>,
    budget: Duration,
}

impl DashboardApi {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            budget: DEFAULT_FETCH_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub async fn market_indices(&self) -> Result<Value> {
        self.get(PORTFOLIO_PATH, Vec::new()).await
    }

    pub async fn smart_money(&self) -> Result<Value> {
        self.get(SMART_MONEY_PATH, Vec::new()).await
    }

    pub async fn etf_flows(&self) -> Result<Value> {
        self.get(ETF_FLOWS_PATH, Vec::new()).await
    }

    pub async fn history_dates(&self) -> Result<Value> {
        self.get(HISTORY_DATES_PATH, Vec::new()).await
    }

    pub async fn history(&self, date: NaiveDate) -> Result<Value> {
        let path = format!("/api/us/history/{}", date.format("%Y-%m-%d"));
        self.get(&path, Vec::new()).await
    }

    pub async fn macro_analysis(&self, language: Language, model: AiModel) -> Result<Value> {
        let query = vec![
            ("lang", language.as_str().to_string()),
            ("model", model.as_str().to_string()),
        ];
        self.get(MACRO_ANALYSIS_PATH, query).await
    }

    pub async fn sector_heatmap(&self) -> Result<Value> {
        self.get(SECTOR_HEATMAP_PATH, Vec::new()).await
    }

    pub async fn options_flow(&self) -> Result<Value> {
        self.get(OPTIONS_FLOW_PATH, Vec::new()).await
    }

    pub async fn portfolio_risk(&self) -> Result<Value> {
        self.get(PORTFOLIO_RISK_PATH, Vec::new()).await
    }

    pub async fn calendar(&self) -> Result<Value> {
        self.get(CALENDAR_PATH, Vec::new()).await
    }

    pub async fn stock_chart(&self, ticker: &str, period: ChartPeriod) -> Result<ChartData> {
        let path = format!("/api/us/stock-chart/{}", ticker.trim());
        let payload = self
            .get(&path, vec![("period", period.as_query().to_string())])
            .await?;
        Ok(ChartData::from_payload(&payload))
    }

    pub async fn technical_indicators(&self, ticker: &str) -> Result<IndicatorSnapshot> {
        let path = format!("/api/us/technical-indicators/{}", ticker.trim());
        let payload = self.get(&path, Vec::new()).await?;
        if let Some(message) = json::error_message_field(&payload) {
            return Err(ApiError::new(path, ApiErrorKind::Decode, message).into());
        }
        IndicatorSnapshot::deserialize(&payload).map_err(|e| {
            ApiError::new(path, ApiErrorKind::Decode, format!("indicator payload: {e}")).into()
        })
    }

    pub async fn ai_summary(&self, ticker: &str, language: Language) -> Result<AiSummary> {
        let path = format!("/api/us/ai-summary/{}", ticker.trim());
        let payload = self
            .get(&path, vec![("lang", language.as_str().to_string())])
            .await?;
        Ok(AiSummary::from_payload(ticker, &payload))
    }

    pub async fn realtime_prices(&self, tickers: &[String]) -> Result<Vec<RealtimeQuote>> {
        let body = serde_json::json!({ "tickers": tickers });
        let payload = self
            .guard(REALTIME_PRICES_PATH, self.transport.post_json(REALTIME_PRICES_PATH, &body))
            .await?;

        if payload.get("success").and_then(Value::as_bool) == Some(false) {
            let message = json::error_message_field(&payload)
                .unwrap_or_else(|| "success=false".to_string());
            return Err(ApiError::new(REALTIME_PRICES_PATH, ApiErrorKind::Decode, message).into());
        }

        Ok(crate::domain::lenient::items(&payload, &["prices"]))
    }

    async fn get(&self, path: &str, query: Vec<(&'static str, String)>) -> Result<Value> {
        self.guard(path, self.transport.get_json(path, &query)).await
    }

    async fn guard<F>(&self, endpoint: &str, fut: F) -> Result<Value>
    where
        F: Future<Output = Result<Value>>,
    {
        match tokio::time::timeout(self.budget, fut).await {
            Ok(res) => res,
            Err(_) => Err(ApiError::new(
                endpoint,
                ApiErrorKind::Timeout,
                format!("no response within {}s", self.budget.as_secs()),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn hung_requests_become_typed_timeouts() {
        let fake = FakeTransport::new();
        fake.respond_after(PORTFOLIO_PATH, Duration::from_secs(31), json!({"indices": []}));
        let api = DashboardApi::new(Arc::new(fake.clone()));

        let err = api.market_indices().await.unwrap_err();
        assert_eq!(ApiError::kind_of(&err), ApiErrorKind::Timeout);
    }

    #[tokio::test]
    async fn chart_request_carries_period_query() {
        let fake = FakeTransport::new();
        fake.respond(
            "/api/us/stock-chart/AAPL",
            json!({"candles": [{"time": "2025-01-02", "open": 1, "high": 2, "low": 1, "close": 2}]}),
        );
        let api = DashboardApi::new(Arc::new(fake.clone()));

        let data = api.stock_chart("AAPL", ChartPeriod::OneYear).await.unwrap();
        assert_eq!(data.candles.len(), 1);
        assert_eq!(
            fake.last_query("/api/us/stock-chart/AAPL"),
            Some(vec![("period".to_string(), "1y".to_string())])
        );
    }

    #[tokio::test]
    async fn realtime_prices_reject_unsuccessful_batches() {
        let fake = FakeTransport::new();
        fake.respond(REALTIME_PRICES_PATH, json!({"success": false, "error": "rate limited"}));
        let api = DashboardApi::new(Arc::new(fake.clone()));

        let err = api.realtime_prices(&["AAA".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
