//! Exercises the reqwest transport against a local axum server.

use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use usalpha_core::api::error::{ApiError, ApiErrorKind};
use usalpha_core::api::http::HttpTransport;
use usalpha_core::api::DashboardApi;
use usalpha_core::domain::chart::ChartPeriod;
use usalpha_core::domain::market;

async fn portfolio() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"indices": [{"name": "NaN Index", "price": NaN, "change": -Infinity}, {"name": "Dow", "price": 43000.5, "change": 0.2}]}"#,
    )
}

async fn smart_money() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "smart money file missing"})),
    )
}

async fn stock_chart(
    Path(ticker): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let period = query.get("period").cloned().unwrap_or_default();
    Json(json!({
        "ticker": ticker,
        "period": period,
        "data": [{"time": "2025-01-02", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5}]
    }))
}

async fn realtime_prices(Json(body): Json<Value>) -> Json<Value> {
    let prices: Vec<Value> = body["tickers"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|t| json!({"ticker": t, "price": 10.0, "change_percent": 1.0}))
        .collect();
    Json(json!({"success": true, "prices": prices}))
}

async fn broken() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{not json")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"sectors": []}))
}

async fn serve() -> String {
    let app = Router::new()
        .route("/api/us/portfolio", get(portfolio))
        .route("/api/us/smart-money", get(smart_money))
        .route("/api/us/stock-chart/:ticker", get(stock_chart))
        .route("/api/us/etf-flows", get(broken))
        .route("/api/us/sector-heatmap", get(slow))
        .route("/api/realtime-prices", post(realtime_prices));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn api(timeout: Duration) -> DashboardApi {
    let base = serve().await;
    let transport = HttpTransport::new(&base, timeout).unwrap();
    DashboardApi::new(Arc::new(transport))
}

#[tokio::test]
async fn non_finite_tokens_decode_as_missing_values() {
    let api = api(Duration::from_secs(5)).await;
    let payload = api.market_indices().await.unwrap();
    let indices = market::parse_indices(&payload);
    assert_eq!(indices.len(), 2);
    assert_eq!(indices[0].price, None);
    assert_eq!(indices[0].change_percent, None);
    assert_eq!(indices[1].price, Some(43000.5));
}

#[tokio::test]
async fn error_status_carries_the_server_message() {
    let api = api(Duration::from_secs(5)).await;
    let err = api.smart_money().await.unwrap_err();
    let api_err = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api_err.kind, ApiErrorKind::Status(500));
    assert_eq!(api_err.detail, "smart money file missing");
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let api = api(Duration::from_secs(5)).await;
    let err = api.etf_flows().await.unwrap_err();
    assert_eq!(ApiError::kind_of(&err), ApiErrorKind::Decode);
}

#[tokio::test]
async fn unknown_routes_are_status_errors() {
    let api = api(Duration::from_secs(5)).await;
    let err = api.calendar().await.unwrap_err();
    assert_eq!(ApiError::kind_of(&err), ApiErrorKind::Status(404));
}

#[tokio::test]
async fn chart_requests_send_period_and_accept_data_key() {
    let api = api(Duration::from_secs(5)).await;
    let chart = api
        .stock_chart("BRK-B", ChartPeriod::SixMonths)
        .await
        .unwrap();
    assert_eq!(chart.candles.len(), 1);
    assert_eq!(chart.candles[0].close, 1.5);
    assert_eq!(chart.error, None);
}

#[tokio::test]
async fn realtime_prices_post_the_ticker_list() {
    let api = api(Duration::from_secs(5)).await;
    let quotes = api
        .realtime_prices(&["AAPL".to_string(), "MSFT".to_string()])
        .await
        .unwrap();
    let tickers: Vec<_> = quotes.iter().map(|q| q.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["AAPL", "MSFT"]);
    assert_eq!(quotes[0].price, Some(10.0));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let base = serve().await;
    let transport = HttpTransport::new(&base, Duration::from_secs(10)).unwrap();
    let api = DashboardApi::new(Arc::new(transport)).with_budget(Duration::from_millis(200));
    let err = api.sector_heatmap().await.unwrap_err();
    assert_eq!(ApiError::kind_of(&err), ApiErrorKind::Timeout);
}

#[tokio::test]
async fn unreachable_hosts_are_transport_errors() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let api = DashboardApi::new(Arc::new(transport));
    let err = api.market_indices().await.unwrap_err();
    assert_eq!(ApiError::kind_of(&err), ApiErrorKind::Transport);
}
