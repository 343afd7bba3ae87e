use crate::api::error::{ApiError, ApiErrorKind};
use crate::api::json;
use crate::api::ApiTransport;
use crate::config::Settings;
use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.api_base_url, settings.api_timeout)
    }

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid API base URL {base_url:?}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "API base URL {base_url} cannot carry a path"
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build dashboard http client")?;

        Ok(Self { http, base_url })
    }

    /// Appends `path` to the base URL one segment at a time, percent-encoding each segment.
    fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::new(path, ApiErrorKind::Transport, "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    async fn read(&self, path: &str, res: reqwest::Response) -> Result<Value> {
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| classify(path, e))?;

        if !status.is_success() {
            return Err(ApiError::new(
                path,
                ApiErrorKind::Status(status.as_u16()),
                json::error_message(&text),
            )
            .into());
        }

        json::parse_body(path, &text)
    }
}

#[async_trait::async_trait]
impl ApiTransport for HttpTransport {
    async fn get_json(&self, path: &str, query: &[(&'static str, String)]) -> Result<Value> {
        let t0 = std::time::Instant::now();
        let res = self
            .http
            .get(self.url(path)?)
            .query(query)
            .send()
            .await
            .map_err(|e| classify(path, e))?;

        let out = self.read(path, res).await;
        tracing::debug!(
            path,
            ok = out.is_ok(),
            elapsed_ms = t0.elapsed().as_millis(),
            "GET"
        );
        out
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let t0 = std::time::Instant::now();
        let res = self
            .http
            .post(self.url(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| classify(path, e))?;

        let out = self.read(path, res).await;
        tracing::debug!(
            path,
            ok = out.is_ok(),
            elapsed_ms = t0.elapsed().as_millis(),
            "POST"
        );
        out
    }
}

fn classify(path: &str, err: reqwest::Error) -> anyhow::Error {
    let kind = if err.is_timeout() {
        ApiErrorKind::Timeout
    } else if err.is_decode() {
        ApiErrorKind::Decode
    } else {
        ApiErrorKind::Transport
    };
    ApiError::new(path, kind, err.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(base: &str, path: &str) -> String {
        let t = HttpTransport::new(base, Duration::from_secs(5)).unwrap();
        t.url(path).unwrap().to_string()
    }

    #[test]
    fn url_joins_without_double_slashes() {
        assert_eq!(
            url("http://localhost:3000/", "/api/us/portfolio"),
            "http://localhost:3000/api/us/portfolio"
        );
        assert_eq!(
            url("http://localhost:3000", "api/us/portfolio"),
            "http://localhost:3000/api/us/portfolio"
        );
        assert_eq!(
            url("http://proxy.local/dashboard/", "/api/us/calendar"),
            "http://proxy.local/dashboard/api/us/calendar"
        );
    }

    #[test]
    fn ticker_segments_are_percent_encoded() {
        assert_eq!(
            url("http://localhost:3000", "/api/us/ai-summary/A B?#"),
            "http://localhost:3000/api/us/ai-summary/A%20B%3F%23"
        );
        assert_eq!(
            url("http://localhost:3000", "/api/us/stock-chart/BRK-B"),
            "http://localhost:3000/api/us/stock-chart/BRK-B"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpTransport::new("  ", Duration::from_secs(5)).is_err());
        assert!(HttpTransport::new("mailto:ops@example.com", Duration::from_secs(5)).is_err());
    }
}
