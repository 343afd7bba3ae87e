//! In-memory transport for exercising fetch paths without a server.

use crate::api::error::{ApiError, ApiErrorKind};
use crate::api::ApiTransport;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
struct Route {
    reply: std::result::Result<Value, ApiErrorKind>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct Inner {
    routes: HashMap<String, Route>,
    calls: HashMap<String, usize>,
    queries: HashMap<String, Vec<(String, String)>>,
    bodies: HashMap<String, Value>,
}

#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<Inner>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.route(path, Ok(body), None);
    }

    pub fn respond_after(&self, path: &str, delay: Duration, body: Value) {
        self.route(path, Ok(body), Some(delay));
    }

    pub fn fail(&self, path: &str, kind: ApiErrorKind) {
        self.route(path, Err(kind), None);
    }

    /// Slows an existing route down without changing its reply.
    pub fn delay(&self, path: &str, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(route) = inner.routes.get_mut(path) {
            route.delay = Some(delay);
        }
    }

    pub fn calls(&self, path: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.get(path).copied().unwrap_or(0)
    }

    pub fn last_query(&self, path: &str) -> Option<Vec<(String, String)>> {
        let inner = self.inner.lock().unwrap();
        inner.queries.get(path).cloned()
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        let inner = self.inner.lock().unwrap();
        inner.bodies.get(path).cloned()
    }

    fn route(&self, path: &str, reply: std::result::Result<Value, ApiErrorKind>, delay: Option<Duration>) {
        let mut inner = self.inner.lock().unwrap();
        inner.routes.insert(path.to_string(), Route { reply, delay });
    }

    async fn serve(&self, path: &str) -> Result<Value> {
        let route = {
            let mut inner = self.inner.lock().unwrap();
            *inner.calls.entry(path.to_string()).or_default() += 1;
            inner.routes.get(path).cloned()
        };

        let Some(route) = route else {
            return Err(ApiError::new(path, ApiErrorKind::Status(404), "no route").into());
        };

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        route
            .reply
            .map_err(|kind| ApiError::new(path, kind, "injected failure").into())
    }
}

#[async_trait::async_trait]
impl ApiTransport for FakeTransport {
    async fn get_json(&self, path: &str, query: &[(&'static str, String)]) -> Result<Value> {
        {
            let mut inner = self.inner.lock().unwrap();
            let query = query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            inner.queries.insert(path.to_string(), query);
        }
        self.serve(path).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.bodies.insert(path.to_string(), body.clone());
        }
        self.serve(path).await
    }
}
