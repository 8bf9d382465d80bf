//! Firebase Realtime Database client.
//!
//! Uses the REST API directly: every path maps to `{base}/{path}.json`, with
//! the database secret passed as the `auth` query parameter.
//!
//! # API Reference
//!
//! See: <https://firebase.google.com/docs/reference/rest/database>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::Store;
use crate::error::{Error, Result};

/// Per-request timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a Firebase Realtime Database.
#[derive(Clone)]
pub struct FirebaseStore {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
    timeout: Duration,
}

impl FirebaseStore {
    /// Create a client for the database at `base_url`
    /// (e.g. `https://my-db.asia-southeast1.firebasedatabase.app`).
    pub fn new(base_url: &str, secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        let path = super::segments(path)
            .into_iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        match &self.secret {
            Some(secret) => format!(
                "{}/{}.json?auth={}",
                self.base_url,
                path,
                urlencoding::encode(secret)
            ),
            None => format!("{}/{}.json", self.base_url, path),
        }
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::store(path, e.without_url()))?;

        let status = response.status();
        debug!(%method, path, %status, "Firebase request");
        if status != StatusCode::OK {
            return Err(Error::store(path, format!("HTTP {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::store(path, e.without_url()))
    }
}

#[async_trait]
impl Store for FirebaseStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let value = self.send(Method::GET, path, None).await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn put(&self, path: &str, value: &Value) -> Result<()> {
        self.send(Method::PUT, path, Some(value)).await.map(|_| ())
    }

    async fn patch(&self, path: &str, value: &Value) -> Result<()> {
        self.send(Method::PATCH, path, Some(value)).await.map(|_| ())
    }
}
