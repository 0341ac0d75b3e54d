//! Implements the `Backend` trait with `reqwest`.

use crate::api::{Backend, FetchFailure, Fetched};
use crate::Result;
use anyhow::Context;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// Talks to the expenses backend at a fixed base URL.
pub(super) struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `timeout` of `None` means requests wait as long as the server takes.
    pub(super) fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid expenses API URL '{base_url}'"))?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Fetched<Value> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Fetched::Failed(FetchFailure::Transport(e.to_string())),
        };
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Fetched::Failed(FetchFailure::Transport(e.to_string())),
        };
        trace!("{status}: {text}");
        if !status.is_success() {
            return Fetched::Failed(FetchFailure::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        match serde_json::from_str(&text) {
            Ok(value) => Fetched::Ok(value),
            Err(e) => Fetched::Failed(FetchFailure::Decode(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn get(&self, path: &str, token: &str) -> Fetched<Value> {
        let request = self.client.get(self.url(path)).bearer_auth(token);
        self.send(request).await
    }

    async fn post(&self, path: &str, token: &str, body: &Value) -> Fetched<Value> {
        let request = self.client.post(self.url(path)).bearer_auth(token).json(body);
        self.send(request).await
    }
}
