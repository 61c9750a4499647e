use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::query::dto::{ReasoningAnswer, ReasoningRequest};
use crate::query::services::{ContextProvider, ReasoningEngine};

/// Reasoning engine reached over HTTP: `POST {url}` with `{query, context}`.
pub struct HttpReasoningEngine {
    http: reqwest::Client,
    url: String,
}

impl HttpReasoningEngine {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build reasoning http client")?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ReasoningEngine for HttpReasoningEngine {
    async fn process(&self, query: &str, context: &Value) -> anyhow::Result<ReasoningAnswer> {
        let resp = self
            .http
            .post(&self.url)
            .json(&ReasoningRequest { query, context })
            .send()
            .await
            .with_context(|| format!("POST {}", self.url))?
            .error_for_status()
            .context("reasoning engine returned an error status")?;

        let answer = resp
            .json::<ReasoningAnswer>()
            .await
            .context("decode reasoning answer")?;
        debug!("reasoning engine answered");
        Ok(answer)
    }
}

/// Used when no reasoning endpoint is configured; every query fails.
pub struct UnconfiguredReasoningEngine;

#[async_trait]
impl ReasoningEngine for UnconfiguredReasoningEngine {
    async fn process(&self, _query: &str, _context: &Value) -> anyhow::Result<ReasoningAnswer> {
        error!("query received but REASONING_URL is not set");
        anyhow::bail!("reasoning engine is not configured")
    }
}

/// Context fetched from an HTTP data layer: `GET {url}` returning any JSON.
pub struct HttpContextProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpContextProvider {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build context http client")?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ContextProvider for HttpContextProvider {
    async fn gather_context(&self) -> anyhow::Result<Value> {
        let value = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()
            .context("context provider returned an error status")?
            .json::<Value>()
            .await
            .context("decode context")?;
        Ok(value)
    }
}

/// Empty context for deployments without a data layer.
pub struct StaticContextProvider;

#[async_trait]
impl ContextProvider for StaticContextProvider {
    async fn gather_context(&self) -> anyhow::Result<Value> {
        Ok(json!({}))
    }
}
