use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// Body sent to the reasoning engine.
#[derive(Debug, Serialize)]
pub struct ReasoningRequest<'a> {
    pub query: &'a str,
    pub context: &'a Value,
}

/// What the reasoning engine answers. Passed through without validation;
/// absent fields become `null`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReasoningAnswer {
    #[serde(default)]
    pub answer: Value,
    #[serde(default)]
    pub query_type: Value,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub response: Value,
    pub query_type: Value,
    pub data: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
