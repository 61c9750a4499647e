use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::query::dto::{QueryRequest, QueryResponse, ReasoningAnswer};

/// Supplies the operational data attached to every query.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn gather_context(&self) -> anyhow::Result<Value>;
}

/// External component that answers a query given its context.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn process(&self, query: &str, context: &Value) -> anyhow::Result<ReasoningAnswer>;
}

pub fn validate_query(req: QueryRequest) -> ApiResult<String> {
    req.query
        .map(|q| q.trim().to_owned())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Query is required".into()))
}

pub async fn handle_query(
    context: &dyn ContextProvider,
    engine: &dyn ReasoningEngine,
    req: QueryRequest,
) -> ApiResult<QueryResponse> {
    let query = validate_query(req)?;

    let ctx = context
        .gather_context()
        .await
        .map_err(ApiError::ReasoningFailure)?;
    debug!(query_len = query.len(), "context gathered");

    let answer = engine
        .process(&query, &ctx)
        .await
        .map_err(ApiError::ReasoningFailure)?;

    info!(query_type = %answer.query_type, "query answered");
    Ok(QueryResponse {
        query,
        response: answer.answer,
        query_type: answer.query_type,
        data: answer.data,
        timestamp: OffsetDateTime::now_utc(),
    })
}
