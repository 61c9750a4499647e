use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::ApiResult,
    query::{
        dto::{QueryRequest, QueryResponse},
        services,
    },
    state::AppState,
};

pub fn query_routes() -> Router<AppState> {
    Router::new().route("/query", post(handle_query))
}

#[instrument(skip(state, payload))]
pub async fn handle_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let Json(payload) = payload?;
    let res =
        services::handle_query(state.context.as_ref(), state.reasoning.as_ref(), payload).await?;
    Ok(Json(res))
}
