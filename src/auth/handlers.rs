use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginResponse, PasswordRequest, ProfileResponse, RegisterRequest, RegisterResponse},
        services,
    },
    error::ApiResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", post(profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(payload) = payload?;
    let body = services::register(state.credentials.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    Ok(Json(services::login(state.credentials.as_ref(), payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn profile(
    State(state): State<AppState>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> ApiResult<Json<ProfileResponse>> {
    let Json(payload) = payload?;
    Ok(Json(services::profile(state.credentials.as_ref(), payload).await?))
}
