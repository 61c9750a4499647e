use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

#[cfg(test)]
pub mod memory;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
