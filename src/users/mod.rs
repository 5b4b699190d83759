use crate::state::AppState;
use axum::Router;

mod dto;
pub mod filters;
pub mod guard;
pub mod handlers;
pub mod lifecycle;
pub mod memory_repo;
pub mod pg_repo;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
