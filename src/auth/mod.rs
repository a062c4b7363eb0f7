use crate::state::AppState;
use axum::Router;

pub(crate) mod cookies;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub(crate) mod jwt;
pub(crate) mod otp;
pub(crate) mod password;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new().nest("/auth", handlers::auth_routes())
}
