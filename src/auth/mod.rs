use crate::state::AppState;
use axum::Router;

pub mod authz;
pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod repo;
pub mod session;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::router(state)
}
