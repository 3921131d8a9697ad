pub mod dto;
pub mod handlers;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::router(state)
}
