use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod serial;
mod services;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
