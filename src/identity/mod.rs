use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod model;
pub mod password;
pub mod repo;
pub mod service;
pub mod token;
mod validate;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
