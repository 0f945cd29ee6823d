use crate::state::AppState;
use axum::{routing::get, Router};

pub mod event;
pub mod registry;
pub mod socket;

pub use registry::Relay;

pub const RELAY_PATH: &str = "/ws";

pub fn router() -> Router<AppState> {
    Router::new().route(RELAY_PATH, get(socket::ws_handler))
}
