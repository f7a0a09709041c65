use axum::Router;
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub mod twilio;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().merge(twilio::configure())
}
