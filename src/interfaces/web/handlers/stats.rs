use axum::{Json, extract::State};

use super::super::AppState;
use crate::core::coordinator::Stats;

pub async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.coordinator.stats().await)
}
