use axum::{Json, extract::State};

use super::super::AppState;

pub async fn get_communication(State(state): State<AppState>) -> Json<serde_json::Value> {
    let comm = state.coordinator.list_messages().await;
    Json(serde_json::json!({
        "messages": comm.messages,
        "feedbacks": comm.feedbacks,
    }))
}
