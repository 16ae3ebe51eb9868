use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use serde::Deserialize;

use super::super::AppState;
use super::super::error::ApiError;

pub async fn get_tasks(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tasks = state.coordinator.list_tasks().await;
    Json(serde_json::json!({ "tasks": tasks, "timestamp": Utc::now() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskRequest {
    task_id: Option<String>,
    #[serde(default)]
    result: String,
}

pub async fn complete_task(
    State(state): State<AppState>,
    payload: Result<Json<CompleteTaskRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    let task = state
        .coordinator
        .complete_task(
            payload.task_id.as_deref().unwrap_or_default(),
            &payload.result,
        )
        .await?;
    Ok(Json(serde_json::json!({ "task": task, "timestamp": Utc::now() })))
}
