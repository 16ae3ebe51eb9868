use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::Utc;
use serde::Deserialize;

use super::super::AppState;
use super::super::error::ApiError;
use crate::core::coordinator::ProposalDraft;

pub async fn get_agents(State(state): State<AppState>) -> Json<serde_json::Value> {
    let agents = state.registry.list_agents().await;
    Json(serde_json::json!({ "agents": agents, "timestamp": Utc::now() }))
}

pub async fn reload_agents(State(state): State<AppState>) -> Json<serde_json::Value> {
    let count = state.registry.reload().await;
    Json(serde_json::json!({ "agents": count, "timestamp": Utc::now() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProposalRequest {
    task: Option<String>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    expected_outcome: String,
    priority: Option<String>,
}

pub async fn agent_propose(
    Path(agent): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<AgentProposalRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    let draft = ProposalDraft {
        task: payload.task.unwrap_or_default(),
        reason: payload.reason,
        expected_outcome: payload.expected_outcome,
        priority: payload.priority,
    };
    let proposal = state.coordinator.propose_as_agent(&agent, draft).await?;
    Ok(Json(
        serde_json::json!({ "proposal": proposal, "timestamp": Utc::now() }),
    ))
}

#[derive(Deserialize)]
pub struct CollaborateRequest {
    #[serde(default)]
    to: String,
    #[serde(default)]
    task: String,
}

pub async fn collaborate(
    Path(agent): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<CollaborateRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    let message = state
        .coordinator
        .request_collaboration(&agent, &payload.to, &payload.task)
        .await?;
    Ok(Json(serde_json::json!({
        "status": "sent",
        "to": message.to,
        "message": message,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    to: String,
    #[serde(default)]
    about_task: String,
    #[serde(default)]
    feedback: String,
    rating: Option<i64>,
}

pub async fn give_feedback(
    Path(agent): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    let rating = payload
        .rating
        .and_then(|r| u8::try_from(r).ok())
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| ApiError::BadRequest("rating must be an integer from 1 to 5".to_string()))?;
    let feedback = state
        .coordinator
        .give_feedback(
            &agent,
            &payload.to,
            &payload.about_task,
            &payload.feedback,
            rating,
        )
        .await?;
    Ok(Json(
        serde_json::json!({ "feedback": feedback, "timestamp": Utc::now() }),
    ))
}

#[derive(Deserialize)]
pub struct ThinkRequest {
    #[serde(default)]
    about: String,
}

pub async fn think(
    Path(agent): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<ThinkRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    let thought = state.coordinator.think(&agent, &payload.about).await?;
    Ok(Json(serde_json::json!(thought)))
}
