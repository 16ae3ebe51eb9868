use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use serde::Deserialize;

use super::super::AppState;
use super::super::error::ApiError;
use crate::core::coordinator::ProposalDraft;

pub async fn get_proposals(State(state): State<AppState>) -> Json<serde_json::Value> {
    let proposals = state.coordinator.list_proposals().await;
    Json(serde_json::json!({ "proposals": proposals, "timestamp": Utc::now() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    agent_name: Option<String>,
    task: Option<String>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    expected_outcome: String,
    priority: Option<String>,
}

pub async fn create_proposal(
    State(state): State<AppState>,
    payload: Result<Json<CreateProposalRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    let agent_name = payload.agent_name.unwrap_or_default();
    let draft = ProposalDraft {
        task: payload.task.unwrap_or_default(),
        reason: payload.reason,
        expected_outcome: payload.expected_outcome,
        priority: payload.priority,
    };
    let proposal = state.coordinator.create_proposal(&agent_name, draft).await?;
    Ok(Json(
        serde_json::json!({ "proposal": proposal, "timestamp": Utc::now() }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveProposalRequest {
    proposal_id: Option<String>,
    approved: Option<bool>,
    approved_by: Option<String>,
}

pub async fn approve_proposal(
    State(state): State<AppState>,
    payload: Result<Json<ApproveProposalRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(payload) = payload?;
    let proposal = state
        .coordinator
        .approve_proposal(
            payload.proposal_id.as_deref().unwrap_or_default(),
            payload.approved.unwrap_or(false),
            payload.approved_by.as_deref(),
        )
        .await?;
    Ok(Json(
        serde_json::json!({ "proposal": proposal, "timestamp": Utc::now() }),
    ))
}

pub async fn seed_proposals(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let proposals = state.coordinator.seed_proposals().await?;
    Ok(Json(
        serde_json::json!({ "proposals": proposals, "timestamp": Utc::now() }),
    ))
}
