//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use hiroba_shared::protocol::UserInfo;
use serde::Serialize;

use crate::ui::state::AppState;

/// Response body of `GET /api/presence`
#[derive(Debug, Serialize)]
pub struct PresenceDto {
    pub count: usize,
    pub participants: Vec<UserInfo>,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Current live participants (for debugging and tests)
pub async fn presence(State(state): State<Arc<AppState>>) -> Json<PresenceDto> {
    let participants = state.hub.snapshot(None).await;
    Json(PresenceDto {
        count: participants.len(),
        participants,
    })
}
