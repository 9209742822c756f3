use crate::api::middleware::{AgentIdentity, ApiError, ApiResult, AppState};
use crate::models::OnlineResponse;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub agent_id: String,
    pub recorded: bool,
}

/// Explicit presence heartbeat. Agent consoles call this on an interval;
/// ordinary agent requests also refresh presence via middleware, so this
/// endpoint mainly keeps idle consoles visible.
pub async fn heartbeat(
    State(state): State<AppState>,
    identity: Option<Extension<AgentIdentity>>,
) -> ApiResult<impl IntoResponse> {
    let agent = identity
        .map(|Extension(identity)| identity)
        .ok_or_else(|| ApiError::BadRequest("Missing X-Agent-Id header".to_string()))?;

    state.presence_service.heartbeat(&agent.agent_id).await?;

    Ok(Json(HeartbeatResponse {
        agent_id: agent.agent_id,
        recorded: true,
    }))
}

/// Whether any agent heartbeat falls inside the liveness window. Customer
/// clients use this to phrase the "request a human" flow.
pub async fn agents_online(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let online = state.presence_service.any_agent_online().await?;
    Ok(Json(OnlineResponse { online }))
}
