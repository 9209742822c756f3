use crate::api::middleware::{AgentIdentity, ApiError, ApiResult, AppState};
use crate::models::{ClaimOutcome, QueueResponse, ReleaseOutcome, ResolveOutcome};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

fn require_agent(identity: Option<Extension<AgentIdentity>>) -> ApiResult<AgentIdentity> {
    identity
        .map(|Extension(identity)| identity)
        .ok_or_else(|| ApiError::BadRequest("Missing X-Agent-Id header".to_string()))
}

/// Open conversations this agent can act on: the unclaimed pool plus the
/// agent's own claims, most recently active first.
pub async fn get_queue(
    State(state): State<AppState>,
    identity: Option<Extension<AgentIdentity>>,
) -> ApiResult<impl IntoResponse> {
    let agent = require_agent(identity)?;
    let conversations = state.claim_service.queue(&agent.agent_id).await?;
    Ok(Json(QueueResponse { conversations }))
}

/// Attempt to take exclusive ownership of a conversation. Exactly one of
/// any set of concurrent callers wins; the rest get a 409 with the current
/// holder so their console can refresh.
pub async fn claim_conversation(
    State(state): State<AppState>,
    identity: Option<Extension<AgentIdentity>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let agent = require_agent(identity)?;
    let outcome = state.claim_service.claim(&id, &agent.agent_id).await?;

    let status = match &outcome {
        ClaimOutcome::Claimed { .. } => StatusCode::OK,
        ClaimOutcome::AlreadyClaimed { .. } => StatusCode::CONFLICT,
    };

    Ok((status, Json(outcome)))
}

/// Return a claimed conversation to the unclaimed pool. Only the holder
/// may release; anyone else gets a 403 with a `not_owner` body.
pub async fn release_conversation(
    State(state): State<AppState>,
    identity: Option<Extension<AgentIdentity>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let agent = require_agent(identity)?;
    let outcome = state.claim_service.release(&id, &agent.agent_id).await?;

    let status = match &outcome {
        ReleaseOutcome::Released { .. } => StatusCode::OK,
        ReleaseOutcome::NotOwner => StatusCode::FORBIDDEN,
    };

    Ok((status, Json(outcome)))
}

/// Mark a conversation resolved. Idempotent: resolving an already-resolved
/// conversation reports success.
pub async fn resolve_conversation(
    State(state): State<AppState>,
    identity: Option<Extension<AgentIdentity>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let agent = require_agent(identity)?;
    let outcome = state.claim_service.resolve(&id, &agent.agent_id).await?;

    let status = match &outcome {
        ResolveOutcome::Resolved { .. } => StatusCode::OK,
        ResolveOutcome::NotOwner => StatusCode::FORBIDDEN,
    };

    Ok((status, Json(outcome)))
}
