use crate::api::middleware::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Agent identity as asserted by the external identity service. This crate
/// trusts the `X-Agent-Id` header; authentication itself lives outside the
/// arbitration layer.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub agent_id: String,
}

pub const AGENT_ID_HEADER: &str = "x-agent-id";

/// Middleware that extracts the agent id header and refreshes presence on
/// every agent-identified request. The heartbeat write is fire-and-forget;
/// a failed presence update must not block the request itself.
pub async fn agent_identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(agent_id) = request
        .headers()
        .get(AGENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
    {
        request.extensions_mut().insert(AgentIdentity {
            agent_id: agent_id.clone(),
        });

        let presence_service = state.presence_service.clone();
        tokio::spawn(async move {
            if let Err(e) = presence_service.heartbeat(&agent_id).await {
                tracing::warn!("Failed to record agent activity: {}", e);
            }
        });
    }

    next.run(request).await
}
