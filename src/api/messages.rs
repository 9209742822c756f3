use crate::api::middleware::{AgentIdentity, ApiError, ApiResult, AppState};
use crate::models::{MessageListResponse, SendMessageRequest};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

/// Customer sends a message. Creates the conversation on first contact,
/// reopens a resolved one, and routes to either the automated assistant or
/// persist-only depending on whether a human holds the claim.
pub async fn customer_send_message(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state
        .responder_router
        .handle_customer_message(&customer_id, &request.body)
        .await?;
    Ok(Json(response))
}

/// Customer explicitly asks for a human agent.
pub async fn request_human(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let conversation = state.responder_router.request_human(&customer_id).await?;
    Ok(Json(conversation))
}

/// Customer's own conversation, if one exists.
pub async fn get_customer_conversation(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let conversation = state
        .db
        .get_conversation_by_customer(&customer_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No conversation for customer {}", customer_id))
        })?;
    Ok(Json(conversation))
}

/// Agent reply into a conversation the agent currently holds.
pub async fn agent_send_message(
    State(state): State<AppState>,
    identity: Option<Extension<AgentIdentity>>,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let agent = identity
        .map(|Extension(identity)| identity)
        .ok_or_else(|| ApiError::BadRequest("Missing X-Agent-Id header".to_string()))?;

    let message = state
        .message_service
        .send_agent_message(&id, &agent.agent_id, &request.body)
        .await?;
    Ok(Json(message))
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    /// Replay cursor: return only messages with `seq` greater than this.
    /// Zero (the default) replays the whole log.
    #[serde(default)]
    pub after_seq: i64,
}

/// Messages in append order, optionally after a cursor. This is the
/// reconciliation path clients use after an SSE reconnect.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<impl IntoResponse> {
    if query.after_seq < 0 {
        return Err(ApiError::BadRequest(
            "after_seq must be non-negative".to_string(),
        ));
    }

    let messages = state.message_service.list_since(&id, query.after_seq).await?;
    Ok(Json(MessageListResponse { messages }))
}
