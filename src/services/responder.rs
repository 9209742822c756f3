use crate::{
    api::middleware::error::{ApiError, ApiResult},
    database::Database,
    models::{Conversation, CustomerTurnResponse, Message, SenderRole},
    services::{MessageService, PresenceService},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Reply appended as the assistant turn when the responder call fails or
/// times out. The customer's own message is already committed by then.
pub const FALLBACK_REPLY: &str = "Sorry, I'm having technical difficulties at the moment. \
     You can try again, or ask to speak with a human agent.";

const SYSTEM_PROMPT: &str = "You are the virtual assistant for a time-tracking platform. \
     Help users with hours, finances and reports. Be professional, direct and empathetic. \
     If you cannot resolve something technical, suggest speaking with a human agent.";

/// Opaque automated responder. May be slow, may fail; callers own the
/// timeout and the fallback.
#[async_trait]
pub trait AssistantResponder: Send + Sync {
    async fn generate(&self, history: &[Message], system_prompt: &str) -> ApiResult<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    system_prompt: &'a str,
    turns: Vec<GenerateTurn<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerateTurn<'a> {
    role: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Responder used when no generation endpoint is configured. Every call
/// fails, so the router serves the static fallback instead.
pub struct DisabledResponder;

#[async_trait]
impl AssistantResponder for DisabledResponder {
    async fn generate(&self, _history: &[Message], _system_prompt: &str) -> ApiResult<String> {
        Err(ApiError::Unavailable(
            "No assistant endpoint configured".to_string(),
        ))
    }
}

/// Production responder: POSTs the conversation history to an external
/// generation endpoint.
pub struct HttpAssistantResponder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAssistantResponder {
    pub fn new(endpoint: String, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl AssistantResponder for HttpAssistantResponder {
    async fn generate(&self, history: &[Message], system_prompt: &str) -> ApiResult<String> {
        // Agent turns are part of the conversation but not of the
        // assistant's dialogue; mirror only customer/assistant turns.
        let turns: Vec<GenerateTurn> = history
            .iter()
            .filter(|m| {
                matches!(m.sender_role, SenderRole::Customer | SenderRole::Assistant)
            })
            .map(|m| GenerateTurn {
                role: m.sender_role.as_str(),
                text: &m.body,
            })
            .collect();

        let request = GenerateRequest {
            system_prompt,
            turns,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Unavailable(format!("Assistant request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Unavailable(format!(
                "Assistant returned status {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Unavailable(format!("Assistant response malformed: {}", e)))?;

        Ok(body.text)
    }
}

/// Single decision point for assistant-vs-human handling of customer
/// messages. A conversation owned by a human gets persist-only treatment;
/// everything else goes through the automated assistant with a bounded
/// timeout and a fallback reply.
#[derive(Clone)]
pub struct ResponderRouter {
    db: Database,
    message_service: MessageService,
    presence_service: PresenceService,
    responder: Arc<dyn AssistantResponder>,
    assistant_timeout: Duration,
}

impl ResponderRouter {
    pub fn new(
        db: Database,
        message_service: MessageService,
        presence_service: PresenceService,
        responder: Arc<dyn AssistantResponder>,
        assistant_timeout: Duration,
    ) -> Self {
        Self {
            db,
            message_service,
            presence_service,
            responder,
            assistant_timeout,
        }
    }

    /// Handle one inbound customer message.
    ///
    /// The customer turn is committed before the assistant is ever invoked,
    /// so a stuck or failing responder can never lose it. The reopen of a
    /// Resolved conversation happens inside the append itself.
    pub async fn handle_customer_message(
        &self,
        customer_id: &str,
        body: &str,
    ) -> ApiResult<CustomerTurnResponse> {
        Message::validate_body(body).map_err(ApiError::BadRequest)?;

        let conversation = self.db.upsert_conversation(customer_id).await?;

        let (customer_message, reopened) = self
            .message_service
            .append_and_publish(&conversation.id, SenderRole::Customer, body)
            .await?;

        if reopened {
            tracing::info!(
                "Conversation {} reopened by customer {} activity",
                conversation.id,
                customer_id
            );
        }

        // Re-read after the append: the reopen above may have cleared the
        // assignment, and a concurrent claim may have set one.
        let conversation = self
            .db
            .get_conversation_by_id(&conversation.id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal("Conversation disappeared after append".to_string())
            })?;

        let mut messages = vec![customer_message];

        if conversation.is_claimed() {
            // A human owns this conversation; persist-only, no automated
            // reply.
            tracing::debug!(
                "Conversation {} handled by agent {:?}, skipping assistant",
                conversation.id,
                conversation.assigned_agent_id
            );
        } else {
            let reply = self.assistant_reply(&conversation.id).await;
            let (assistant_message, _) = self
                .message_service
                .append_and_publish(&conversation.id, SenderRole::Assistant, &reply)
                .await?;
            messages.push(assistant_message);
        }

        Ok(CustomerTurnResponse {
            conversation_id: conversation.id,
            messages,
        })
    }

    /// Customer asked for a human. Guarantees an Open conversation exists
    /// (reopening a Resolved one back into the unclaimed pool) and appends
    /// a status notice chosen by agent liveness. It never claims: an agent
    /// still has to pick the conversation up from the queue.
    pub async fn request_human(&self, customer_id: &str) -> ApiResult<Conversation> {
        let conversation = self.db.upsert_conversation(customer_id).await?;

        let online = self.presence_service.any_agent_online().await?;
        let notice = if online {
            "Connecting you with a support agent now. Please hold on a moment."
        } else {
            "No agents are online right now, but your request is queued and \
             we will reply as soon as possible."
        };

        // A resolved conversation reopens through the customer-activity
        // trigger; the notice itself is an assistant turn.
        self.message_service
            .append_and_publish(&conversation.id, SenderRole::Customer, "Requested human support.")
            .await?;
        self.message_service
            .append_and_publish(&conversation.id, SenderRole::Assistant, notice)
            .await?;

        tracing::info!(
            "Customer {} requested human support (agents online: {})",
            customer_id,
            online
        );

        self.db
            .get_conversation_by_id(&conversation.id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal("Conversation disappeared after request".to_string())
            })
    }

    /// Invoke the assistant under a hard timeout; degrade to the static
    /// fallback on any failure. This method cannot error: the customer's
    /// message is already stored and an assistant turn is always produced.
    async fn assistant_reply(&self, conversation_id: &str) -> String {
        let history = match self.db.list_messages_since(conversation_id, 0).await {
            Ok(history) => history,
            Err(e) => {
                tracing::error!(
                    "Failed to load history for assistant on conversation {}: {}",
                    conversation_id,
                    e
                );
                return FALLBACK_REPLY.to_string();
            }
        };

        let generate = self.responder.generate(&history, SYSTEM_PROMPT);
        match tokio::time::timeout(self.assistant_timeout, generate).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                tracing::warn!(
                    "Assistant returned empty reply for conversation {}",
                    conversation_id
                );
                FALLBACK_REPLY.to_string()
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    "Assistant failed for conversation {}: {}",
                    conversation_id,
                    e
                );
                FALLBACK_REPLY.to_string()
            }
            Err(_) => {
                tracing::warn!(
                    "Assistant timed out after {:?} for conversation {}",
                    self.assistant_timeout,
                    conversation_id
                );
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
