use crate::{
    api::middleware::error::{ApiError, ApiResult},
    database::Database,
    events::{EventBus, SystemEvent},
    models::{Message, SenderRole},
};
use std::sync::Arc;

/// Append and replay for the per-conversation message log. Every append
/// lands in the store first and is then fanned out on the event bus; the
/// bus is never the source of truth.
#[derive(Clone)]
pub struct MessageService {
    db: Database,
    event_bus: Arc<dyn EventBus>,
}

impl MessageService {
    pub fn new(db: Database, event_bus: Arc<dyn EventBus>) -> Self {
        Self { db, event_bus }
    }

    /// Agent reply into a conversation the agent currently owns. Ownership
    /// is checked so a console that lost the claim (resolve-then-reopen,
    /// or a release it forgot about) cannot write into someone else's
    /// conversation.
    pub async fn send_agent_message(
        &self,
        conversation_id: &str,
        agent_id: &str,
        body: &str,
    ) -> ApiResult<Message> {
        Message::validate_body(body).map_err(ApiError::BadRequest)?;

        let conversation = self
            .db
            .get_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Conversation {} not found", conversation_id))
            })?;

        if !conversation.is_claimed_by(agent_id) {
            return Err(ApiError::Forbidden(format!(
                "Conversation {} is not claimed by agent {}",
                conversation_id, agent_id
            )));
        }

        let appended = self
            .db
            .append_message(conversation_id, SenderRole::Agent, body)
            .await?;

        self.publish_appended(&appended.message).await?;

        tracing::info!(
            "Agent message appended: id={}, conversation_id={}, seq={}",
            appended.message.id,
            conversation_id,
            appended.message.seq
        );

        Ok(appended.message)
    }

    /// Append on behalf of the router (customer and assistant turns). The
    /// reopen flag from the store propagates so the router can emit the
    /// matching queue change.
    pub(crate) async fn append_and_publish(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        body: &str,
    ) -> ApiResult<(Message, bool)> {
        let appended = self
            .db
            .append_message(conversation_id, sender_role, body)
            .await?;

        self.publish_appended(&appended.message).await?;

        Ok((appended.message, appended.reopened))
    }

    /// Replay messages after a cursor, in append order. `after_seq = 0`
    /// replays everything; this is the reconciliation path after an SSE
    /// reconnect.
    pub async fn list_since(
        &self,
        conversation_id: &str,
        after_seq: i64,
    ) -> ApiResult<Vec<Message>> {
        // Distinguish an unknown conversation from an empty log.
        self.db
            .get_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Conversation {} not found", conversation_id))
            })?;

        self.db.list_messages_since(conversation_id, after_seq).await
    }

    async fn publish_appended(&self, message: &Message) -> ApiResult<()> {
        self.event_bus.publish(SystemEvent::MessageAppended {
            conversation_id: message.conversation_id.clone(),
            message: message.clone(),
        })?;

        // last_message/updated_at moved, so queue views need a refresh too.
        if let Some(conversation) = self
            .db
            .get_conversation_by_id(&message.conversation_id)
            .await?
        {
            self.event_bus.publish(SystemEvent::ConversationChanged {
                conversation_id: conversation.id,
                customer_id: conversation.customer_id,
                status: conversation.status,
                assigned_agent_id: conversation.assigned_agent_id,
                last_message: conversation.last_message,
                updated_at: conversation.updated_at,
            })?;
        }

        Ok(())
    }
}
