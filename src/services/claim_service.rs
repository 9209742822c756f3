use crate::{
    api::middleware::error::{ApiError, ApiResult},
    database::Database,
    events::{EventBus, SystemEvent},
    models::{ClaimOutcome, Conversation, ConversationStatus, ReleaseOutcome, ResolveOutcome},
};
use std::sync::Arc;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAYS_MS: [u64; 3] = [50, 100, 200]; // Exponential backoff

/// Arbitration over conversation ownership. Every mutation here is a single
/// conditional UPDATE at the storage layer; this service adds the typed
/// outcomes, the bounded retry on transient storage failure, and the change
/// events the queue views listen for.
#[derive(Clone)]
pub struct ClaimService {
    db: Database,
    event_bus: Arc<dyn EventBus>,
}

impl ClaimService {
    pub fn new(db: Database, event_bus: Arc<dyn EventBus>) -> Self {
        Self { db, event_bus }
    }

    /// Attempt to take exclusive ownership of a conversation.
    ///
    /// At most one concurrent caller wins; everyone else gets
    /// `AlreadyClaimed` and should re-fetch the queue. Losing the race is
    /// expected and non-fatal.
    pub async fn claim(&self, conversation_id: &str, agent_id: &str) -> ApiResult<ClaimOutcome> {
        let rows = self
            .with_retry(|| self.db.claim_conversation(conversation_id, agent_id))
            .await?;

        if rows == 0 {
            // Lost the race, or the conversation is resolved/missing.
            // Re-read only to report who holds it; correctness came from
            // the conditional update above.
            let current = self
                .db
                .get_conversation_by_id(conversation_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Conversation {} not found", conversation_id))
                })?;

            tracing::info!(
                "Claim conflict: conversation {} requested by {} is held by {:?} (status {})",
                conversation_id,
                agent_id,
                current.assigned_agent_id,
                current.status
            );

            return Ok(ClaimOutcome::AlreadyClaimed {
                assigned_agent_id: current.assigned_agent_id,
            });
        }

        let conversation = self.reload(conversation_id).await?;
        self.publish_change(&conversation);

        tracing::info!(
            "Conversation {} claimed by agent {}",
            conversation_id,
            agent_id
        );

        Ok(ClaimOutcome::Claimed { conversation })
    }

    /// Return a claimed conversation to the unclaimed pool. Only the owner
    /// can release; anyone else gets a soft `NotOwner`, logged for audit.
    pub async fn release(
        &self,
        conversation_id: &str,
        agent_id: &str,
    ) -> ApiResult<ReleaseOutcome> {
        let rows = self
            .with_retry(|| self.db.release_conversation(conversation_id, agent_id))
            .await?;

        if rows == 0 {
            tracing::warn!(
                "Release by non-owner: agent {} does not hold conversation {}",
                agent_id,
                conversation_id
            );
            return Ok(ReleaseOutcome::NotOwner);
        }

        let conversation = self.reload(conversation_id).await?;
        self.publish_change(&conversation);

        tracing::info!(
            "Conversation {} released by agent {}",
            conversation_id,
            agent_id
        );

        Ok(ReleaseOutcome::Released { conversation })
    }

    /// Mark a conversation resolved. Allowed for the owning agent and for
    /// unassigned-but-open conversations (abandoned queue entries).
    /// Resolving twice is an idempotent no-op, reported as Resolved.
    pub async fn resolve(
        &self,
        conversation_id: &str,
        agent_id: &str,
    ) -> ApiResult<ResolveOutcome> {
        let rows = self
            .with_retry(|| self.db.resolve_conversation(conversation_id, agent_id))
            .await?;

        if rows == 0 {
            // No update happened: the id may be unknown, already resolved,
            // or held by someone else. Re-read to tell them apart.
            let conversation = self
                .db
                .get_conversation_by_id(conversation_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Conversation {} not found", conversation_id))
                })?;

            if conversation.status == ConversationStatus::Resolved {
                // Second resolve of the same conversation: no-op, still a
                // success for the caller.
                return Ok(ResolveOutcome::Resolved { conversation });
            }

            tracing::warn!(
                "Resolve by non-owner: agent {} does not hold conversation {} (held by {:?})",
                agent_id,
                conversation_id,
                conversation.assigned_agent_id
            );
            return Ok(ResolveOutcome::NotOwner);
        }

        let conversation = self.reload(conversation_id).await?;
        self.publish_change(&conversation);

        tracing::info!(
            "Conversation {} resolved by agent {}",
            conversation_id,
            agent_id
        );

        Ok(ResolveOutcome::Resolved { conversation })
    }

    /// Open conversations visible to this agent: unassigned plus its own
    /// claims, newest first.
    pub async fn queue(&self, agent_id: &str) -> ApiResult<Vec<Conversation>> {
        self.db.list_queue(agent_id).await
    }

    fn publish_change(&self, conversation: &Conversation) {
        let _ = self.event_bus.publish(SystemEvent::ConversationChanged {
            conversation_id: conversation.id.clone(),
            customer_id: conversation.customer_id.clone(),
            status: conversation.status,
            assigned_agent_id: conversation.assigned_agent_id.clone(),
            last_message: conversation.last_message.clone(),
            updated_at: conversation.updated_at.clone(),
        });
    }

    async fn reload(&self, conversation_id: &str) -> ApiResult<Conversation> {
        self.db
            .get_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal("Conversation disappeared after update".to_string())
            })
    }

    /// Bounded retry for transient storage failures only. Conflicts and
    /// ownership mismatches are never retried; they are outcomes, not
    /// errors.
    async fn with_retry<F, Fut, T>(&self, mut op: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ApiResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(ApiError::Unavailable(msg)) if attempt < MAX_RETRIES => {
                    let delay_ms = RETRY_DELAYS_MS[attempt as usize];
                    tracing::info!(
                        "Storage unavailable on attempt {} ({}), retrying in {}ms",
                        attempt + 1,
                        msg,
                        delay_ms
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
