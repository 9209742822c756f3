use crate::api::middleware::error::{ApiError, ApiResult};
use crate::database::{now_rfc3339, Database};
use crate::models::{Conversation, ConversationStatus};

use sqlx::Row;

fn conversation_from_row(row: &sqlx::any::AnyRow) -> ApiResult<Conversation> {
    let status_str: String = row.try_get("status")?;
    Ok(Conversation {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        status: ConversationStatus::from(status_str),
        assigned_agent_id: row.try_get("assigned_agent_id").ok(),
        last_message: row.try_get("last_message").ok(),
        resolved_at: row.try_get("resolved_at").ok(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Database {
    /// Fetch the customer's conversation, creating it (Open, unassigned) if
    /// it does not exist. Creation is racy-safe: concurrent upserts for the
    /// same customer converge on the single existing row.
    pub async fn upsert_conversation(&self, customer_id: &str) -> ApiResult<Conversation> {
        let now = now_rfc3339();
        let conversation_id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO conversations (id, customer_id, status, created_at, updated_at)
             VALUES (?, ?, 'open', ?, ?)
             ON CONFLICT (customer_id) DO NOTHING",
        )
        .bind(&conversation_id)
        .bind(customer_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;

        self.get_conversation_by_customer(customer_id)
            .await?
            .ok_or_else(|| ApiError::Internal("Conversation missing after upsert".to_string()))
    }

    pub async fn get_conversation_by_id(&self, id: &str) -> ApiResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, assigned_agent_id, last_message,
                    resolved_at, created_at, updated_at
             FROM conversations
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(conversation_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_conversation_by_customer(
        &self,
        customer_id: &str,
    ) -> ApiResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, assigned_agent_id, last_message,
                    resolved_at, created_at, updated_at
             FROM conversations
             WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(conversation_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Open conversations visible to one agent's queue: unassigned ones plus
    /// the agent's own claims, newest activity first. Conversations claimed
    /// by a different agent are filtered out here, at read time, so the
    /// exclusivity boundary holds even for pure queries.
    pub async fn list_queue(&self, agent_id: &str) -> ApiResult<Vec<Conversation>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, status, assigned_agent_id, last_message,
                    resolved_at, created_at, updated_at
             FROM conversations
             WHERE status = 'open'
               AND (assigned_agent_id IS NULL OR assigned_agent_id = ?)
             ORDER BY updated_at DESC",
        )
        .bind(agent_id)
        .fetch_all(self.pool())
        .await?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in rows {
            conversations.push(conversation_from_row(&row)?);
        }
        Ok(conversations)
    }

    /// Atomic claim: take ownership only if nobody holds it and the
    /// conversation is still Open. Returns the number of rows updated; 1
    /// means the caller is now the exclusive owner, 0 means it lost the
    /// race (or the conversation is gone/resolved). This must stay a single
    /// conditional UPDATE, never a read-then-write pair.
    pub async fn claim_conversation(&self, id: &str, agent_id: &str) -> ApiResult<u64> {
        let now = now_rfc3339();

        let result = sqlx::query(
            "UPDATE conversations
             SET assigned_agent_id = ?, updated_at = ?
             WHERE id = ? AND assigned_agent_id IS NULL AND status = 'open'",
        )
        .bind(agent_id)
        .bind(&now)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Conditional release: clears the assignment only if this agent holds
    /// it, so a stale console cannot free a conversation that was already
    /// resolved and reclaimed by someone else.
    pub async fn release_conversation(&self, id: &str, agent_id: &str) -> ApiResult<u64> {
        let now = now_rfc3339();

        let result = sqlx::query(
            "UPDATE conversations
             SET assigned_agent_id = NULL, updated_at = ?
             WHERE id = ? AND assigned_agent_id = ?",
        )
        .bind(&now)
        .bind(id)
        .bind(agent_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Conditional resolve: terminal until the customer writes again. The
    /// guard admits the owning agent and also an unassigned-but-open
    /// conversation, so staff can clear abandoned queue entries.
    pub async fn resolve_conversation(&self, id: &str, agent_id: &str) -> ApiResult<u64> {
        let now = now_rfc3339();

        let result = sqlx::query(
            "UPDATE conversations
             SET status = 'resolved', assigned_agent_id = NULL, resolved_at = ?, updated_at = ?
             WHERE id = ? AND status = 'open'
               AND (assigned_agent_id = ? OR assigned_agent_id IS NULL)",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .bind(agent_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
