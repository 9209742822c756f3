use crate::api::middleware::error::{ApiError, ApiResult};
use crate::database::{now_rfc3339, Database};
use crate::models::{Message, SenderRole};

use sqlx::Row;

// Retries for seq collisions between concurrent appenders, see
// append_message.
const SEQ_RETRY_ATTEMPTS: u32 = 3;

/// Result of one append: the stored message, plus whether the insert
/// reopened a Resolved conversation.
#[derive(Debug)]
pub struct AppendResult {
    pub message: Message,
    pub reopened: bool,
}

impl Database {
    /// Append one message to a conversation's log.
    ///
    /// The per-conversation `seq` is assigned inside the INSERT itself
    /// (MAX+1 subselect), so ordering holds under concurrent writers
    /// without an application-side counter. SQLite serializes the writers
    /// outright; on Postgres two concurrent appends can read the same MAX
    /// and the loser trips `UNIQUE(conversation_id, seq)`, so that
    /// collision is retried here with a fresh transaction rather than
    /// surfacing as a failed send. A customer message landing on a
    /// Resolved conversation flips it back to Open and unassigned in the
    /// same transaction; that reopen is the store-level trigger, not part
    /// of the claim path.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        body: &str,
    ) -> ApiResult<AppendResult> {
        let mut attempt: u32 = 0;
        loop {
            match self
                .try_append_message(conversation_id, sender_role, body)
                .await
            {
                Err(ApiError::Conflict(msg)) if attempt < SEQ_RETRY_ATTEMPTS => {
                    tracing::debug!(
                        "Seq collision on conversation {} (attempt {}): {}",
                        conversation_id,
                        attempt + 1,
                        msg
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_append_message(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        body: &str,
    ) -> ApiResult<AppendResult> {
        let now = now_rfc3339();
        let message_id = uuid::Uuid::new_v4().to_string();

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_role, body, seq, created_at)
             VALUES (?, ?, ?, ?,
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_id = ?),
                     ?)",
        )
        .bind(&message_id)
        .bind(conversation_id)
        .bind(sender_role.as_str())
        .bind(body)
        .bind(conversation_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        // Reopen on new customer activity: Resolved -> Open, back to the
        // unclaimed pool.
        let mut reopened = false;
        if sender_role == SenderRole::Customer {
            let result = sqlx::query(
                "UPDATE conversations
                 SET status = 'open', assigned_agent_id = NULL, resolved_at = NULL, updated_at = ?
                 WHERE id = ? AND status = 'resolved'",
            )
            .bind(&now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
            reopened = result.rows_affected() > 0;
        }

        // Denormalized queue preview
        sqlx::query(
            "UPDATE conversations
             SET last_message = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(body)
        .bind(&now)
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT seq FROM messages WHERE id = ?")
            .bind(&message_id)
            .fetch_one(&mut *tx)
            .await?;
        let seq: i64 = row.try_get("seq")?;

        tx.commit().await?;

        Ok(AppendResult {
            message: Message {
                id: message_id,
                conversation_id: conversation_id.to_string(),
                sender_role,
                body: body.to_string(),
                seq,
                created_at: now,
            },
            reopened,
        })
    }

    /// Messages with `seq` strictly greater than the cursor, in append
    /// order. `after_seq = 0` replays the whole conversation. Used for
    /// catch-up after reconnect; the live feed is only an optimization on
    /// top of this.
    pub async fn list_messages_since(
        &self,
        conversation_id: &str,
        after_seq: i64,
    ) -> ApiResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_role, body, seq, created_at
             FROM messages
             WHERE conversation_id = ? AND seq > ?
             ORDER BY seq ASC",
        )
        .bind(conversation_id)
        .bind(after_seq)
        .fetch_all(self.pool())
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let sender_role_str: String = row.try_get("sender_role")?;
            messages.push(Message {
                id: row.try_get("id")?,
                conversation_id: row.try_get("conversation_id")?,
                sender_role: SenderRole::from(sender_role_str),
                body: row.try_get("body")?,
                seq: row.try_get("seq")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(messages)
    }

    pub async fn count_messages(&self, conversation_id: &str) -> ApiResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(self.pool())
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}
