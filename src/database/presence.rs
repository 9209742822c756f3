use crate::api::middleware::error::ApiResult;
use crate::database::{now_rfc3339, Database};
use crate::models::AgentPresence;

use sqlx::Row;

impl Database {
    /// Record that an agent console is alive right now.
    pub async fn record_heartbeat(&self, agent_id: &str) -> ApiResult<()> {
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO agent_presence (agent_id, last_seen_at)
             VALUES (?, ?)
             ON CONFLICT (agent_id) DO UPDATE SET last_seen_at = excluded.last_seen_at",
        )
        .bind(agent_id)
        .bind(&now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Number of agents whose heartbeat falls inside the staleness window.
    /// RFC 3339 timestamps in UTC compare correctly as text.
    pub async fn count_agents_online(&self, window_secs: i64) -> ApiResult<i64> {
        let cutoff = (time::OffsetDateTime::now_utc() - time::Duration::seconds(window_secs))
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap();

        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM agent_presence WHERE last_seen_at > ?",
        )
        .bind(&cutoff)
        .fetch_one(self.pool())
        .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    pub async fn get_presence(&self, agent_id: &str) -> ApiResult<Option<AgentPresence>> {
        let row = sqlx::query(
            "SELECT agent_id, last_seen_at FROM agent_presence WHERE agent_id = ?",
        )
        .bind(agent_id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(AgentPresence {
                agent_id: row.try_get("agent_id")?,
                last_seen_at: row.try_get("last_seen_at")?,
            })),
            None => Ok(None),
        }
    }
}
