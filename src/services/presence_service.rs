use crate::api::middleware::error::ApiResult;
use crate::database::Database;

/// Liveness over agent heartbeats. Purely a UX routing hint ("connecting
/// you now" vs "message queued"); claim correctness never depends on it.
#[derive(Clone)]
pub struct PresenceService {
    db: Database,
    window_secs: i64,
}

impl PresenceService {
    pub fn new(db: Database, window_secs: i64) -> Self {
        Self { db, window_secs }
    }

    pub async fn heartbeat(&self, agent_id: &str) -> ApiResult<()> {
        self.db.record_heartbeat(agent_id).await
    }

    /// True iff at least one agent heartbeat falls inside the staleness
    /// window (default 2 minutes; clients beat roughly every 30 seconds).
    pub async fn any_agent_online(&self) -> ApiResult<bool> {
        let count = self.db.count_agents_online(self.window_secs).await?;
        Ok(count > 0)
    }
}
