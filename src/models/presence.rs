use serde::{Deserialize, Serialize};

/// Liveness record for one agent console. This is a routing hint only: it
/// decides which status notice a customer sees, never whether a claim or
/// resolve succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPresence {
    pub agent_id: String,
    pub last_seen_at: String, // ISO8601 string from DB
}

#[derive(Debug, Clone, Serialize)]
pub struct OnlineResponse {
    pub online: bool,
}
