use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Resolved,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationStatus::Open => write!(f, "open"),
            ConversationStatus::Resolved => write!(f, "resolved"),
        }
    }
}

// Convert from string (for SQLx)
impl From<String> for ConversationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "resolved" => ConversationStatus::Resolved,
            _ => ConversationStatus::Open,
        }
    }
}

/// One support conversation, tied 1:1 to a customer.
///
/// Invariant: `assigned_agent_id` is non-null only while `status` is Open,
/// and is only ever written through the conditional updates in
/// `Database::{claim,release,resolve}_conversation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub customer_id: String,
    pub status: ConversationStatus,
    pub assigned_agent_id: Option<String>,
    pub last_message: Option<String>,
    pub resolved_at: Option<String>, // ISO8601 string from DB
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn is_claimed(&self) -> bool {
        self.assigned_agent_id.is_some()
    }

    pub fn is_claimed_by(&self, agent_id: &str) -> bool {
        self.assigned_agent_id.as_deref() == Some(agent_id)
    }
}

/// Outcome of a claim attempt. Contention is an expected result, not an
/// error: the caller refreshes its queue and moves on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimOutcome {
    Claimed { conversation: Conversation },
    AlreadyClaimed { assigned_agent_id: Option<String> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Released { conversation: Conversation },
    NotOwner,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolveOutcome {
    Resolved { conversation: Conversation },
    NotOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueResponse {
    pub conversations: Vec<Conversation>,
}
