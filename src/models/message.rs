use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Customer,
    Assistant,
    Agent,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Customer => "customer",
            SenderRole::Assistant => "assistant",
            SenderRole::Agent => "agent",
        }
    }
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for SenderRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "assistant" => SenderRole::Assistant,
            "agent" => SenderRole::Agent,
            _ => SenderRole::Customer,
        }
    }
}

/// One message in a conversation's append-only log.
///
/// `seq` is assigned at insert time and is strictly increasing within a
/// conversation; it doubles as the replay cursor for `list_messages_since`.
/// Messages are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_role: SenderRole,
    pub body: String,
    pub seq: i64,
    pub created_at: String,
}

impl Message {
    /// Validate message content before it reaches the log.
    pub fn validate_body(body: &str) -> Result<(), String> {
        if body.trim().is_empty() {
            return Err("Message body cannot be empty".to_string());
        }
        if body.len() > 10_000 {
            return Err("Message body exceeds maximum length of 10000 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
}

/// Response to a customer turn: the persisted customer message plus, when
/// the automated assistant handled it, the assistant's reply.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerTurnResponse {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}
