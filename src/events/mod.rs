use crate::models::{ConversationStatus, Message};
use serde::Serialize;
use tokio::sync::broadcast;

/// Change notifications fanned out to every live subscriber: customer
/// clients, agent consoles, and the queue view. Delivery is at-least-once
/// and only ordered within a single conversation's message events;
/// subscribers dedup by message id and reconcile through the pull APIs
/// after a reconnect.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemEvent {
    MessageAppended {
        conversation_id: String,
        message: Message,
    },
    ConversationChanged {
        conversation_id: String,
        customer_id: String,
        status: ConversationStatus,
        assigned_agent_id: Option<String>,
        last_message: Option<String>,
        updated_at: String, // ISO 8601
    },
}

use crate::ApiResult;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<SystemEvent, BroadcastStreamRecvError>> + Send>>;

/// Event bus trait for publishing and subscribing to system events
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to all subscribers
    fn publish(&self, event: SystemEvent) -> ApiResult<()>;

    /// Subscribe to events
    fn subscribe(&self) -> EventStream;
}

/// Local in-memory implementation of EventBus
#[derive(Clone)]
pub struct LocalEventBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl LocalEventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    fn publish(&self, event: SystemEvent) -> ApiResult<()> {
        // Fire-and-forget: the feed is a liveness optimization, not the
        // source of truth, so nobody listening is not a failure.
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No active subscribers for event: {}", e);
        }
        Ok(())
    }

    fn subscribe(&self) -> EventStream {
        let rx = self.tx.subscribe();
        Box::pin(BroadcastStream::new(rx))
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
