use crate::api::middleware::AppState;
use crate::events::SystemEvent;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::StreamExt as _;

fn to_sse_event(name: &'static str, event: &SystemEvent) -> Event {
    let json_data = serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize event: {}", e);
        "{}".to_string()
    });
    Event::default().event(name).data(json_data)
}

/// SSE feed for a single conversation: every appended message plus its
/// status/assignment changes. Delivery is best-effort; a client that sees
/// a gap (or reconnects) reconciles through `GET .../messages?after_seq=`.
pub async fn conversation_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("SSE stream opened for conversation {}", id);

    let stream = state.event_bus.subscribe().filter_map(move |item| {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                // Subscriber fell behind the broadcast buffer; dropped
                // events are recovered via the replay cursor, not here.
                tracing::warn!("Conversation stream lagged: {}", e);
                return None;
            }
        };

        match &event {
            SystemEvent::MessageAppended {
                conversation_id, ..
            } if *conversation_id == id => Some(Ok(to_sse_event("message", &event))),
            SystemEvent::ConversationChanged {
                conversation_id, ..
            } if *conversation_id == id => Some(Ok(to_sse_event("conversation", &event))),
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// SSE feed of queue-relevant changes across all conversations. Agent
/// consoles use it as a refresh hint and re-pull the queue endpoint for
/// the authoritative list.
pub async fn queue_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("SSE queue stream opened");

    let stream = state.event_bus.subscribe().filter_map(|item| {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Queue stream lagged: {}", e);
                return None;
            }
        };

        match &event {
            SystemEvent::ConversationChanged { .. } => {
                Some(Ok(to_sse_event("conversation", &event)))
            }
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
