use crate::api::middleware::AppState;
use crate::config::Config;
use crate::database::Database;
use crate::events::{EventBus, LocalEventBus};
use crate::services::{
    AssistantResponder, ClaimService, DisabledResponder, HttpAssistantResponder, MessageService,
    PresenceService, ResponderRouter,
};
use std::sync::Arc;
use std::time::Duration;

pub fn build_app_state(
    db: Database,
    config: &Config,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let event_bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::new(config.event_bus_capacity));
    tracing::info!(
        "Event bus initialized with capacity {}",
        config.event_bus_capacity
    );

    let claim_service = ClaimService::new(db.clone(), event_bus.clone());
    let message_service = MessageService::new(db.clone(), event_bus.clone());
    let presence_service = PresenceService::new(db.clone(), config.presence_window_secs);

    let assistant_timeout = Duration::from_secs(config.assistant_timeout_secs);
    let responder: Arc<dyn AssistantResponder> = match &config.assistant_endpoint {
        Some(endpoint) => {
            tracing::info!("Assistant responder configured: {}", endpoint);
            Arc::new(HttpAssistantResponder::new(
                endpoint.clone(),
                assistant_timeout,
            )?)
        }
        None => {
            tracing::warn!(
                "No assistant endpoint configured, assistant turns will use the fallback reply"
            );
            Arc::new(DisabledResponder)
        }
    };

    let responder_router = ResponderRouter::new(
        db.clone(),
        message_service.clone(),
        presence_service.clone(),
        responder,
        assistant_timeout,
    );

    Ok(AppState {
        db,
        event_bus,
        claim_service,
        message_service,
        presence_service,
        responder_router,
    })
}
