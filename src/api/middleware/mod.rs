pub mod error;
pub mod identity;

pub use error::*;
pub use identity::*;

use crate::database::Database;
use crate::events::EventBus;
use crate::services::{ClaimService, MessageService, PresenceService, ResponderRouter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub event_bus: Arc<dyn EventBus>,
    pub claim_service: ClaimService,
    pub message_service: MessageService,
    pub presence_service: PresenceService,
    pub responder_router: ResponderRouter,
}
