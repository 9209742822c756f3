pub mod claim_service;
pub mod message_service;
pub mod presence_service;
pub mod responder;

pub use claim_service::ClaimService;
pub use message_service::MessageService;
pub use presence_service::PresenceService;
pub use responder::{
    AssistantResponder, DisabledResponder, HttpAssistantResponder, ResponderRouter, FALLBACK_REPLY,
};
