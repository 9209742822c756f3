pub mod agents;
pub mod conversations;
pub mod messages;
pub mod middleware;
pub mod streams;

pub use middleware::*;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Customer-facing routes: no agent identity involved
        .route(
            "/api/customers/:customer_id/messages",
            post(messages::customer_send_message),
        )
        .route(
            "/api/customers/:customer_id/request-human",
            post(messages::request_human),
        )
        .route(
            "/api/customers/:customer_id/conversation",
            get(messages::get_customer_conversation),
        )
        .route("/api/agents/online", get(agents::agents_online))
        // Agent console routes: identity comes from the X-Agent-Id header
        .route("/api/conversations/queue", get(conversations::get_queue))
        .route(
            "/api/conversations/:id/claim",
            post(conversations::claim_conversation),
        )
        .route(
            "/api/conversations/:id/release",
            post(conversations::release_conversation),
        )
        .route(
            "/api/conversations/:id/resolve",
            post(conversations::resolve_conversation),
        )
        .route(
            "/api/conversations/:id/messages",
            get(messages::list_messages).post(messages::agent_send_message),
        )
        .route("/api/agents/heartbeat", post(agents::heartbeat))
        // Live feeds, used by customer clients and agent consoles alike
        .route(
            "/api/conversations/:id/stream",
            get(streams::conversation_stream),
        )
        .route("/api/queue/stream", get(streams::queue_stream))
        // Identity extraction doubles as the presence refresh for every
        // agent-identified request; requests without the header pass
        // through untouched.
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            agent_identity_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}
