mod helpers;

use async_trait::async_trait;
use helpers::test_db::setup_test_db;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use supportline::api::middleware::error::{ApiError, ApiResult};
use supportline::database::Database;
use supportline::events::LocalEventBus;
use supportline::models::{ConversationStatus, Message, SenderRole};
use supportline::services::{
    AssistantResponder, ClaimService, MessageService, PresenceService, ResponderRouter,
    FALLBACK_REPLY,
};

struct CannedResponder {
    reply: String,
    calls: AtomicUsize,
}

impl CannedResponder {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AssistantResponder for CannedResponder {
    async fn generate(&self, _history: &[Message], _system_prompt: &str) -> ApiResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

struct FailingResponder;

#[async_trait]
impl AssistantResponder for FailingResponder {
    async fn generate(&self, _history: &[Message], _system_prompt: &str) -> ApiResult<String> {
        Err(ApiError::Unavailable("model endpoint down".to_string()))
    }
}

struct StuckResponder;

#[async_trait]
impl AssistantResponder for StuckResponder {
    async fn generate(&self, _history: &[Message], _system_prompt: &str) -> ApiResult<String> {
        tokio::time::sleep(Duration::from_secs(300)).await;
        Ok("too late".to_string())
    }
}

fn build_router_with(
    db: &Database,
    responder: Arc<dyn AssistantResponder>,
    timeout: Duration,
) -> ResponderRouter {
    let event_bus = Arc::new(LocalEventBus::new(100));
    let message_service = MessageService::new(db.clone(), event_bus);
    let presence_service = PresenceService::new(db.clone(), 120);
    ResponderRouter::new(
        db.clone(),
        message_service,
        presence_service,
        responder,
        timeout,
    )
}

#[tokio::test]
async fn test_first_contact_creates_conversation_and_gets_assistant_reply() {
    let db = setup_test_db().await;
    let router = build_router_with(
        &db,
        CannedResponder::new("Claro, posso ajudar com as horas."),
        Duration::from_secs(5),
    );

    let response = router
        .handle_customer_message("cust-1", "como corrijo minhas horas?")
        .await
        .unwrap();

    assert_eq!(response.messages.len(), 2);
    assert_eq!(response.messages[0].sender_role, SenderRole::Customer);
    assert_eq!(response.messages[1].sender_role, SenderRole::Assistant);
    assert_eq!(response.messages[1].body, "Claro, posso ajudar com as horas.");

    let stored = db
        .list_messages_since(&response.conversation_id, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_failing_assistant_falls_back_and_keeps_customer_message() {
    let db = setup_test_db().await;
    let router = build_router_with(&db, Arc::new(FailingResponder), Duration::from_secs(5));

    let response = router
        .handle_customer_message("cust-1", "socorro")
        .await
        .unwrap();

    assert_eq!(response.messages.len(), 2);
    assert_eq!(response.messages[1].body, FALLBACK_REPLY);

    // The customer message was persisted exactly once, before the
    // assistant ever ran
    let stored = db
        .list_messages_since(&response.conversation_id, 0)
        .await
        .unwrap();
    let customer_turns: Vec<_> = stored
        .iter()
        .filter(|m| m.sender_role == SenderRole::Customer)
        .collect();
    assert_eq!(customer_turns.len(), 1);
    assert_eq!(customer_turns[0].body, "socorro");
}

#[tokio::test]
async fn test_stuck_assistant_times_out_to_fallback() {
    let db = setup_test_db().await;
    let router = build_router_with(&db, Arc::new(StuckResponder), Duration::from_millis(50));

    let response = router
        .handle_customer_message("cust-1", "alguem ai?")
        .await
        .unwrap();

    assert_eq!(response.messages.len(), 2);
    assert_eq!(response.messages[1].body, FALLBACK_REPLY);
}

#[tokio::test]
async fn test_claimed_conversation_is_persist_only() {
    let db = setup_test_db().await;
    let responder = CannedResponder::new("should never be used");
    let router = build_router_with(&db, responder.clone(), Duration::from_secs(5));

    let conversation = db.upsert_conversation("cust-1").await.unwrap();
    db.claim_conversation(&conversation.id, "agent-a")
        .await
        .unwrap();

    let response = router
        .handle_customer_message("cust-1", "obrigado pela ajuda")
        .await
        .unwrap();

    // Only the customer turn; the human owns the reply
    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].sender_role, SenderRole::Customer);
    assert_eq!(responder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_human_with_no_agents_online() {
    let db = setup_test_db().await;
    let router = build_router_with(
        &db,
        CannedResponder::new("unused"),
        Duration::from_secs(5),
    );

    let conversation = router.request_human("cust-1").await.unwrap();
    assert_eq!(conversation.status, ConversationStatus::Open);
    assert!(conversation.assigned_agent_id.is_none());

    let messages = db.list_messages_since(&conversation.id, 0).await.unwrap();
    let notice = messages
        .iter()
        .rev()
        .find(|m| m.sender_role == SenderRole::Assistant)
        .expect("request-human appends an assistant notice");
    assert!(notice.body.contains("No agents are online"));
}

#[tokio::test]
async fn test_request_human_with_agent_online() {
    let db = setup_test_db().await;
    let router = build_router_with(
        &db,
        CannedResponder::new("unused"),
        Duration::from_secs(5),
    );

    db.record_heartbeat("agent-a").await.unwrap();

    let conversation = router.request_human("cust-1").await.unwrap();
    let messages = db.list_messages_since(&conversation.id, 0).await.unwrap();
    let notice = messages
        .iter()
        .rev()
        .find(|m| m.sender_role == SenderRole::Assistant)
        .expect("request-human appends an assistant notice");
    assert!(notice.body.contains("Connecting you"));
}

#[tokio::test]
async fn test_request_human_reopens_resolved_conversation() {
    let db = setup_test_db().await;
    let router = build_router_with(
        &db,
        CannedResponder::new("unused"),
        Duration::from_secs(5),
    );
    let claim_service = ClaimService::new(db.clone(), Arc::new(LocalEventBus::new(100)));

    let conversation = db.upsert_conversation("cust-1").await.unwrap();
    claim_service.claim(&conversation.id, "agent-a").await.unwrap();
    claim_service
        .resolve(&conversation.id, "agent-a")
        .await
        .unwrap();

    let reopened = router.request_human("cust-1").await.unwrap();
    assert_eq!(reopened.id, conversation.id);
    assert_eq!(reopened.status, ConversationStatus::Open);
    assert!(reopened.assigned_agent_id.is_none());
}

#[tokio::test]
async fn test_request_human_keeps_live_assignment() {
    let db = setup_test_db().await;
    let router = build_router_with(
        &db,
        CannedResponder::new("unused"),
        Duration::from_secs(5),
    );

    let conversation = db.upsert_conversation("cust-1").await.unwrap();
    db.claim_conversation(&conversation.id, "agent-a")
        .await
        .unwrap();

    let current = router.request_human("cust-1").await.unwrap();
    assert_eq!(current.assigned_agent_id.as_deref(), Some("agent-a"));
}

// Full first-contact-to-reopen walkthrough: assistant fails over to the
// fallback, the customer escalates, an agent claims, replies, resolves,
// and a later customer message reopens the conversation unassigned.
#[tokio::test]
async fn test_full_escalation_walkthrough() {
    let db = setup_test_db().await;
    let event_bus = Arc::new(LocalEventBus::new(100));
    let message_service = MessageService::new(db.clone(), event_bus.clone());
    let claim_service = ClaimService::new(db.clone(), event_bus.clone());
    let router = ResponderRouter::new(
        db.clone(),
        message_service.clone(),
        PresenceService::new(db.clone(), 120),
        Arc::new(FailingResponder),
        Duration::from_secs(5),
    );

    // Customer writes, assistant is down, fallback lands
    let turn = router
        .handle_customer_message("maria", "minhas horas de ontem sumiram")
        .await
        .unwrap();
    assert_eq!(turn.messages[1].body, FALLBACK_REPLY);
    let conversation_id = turn.conversation_id.clone();

    // Customer escalates; an agent is on shift
    db.record_heartbeat("agent-a").await.unwrap();
    router.request_human("maria").await.unwrap();

    // Agent claims and replies
    let claimed = claim_service.claim(&conversation_id, "agent-a").await.unwrap();
    assert!(matches!(
        claimed,
        supportline::models::ClaimOutcome::Claimed { .. }
    ));
    message_service
        .send_agent_message(&conversation_id, "agent-a", "ja restaurei suas horas")
        .await
        .unwrap();

    // Further customer messages go to the human, not the assistant
    let while_claimed = router
        .handle_customer_message("maria", "obrigada!")
        .await
        .unwrap();
    assert_eq!(while_claimed.messages.len(), 1);

    // Resolve, then a new customer message reopens unassigned
    claim_service
        .resolve(&conversation_id, "agent-a")
        .await
        .unwrap();
    let after_resolve = router
        .handle_customer_message("maria", "na verdade ainda falta uma hora")
        .await
        .unwrap();
    assert_eq!(after_resolve.conversation_id, conversation_id);

    let current = db
        .get_conversation_by_id(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ConversationStatus::Open);
    assert!(current.assigned_agent_id.is_none());

    // Unclaimed again, so the assistant (still down) answered with the
    // fallback
    assert_eq!(after_resolve.messages.len(), 2);
    assert_eq!(after_resolve.messages[1].body, FALLBACK_REPLY);

    // The whole history is replayable in order
    let history = db.list_messages_since(&conversation_id, 0).await.unwrap();
    let seqs: Vec<i64> = history.iter().map(|m| m.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort_unstable();
    assert_eq!(seqs, sorted);
}
