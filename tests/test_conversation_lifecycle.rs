mod helpers;

use helpers::test_db::setup_test_db;
use std::sync::Arc;
use supportline::database::Database;
use supportline::events::LocalEventBus;
use supportline::models::{ClaimOutcome, ConversationStatus, ResolveOutcome, SenderRole};
use supportline::services::ClaimService;

fn claim_service(db: &Database) -> ClaimService {
    ClaimService::new(db.clone(), Arc::new(LocalEventBus::new(100)))
}

#[tokio::test]
async fn test_upsert_is_idempotent_per_customer() {
    let db = setup_test_db().await;

    let first = db.upsert_conversation("cust-1").await.unwrap();
    let second = db.upsert_conversation("cust-1").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.status, ConversationStatus::Open);
    assert!(first.assigned_agent_id.is_none());
}

#[tokio::test]
async fn test_resolve_clears_assignment() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    service.claim(&conversation.id, "agent-a").await.unwrap();
    let outcome = service.resolve(&conversation.id, "agent-a").await.unwrap();

    match outcome {
        ResolveOutcome::Resolved { conversation } => {
            assert_eq!(conversation.status, ConversationStatus::Resolved);
            assert!(conversation.assigned_agent_id.is_none());
            assert!(conversation.resolved_at.is_some());
        }
        ResolveOutcome::NotOwner => panic!("owner resolve must succeed"),
    }
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    service.claim(&conversation.id, "agent-a").await.unwrap();
    service.resolve(&conversation.id, "agent-a").await.unwrap();

    // Second resolve reports success without changing anything
    let again = service.resolve(&conversation.id, "agent-a").await.unwrap();
    assert!(matches!(again, ResolveOutcome::Resolved { .. }));
}

#[tokio::test]
async fn test_resolve_by_non_owner_is_rejected() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    service.claim(&conversation.id, "agent-a").await.unwrap();
    let outcome = service.resolve(&conversation.id, "agent-b").await.unwrap();
    assert!(matches!(outcome, ResolveOutcome::NotOwner));

    let current = db
        .get_conversation_by_id(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ConversationStatus::Open);
    assert_eq!(current.assigned_agent_id.as_deref(), Some("agent-a"));
}

#[tokio::test]
async fn test_unassigned_open_conversation_can_be_resolved() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    // Abandoned queue entry, nobody ever claimed it
    let outcome = service.resolve(&conversation.id, "agent-a").await.unwrap();
    assert!(matches!(outcome, ResolveOutcome::Resolved { .. }));
}

#[tokio::test]
async fn test_resolved_conversation_cannot_be_claimed() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    service.claim(&conversation.id, "agent-a").await.unwrap();
    service.resolve(&conversation.id, "agent-a").await.unwrap();

    let outcome = service.claim(&conversation.id, "agent-b").await.unwrap();
    match outcome {
        ClaimOutcome::AlreadyClaimed { assigned_agent_id } => {
            assert!(assigned_agent_id.is_none());
        }
        ClaimOutcome::Claimed { .. } => panic!("resolved conversation must not be claimable"),
    }
}

#[tokio::test]
async fn test_customer_message_reopens_resolved_conversation() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    service.claim(&conversation.id, "agent-a").await.unwrap();
    service.resolve(&conversation.id, "agent-a").await.unwrap();

    let appended = db
        .append_message(&conversation.id, SenderRole::Customer, "ainda tenho um problema")
        .await
        .unwrap();
    assert!(appended.reopened);

    let current = db
        .get_conversation_by_id(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ConversationStatus::Open);
    assert!(current.assigned_agent_id.is_none());
    assert!(current.resolved_at.is_none());

    // Back in the unclaimed pool, so anyone can claim again
    let outcome = service.claim(&conversation.id, "agent-b").await.unwrap();
    assert!(matches!(outcome, ClaimOutcome::Claimed { .. }));
}

#[tokio::test]
async fn test_agent_and_assistant_messages_do_not_reopen() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    service.claim(&conversation.id, "agent-a").await.unwrap();
    service.resolve(&conversation.id, "agent-a").await.unwrap();

    let appended = db
        .append_message(&conversation.id, SenderRole::Assistant, "closing note")
        .await
        .unwrap();
    assert!(!appended.reopened);

    let current = db
        .get_conversation_by_id(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ConversationStatus::Resolved);
}

#[tokio::test]
async fn test_resolved_conversations_leave_the_queue() {
    let db = setup_test_db().await;
    let service = claim_service(&db);
    let conversation = db.upsert_conversation("cust-1").await.unwrap();

    service.claim(&conversation.id, "agent-a").await.unwrap();
    service.resolve(&conversation.id, "agent-a").await.unwrap();

    let queue = service.queue("agent-a").await.unwrap();
    assert!(queue.iter().all(|c| c.id != conversation.id));
}
