//! End-to-end conversations against the in-memory sample store.

use std::sync::Arc;

use tunedesk::{Container, ContainerConfig, ConversationPhase, Intent, SessionManager, TurnOutcome};

async fn setup() -> (Container, Arc<SessionManager>) {
    let container = Container::new(ContainerConfig::in_memory())
        .await
        .expect("Failed to build container");
    let sessions = container.session_manager();
    (container, sessions)
}

/// Sends one message and checks the stored session is consistent afterwards.
async fn say(sessions: &SessionManager, session: &str, message: &str) -> TurnOutcome {
    let outcome = sessions.handle(session, message).await;
    let state = sessions.snapshot(session).await.expect("session exists");
    assert!(
        state.invariant_holds(),
        "inconsistent session after {:?}: {:?}",
        message,
        state
    );
    outcome
}

#[tokio::test]
async fn test_greeting_shows_the_menu() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let outcome = say(&sessions, &id, "hello").await;

    assert_eq!(outcome.intent, Some(Intent::General));
    assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);
    assert!(outcome.reply.contains("Process refunds"));
}

#[tokio::test]
async fn test_invoice_refund_completes_in_one_turn() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let outcome = say(&sessions, &id, "I want a refund for invoice #256").await;

    assert!(outcome.committed);
    assert_eq!(outcome.intent, Some(Intent::Refund));
    assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);
    assert!(outcome.reply.contains("$3.96"), "reply was: {}", outcome.reply);

    let state = sessions.snapshot(&id).await.unwrap();
    assert_eq!(state.pending_intent(), None);
    assert!(state.collected_fields().is_empty());
}

#[tokio::test]
async fn test_refunding_twice_reports_already_refunded() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    say(&sessions, &id, "I want a refund for invoice #256").await;
    let second = say(&sessions, &id, "Please refund invoice 256").await;

    assert!(second.reply.contains("already refunded"), "reply was: {}", second.reply);
    assert!(!second.reply.contains("$3.96"));
    assert_eq!(second.phase, ConversationPhase::AwaitingIntent);
}

#[tokio::test]
async fn test_refund_collects_details_then_confirms() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let first = say(&sessions, &id, "I need a refund").await;
    assert_eq!(first.phase, ConversationPhase::CollectingRefundInfo);
    assert!(first.reply.contains("full name and phone number"));

    let second = say(&sessions, &id, "Aaron Mitchell, +1 204 452 6452").await;
    assert_eq!(second.phase, ConversationPhase::ConfirmingRefund);
    assert!(second.reply.contains("Aaron Mitchell"));
    let state = sessions.snapshot(&id).await.unwrap();
    let mut proposed = state.collected_fields().proposed_line_ids.clone();
    proposed.sort_unstable();
    assert_eq!(proposed, vec![270, 271, 272, 330, 331]);

    let third = say(&sessions, &id, "yes").await;
    assert_eq!(third.phase, ConversationPhase::AwaitingIntent);
    assert!(third.reply.contains("$4.95"), "reply was: {}", third.reply);
}

#[tokio::test]
async fn test_declining_the_confirmation_refunds_nothing() {
    let (container, sessions) = setup().await;
    let id = sessions.start_session().await;

    say(&sessions, &id, "I need a refund").await;
    say(&sessions, &id, "Aaron Mitchell, +1 204 452 6452").await;
    let outcome = say(&sessions, &id, "no").await;

    assert!(outcome.reply.contains("cancelled"));
    assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);

    let purchases = container
        .list_purchases_use_case()
        .execute(tunedesk::CustomerIdentity::Invoice(50))
        .await
        .unwrap();
    match purchases {
        tunedesk::Resolution::Refundable(found) => {
            assert_eq!(found.lines.len(), 3);
            assert!(found.already_refunded.is_empty());
        }
        other => panic!("expected purchases, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_invoice_keeps_collecting() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let outcome = say(&sessions, &id, "Refund invoice #999999").await;

    assert!(outcome.reply.contains("couldn't find invoice #999999"));
    assert_eq!(outcome.phase, ConversationPhase::CollectingRefundInfo);
    let state = sessions.snapshot(&id).await.unwrap();
    assert_eq!(state.pending_intent(), Some(Intent::Refund));
    assert_eq!(state.collected_fields().invoice_id, None);

    let retry = say(&sessions, &id, "sorry, it's invoice 256").await;
    assert!(retry.reply.contains("$3.96"), "reply was: {}", retry.reply);
    assert_eq!(retry.phase, ConversationPhase::AwaitingIntent);
}

#[tokio::test]
async fn test_oversized_invoice_number_is_reported_unknown() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let outcome = say(&sessions, &id, "Refund invoice #99999999999999999999").await;

    assert!(
        outcome.reply.contains("couldn't find invoice #99999999999999999999"),
        "reply was: {}",
        outcome.reply
    );
    assert_eq!(outcome.phase, ConversationPhase::CollectingRefundInfo);
    let state = sessions.snapshot(&id).await.unwrap();
    assert_eq!(state.pending_intent(), Some(Intent::Refund));
    assert_eq!(state.collected_fields().invoice_id, None);
    assert_eq!(state.collected_fields().invoice_reference, None);
}

#[tokio::test]
async fn test_shared_name_asks_for_the_matching_phone() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let first = say(&sessions, &id, "refund please, Emma Jones, +44 999 999 9999").await;
    assert!(
        first.reply.contains("more than one customer named Emma Jones"),
        "reply was: {}",
        first.reply
    );
    assert_eq!(first.phase, ConversationPhase::CollectingRefundInfo);
    let state = sessions.snapshot(&id).await.unwrap();
    assert_eq!(state.pending_intent(), Some(Intent::Refund));
    assert_eq!(state.collected_fields().phone, None);
    assert_eq!(state.collected_fields().customer_name.as_deref(), Some("Emma Jones"));

    let second = say(&sessions, &id, "+44 020 7707 0707").await;
    assert_eq!(second.phase, ConversationPhase::ConfirmingRefund, "reply was: {}", second.reply);
    let state = sessions.snapshot(&id).await.unwrap();
    assert_eq!(state.collected_fields().proposed_line_ids, vec![1650]);
}

#[tokio::test]
async fn test_compound_request_runs_recommendation_after_refund() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let first = say(&sessions, &id, "refund the Queen songs and find something similar").await;
    assert_eq!(first.intent, Some(Intent::Refund));
    assert_eq!(first.phase, ConversationPhase::CollectingRefundInfo);
    assert_eq!(sessions.snapshot(&id).await.unwrap().follow_ups().len(), 1);

    let second = say(&sessions, &id, "Aaron Mitchell, +1 204 452 6452").await;
    assert_eq!(second.phase, ConversationPhase::ConfirmingRefund);
    let state = sessions.snapshot(&id).await.unwrap();
    let mut proposed = state.collected_fields().proposed_line_ids.clone();
    proposed.sort_unstable();
    assert_eq!(proposed, vec![270, 271, 272]);
    assert!(!second.reply.contains("Here are the matching"));

    let third = say(&sessions, &id, "yes").await;
    assert!(third.reply.contains("$2.97"), "reply was: {}", third.reply);
    assert!(third.reply.contains("Here are the matching"), "reply was: {}", third.reply);
    assert!(third.reply.contains("Led Zeppelin"));
    let refund_at = third.reply.find("$2.97").unwrap();
    let results_at = third.reply.find("Here are the matching").unwrap();
    assert!(refund_at < results_at);

    let state = sessions.snapshot(&id).await.unwrap();
    assert!(state.follow_ups().is_empty());
    assert_eq!(state.phase(), ConversationPhase::AwaitingIntent);
}

#[tokio::test]
async fn test_music_query_by_artist() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let outcome = say(&sessions, &id, "What songs do you have by Queen?").await;

    assert_eq!(outcome.intent, Some(Intent::MusicQuery));
    assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);
    assert!(outcome.reply.contains("Bohemian Rhapsody"), "reply was: {}", outcome.reply);
    assert!(!outcome.reply.contains("Stairway To Heaven"));
}

#[tokio::test]
async fn test_music_query_without_matches() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let outcome = say(&sessions, &id, "Do you have any songs by The Nonexistent Band?").await;

    assert!(outcome.reply.starts_with("No matches"), "reply was: {}", outcome.reply);
    assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);
}

#[tokio::test]
async fn test_recommendation_without_a_reference_asks_for_taste() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    let outcome = say(&sessions, &id, "recommend something").await;

    assert_eq!(outcome.intent, Some(Intent::MusicQuery));
    assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);
    assert!(outcome.reply.contains("Which artist or genre"), "reply was: {}", outcome.reply);
    assert!(!outcome.reply.contains("Here are the matching"));
}

#[tokio::test]
async fn test_history_records_both_sides() {
    let (_container, sessions) = setup().await;
    let id = sessions.start_session().await;

    say(&sessions, &id, "hello").await;
    say(&sessions, &id, "I need a refund").await;

    let state = sessions.snapshot(&id).await.unwrap();
    assert_eq!(state.history().len(), 4);
    assert_eq!(state.history()[2].text, "I need a refund");
    assert!(state.last_reply().unwrap().contains("full name"));
}
