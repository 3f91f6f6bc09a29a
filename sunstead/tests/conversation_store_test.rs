mod common;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use sunstead::db::DatabaseBackend;
use sunstead::models::{MessageRole, NewMessage};

#[tokio::test]
async fn messages_persist_in_processing_order() {
    let (db, _guard) = common::test_backend().await;
    let session = db.create_session().await.unwrap();

    db.append_message(&NewMessage::user(session.id, "What's my battery level?"))
        .await
        .unwrap();
    db.append_message(&NewMessage::assistant(
        session.id,
        "Battery is at 27%.",
        "Solar Controller",
        900,
    ))
    .await
    .unwrap();
    db.append_message(&NewMessage::user(session.id, "And solar?"))
        .await
        .unwrap();

    let messages = db.session_messages(session.id).await.unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].agent_role.as_deref(), Some("Solar Controller"));
    assert_eq!(messages[1].duration_ms, Some(900));

    for pair in messages.windows(2) {
        assert!(
            pair[0].created_at <= pair[1].created_at,
            "created_at must be non-decreasing within a session"
        );
    }
}

#[tokio::test]
async fn recent_messages_returns_last_n_in_chronological_order() {
    let (db, _guard) = common::test_backend().await;
    let session = db.create_session().await.unwrap();

    for i in 0..5 {
        db.append_message(&NewMessage::user(session.id, format!("message {i}")))
            .await
            .unwrap();
    }

    let recent = db.recent_messages(session.id, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].content, "message 3");
    assert_eq!(recent[1].content, "message 4");
}

#[tokio::test]
async fn unknown_session_reads_are_none_or_empty() {
    let (db, _guard) = common::test_backend().await;

    let ghost = Uuid::new_v4();
    assert!(db.get_session(ghost).await.unwrap().is_none());
    assert!(db.session_messages(ghost).await.unwrap().is_empty());
}

#[tokio::test]
async fn session_listing_counts_messages_and_orders_by_recency() {
    let (db, _guard) = common::test_backend().await;

    let older = db.create_session().await.unwrap();
    db.append_message(&NewMessage::user(older.id, "first")).await.unwrap();

    let newer = db.create_session().await.unwrap();
    db.append_message(&NewMessage::user(newer.id, "second")).await.unwrap();
    db.append_message(&NewMessage::assistant(newer.id, "hi", "Manager", 10))
        .await
        .unwrap();

    let sessions = db.list_sessions(10).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, newer.id, "most recently touched first");
    assert_eq!(sessions[0].message_count, 2);
    assert_eq!(sessions[1].message_count, 1);
}
