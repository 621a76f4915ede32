//! Message routing scenarios: direct delivery, group fan-out, validation,
//! authorization, and deletion.

mod common;

use common::{client_event, TestApp};
use parley::presentation::websocket::ServerEvent;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn direct_message_reaches_partner_and_confirms_sender() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(2, "bob");
    app.friendships.befriend(1, 2);

    let mut bob = app.connect(2).await;
    let mut alice = app.connect(1).await;

    // bob was already connected, so he sees alice come online
    let events = bob.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::FriendOnline(p) => {
            assert_eq!(p.user_id, 1);
            assert!(p.is_online);
        }
        other => panic!("expected friend_online, got {}", other.name()),
    }

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"hi","type":"TEXT","receiverId":2}}"#),
    )
    .await;

    let bob_events = bob.drain();
    assert_eq!(bob_events.len(), 1);
    let delivered_id = match &bob_events[0] {
        ServerEvent::NewMessage(m) => {
            assert_eq!(m.content, "hi");
            assert_eq!(m.sender_id, "1");
            m.id.clone()
        }
        other => panic!("expected new_message, got {}", other.name()),
    };

    let alice_events = alice.drain();
    assert_eq!(alice_events.len(), 1);
    match &alice_events[0] {
        ServerEvent::MessageSent(m) => assert_eq!(m.id, delivered_id),
        other => panic!("expected message_sent, got {}", other.name()),
    }

    app.disconnect(&alice).await;
    let events = bob.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::FriendOnline(p) => {
            assert_eq!(p.user_id, 1);
            assert!(!p.is_online);
        }
        other => panic!("expected friend_online, got {}", other.name()),
    }
}

#[tokio::test]
async fn group_broadcast_stays_inside_the_room() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(2, "bob");
    app.seed_user(3, "carol");
    app.groups.add_member(1, 10);
    app.groups.add_member(2, 10);
    app.groups.add_member(3, 20);

    let alice = app.connect(1).await;
    let mut bob = app.connect(2).await;
    let mut carol = app.connect(3).await;

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"team?","groupId":10}}"#),
    )
    .await;

    assert_eq!(bob.drain().len(), 1);
    // carol is only in group 20 and observes nothing
    assert!(carol.drain().is_empty());
}

#[tokio::test]
async fn group_sender_gets_confirmation_but_no_echo() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(2, "bob");
    app.groups.add_member(1, 10);
    app.groups.add_member(2, 10);

    let mut alice = app.connect(1).await;
    let mut bob = app.connect(2).await;

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"hello","groupId":10}}"#),
    )
    .await;

    let alice_events = alice.drain();
    assert_eq!(alice_events.len(), 1);
    assert!(matches!(alice_events[0], ServerEvent::MessageSent(_)));

    let bob_events = bob.drain();
    assert_eq!(bob_events.len(), 1);
    assert!(matches!(bob_events[0], ServerEvent::NewMessage(_)));
}

#[tokio::test]
async fn ambiguous_target_fails_and_broadcasts_nothing() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(2, "bob");
    app.groups.add_member(1, 10);
    app.groups.add_member(2, 10);

    let mut alice = app.connect(1).await;
    let mut bob = app.connect(2).await;

    for data in [
        r#"{"content":"hi"}"#,
        r#"{"content":"hi","receiverId":2,"groupId":10}"#,
    ] {
        let json = format!(r#"{{"event":"send_message","data":{}}}"#, data);
        app.send(&alice, client_event(&json)).await;

        let alice_events = alice.drain();
        assert_eq!(alice_events.len(), 1);
        match &alice_events[0] {
            ServerEvent::Error(e) => assert_eq!(e.code, "VALIDATION_ERROR"),
            other => panic!("expected error, got {}", other.name()),
        }
        assert!(bob.drain().is_empty());
    }

    assert_eq!(app.messages.count(), 0);
}

#[tokio::test]
async fn non_member_cannot_send_to_group() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(3, "carol");
    app.groups.add_member(1, 10);

    let mut alice = app.connect(1).await;
    let mut carol = app.connect(3).await;

    app.send(
        &carol,
        client_event(r#"{"event":"send_message","data":{"content":"let me in","groupId":10}}"#),
    )
    .await;

    let carol_events = carol.drain();
    assert_eq!(carol_events.len(), 1);
    match &carol_events[0] {
        ServerEvent::Error(e) => assert_eq!(e.code, "AUTHORIZATION_ERROR"),
        other => panic!("expected error, got {}", other.name()),
    }
    assert!(alice.drain().is_empty());
    assert_eq!(app.messages.count(), 0);
}

#[tokio::test]
async fn unknown_recipient_fails_with_not_found() {
    let app = TestApp::new();
    app.seed_user(1, "alice");

    let mut alice = app.connect(1).await;

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"hi","receiverId":99}}"#),
    )
    .await;

    let events = alice.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::Error(e) => assert_eq!(e.code, "NOT_FOUND"),
        other => panic!("expected error, got {}", other.name()),
    }
    assert_eq!(app.messages.count(), 0);
}

#[tokio::test]
async fn sender_deletes_message_and_partner_is_told() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(2, "bob");

    let mut alice = app.connect(1).await;
    let mut bob = app.connect(2).await;

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"oops","receiverId":2}}"#),
    )
    .await;

    let message_id = match &bob.drain()[0] {
        ServerEvent::NewMessage(m) => m.id.clone(),
        other => panic!("expected new_message, got {}", other.name()),
    };
    alice.drain();

    let json = format!(
        r#"{{"event":"delete_message","data":{{"messageId":{}}}}}"#,
        message_id
    );
    app.send(&alice, client_event(&json)).await;

    assert_eq!(app.messages.count(), 0);

    match &bob.drain()[0] {
        ServerEvent::MessageDeleted(p) => assert_eq!(p.message_id, message_id),
        other => panic!("expected message_deleted, got {}", other.name()),
    }
    match &alice.drain()[0] {
        ServerEvent::MessageDeleted(p) => assert_eq!(p.message_id, message_id),
        other => panic!("expected message_deleted, got {}", other.name()),
    }
}

#[tokio::test]
async fn only_the_sender_may_delete() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(2, "bob");

    let mut alice = app.connect(1).await;
    let mut bob = app.connect(2).await;

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"mine","receiverId":2}}"#),
    )
    .await;
    let message_id = match &bob.drain()[0] {
        ServerEvent::NewMessage(m) => m.id.clone(),
        other => panic!("expected new_message, got {}", other.name()),
    };
    alice.drain();

    let json = format!(
        r#"{{"event":"delete_message","data":{{"messageId":{}}}}}"#,
        message_id
    );
    app.send(&bob, client_event(&json)).await;

    match &bob.drain()[0] {
        ServerEvent::Error(e) => assert_eq!(e.code, "AUTHORIZATION_ERROR"),
        other => panic!("expected error, got {}", other.name()),
    }
    assert!(alice.drain().is_empty());
    assert_eq!(app.messages.count(), 1);
}

#[tokio::test]
async fn joining_a_group_starts_delivery_and_leaving_stops_it() {
    let app = TestApp::new();
    app.seed_user(1, "alice");
    app.seed_user(2, "bob");
    app.groups.add_member(1, 10);

    let alice = app.connect(1).await;
    let mut bob = app.connect(2).await;

    // bob becomes a member after connecting, then joins the room explicitly
    app.groups.add_member(2, 10);
    app.send(&bob, client_event(r#"{"event":"join_group","data":{"groupId":10}}"#))
        .await;
    assert!(matches!(bob.drain()[0], ServerEvent::JoinedGroup(_)));

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"one","groupId":10}}"#),
    )
    .await;
    assert_eq!(bob.drain().len(), 1);

    app.send(&bob, client_event(r#"{"event":"leave_group","data":{"groupId":10}}"#))
        .await;
    assert!(matches!(bob.drain()[0], ServerEvent::LeftGroup(_)));

    app.send(
        &alice,
        client_event(r#"{"event":"send_message","data":{"content":"two","groupId":10}}"#),
    )
    .await;
    assert!(bob.drain().is_empty());
}
