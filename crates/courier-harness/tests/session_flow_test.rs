//! End-to-end session flow at the core level.
//!
//! Walks two sessions through the full lifecycle: signup, login, chat
//! from an unauthenticated bystander, chat from the authenticated user,
//! and disconnect - asserting exactly what each session receives at every
//! step.

use courier_harness::{FIXED_MILLIS, RelayHarness, model::Operation};
use courier_proto::ServerEvent;

const SESSION_A: u64 = 1;
const SESSION_B: u64 = 2;

fn setup() -> RelayHarness {
    let mut harness = RelayHarness::new(7);
    harness.apply(&Operation::Connect { conn_id: SESSION_A }).expect("connect A");
    harness.apply(&Operation::Connect { conn_id: SESSION_B }).expect("connect B");
    harness
}

#[test]
fn full_session_lifecycle() {
    let mut harness = setup();

    // Signup: private success ack to A only.
    harness
        .apply(&Operation::Signup {
            conn_id: SESSION_A,
            name: "Alice".to_owned(),
            mobile: "1112223333".to_owned(),
            password: "pw".to_owned(),
        })
        .expect("signup");

    assert_eq!(harness.inbox(SESSION_A), [ServerEvent::SignupSuccess]);
    assert!(harness.inbox(SESSION_B).is_empty(), "signup must not be visible to others");

    // Login: private identity ack to A, join broadcast to everyone
    // (A included).
    harness
        .apply(&Operation::Login {
            conn_id: SESSION_A,
            mobile: "1112223333".to_owned(),
            password: "pw".to_owned(),
        })
        .expect("login");

    {
        let inbox_a = harness.inbox(SESSION_A);
        assert_eq!(inbox_a.len(), 3);
        match &inbox_a[1] {
            ServerEvent::LoginSuccess(identity) => {
                assert_eq!(identity.id, "1112223333");
                assert_eq!(identity.name, "Alice");
                assert_eq!(identity.mobile, "1112223333");
            },
            other => panic!("expected login success, got {other:?}"),
        }
        match &inbox_a[2] {
            ServerEvent::UserJoined(presence) => assert_eq!(presence.username, "Alice"),
            other => panic!("expected user joined, got {other:?}"),
        }

        let inbox_b = harness.inbox(SESSION_B);
        assert_eq!(inbox_b.len(), 1);
        assert!(matches!(&inbox_b[0], ServerEvent::UserJoined(p) if p.username == "Alice"));
    }

    // Chat from B, who never logged in: silently dropped.
    harness
        .apply(&Operation::Chat { conn_id: SESSION_B, content: "hi".to_owned(), media: None })
        .expect("chat B");

    assert_eq!(harness.inbox(SESSION_A).len(), 3);
    assert_eq!(harness.inbox(SESSION_B).len(), 1);

    // Chat from A: stamped broadcast to both sessions.
    harness
        .apply(&Operation::Chat { conn_id: SESSION_A, content: "hello".to_owned(), media: None })
        .expect("chat A");

    for conn_id in [SESSION_A, SESSION_B] {
        let inbox = harness.inbox(conn_id);
        match inbox.last() {
            Some(ServerEvent::ChatMessage(broadcast)) => {
                assert_eq!(broadcast.content, "hello");
                assert_eq!(broadcast.media, None);
                assert_eq!(broadcast.user_id, "1112223333");
                assert_eq!(broadcast.username, "Alice");
                assert_eq!(broadcast.timestamp, FIXED_MILLIS);
            },
            other => panic!("session {conn_id}: expected chat broadcast, got {other:?}"),
        }
    }

    // Disconnect A: leave broadcast to B only, A's session gone.
    let a_events_before = harness.inbox(SESSION_A).len();
    harness
        .apply(&Operation::Disconnect {
            conn_id: SESSION_A,
            reason: "transport closed".to_owned(),
        })
        .expect("disconnect A");

    assert_eq!(harness.inbox(SESSION_A).len(), a_events_before, "A must not see its own leave");
    assert!(
        matches!(harness.inbox(SESSION_B).last(), Some(ServerEvent::UserLeft(p)) if p.username == "Alice")
    );
    assert_eq!(harness.broadcaster().session_count(), 1);
    assert!(!harness.broadcaster().is_authenticated(SESSION_A));
}

#[test]
fn failed_login_is_private() {
    let mut harness = setup();

    harness
        .apply(&Operation::Signup {
            conn_id: SESSION_A,
            name: "Alice".to_owned(),
            mobile: "1112223333".to_owned(),
            password: "pw".to_owned(),
        })
        .expect("signup");

    harness
        .apply(&Operation::Login {
            conn_id: SESSION_B,
            mobile: "1112223333".to_owned(),
            password: "guess".to_owned(),
        })
        .expect("login");

    // B's failed attempt is invisible to A.
    assert_eq!(harness.inbox(SESSION_A), [ServerEvent::SignupSuccess]);
    assert!(matches!(
        harness.inbox(SESSION_B),
        [ServerEvent::LoginError { message }] if message == "invalid mobile number or password"
    ));
}
