//! Model-based tests for the session broadcaster.
//!
//! Random operation sequences are applied to the real broadcaster (via
//! `RelayHarness`, which plays the transport role) and to the reference
//! `ModelWorld`; after every sequence the two observable states must be
//! identical.
//!
//! # Oracle Pattern
//!
//! Each property ends with an oracle over global state:
//! - Identical registered accounts, session auth, and delivered events
//! - Attached identities always reference a registered account
//! - Exactly one success among duplicate signups for the same mobile

use courier_harness::{RelayHarness, model::{MOBILE_POOL, ModelWorld, Operation}};
use courier_proto::ServerEvent;
use proptest::prelude::*;

const SEED: u64 = 0x00C0_FFEE;

fn conn_id_strategy() -> impl Strategy<Value = u64> {
    prop::sample::select(vec![1u64, 2, 3, 4])
}

fn mobile_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(MOBILE_POOL.iter().map(|m| (*m).to_owned()).collect::<Vec<_>>())
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["Alice".to_owned(), "Bob".to_owned(), String::new()])
}

fn password_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["pw".to_owned(), "wrong".to_owned(), String::new()])
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        conn_id_strategy().prop_map(|conn_id| Operation::Connect { conn_id }),
        (conn_id_strategy(), name_strategy(), mobile_strategy(), password_strategy()).prop_map(
            |(conn_id, name, mobile, password)| Operation::Signup {
                conn_id,
                name,
                mobile,
                password
            }
        ),
        (conn_id_strategy(), mobile_strategy(), password_strategy())
            .prop_map(|(conn_id, mobile, password)| Operation::Login { conn_id, mobile, password }),
        (conn_id_strategy(), "[a-z]{0,8}", prop::option::of(Just("data:;base64,AAAA".to_owned())))
            .prop_map(|(conn_id, content, media)| Operation::Chat { conn_id, content, media }),
        conn_id_strategy().prop_map(|conn_id| Operation::Disconnect {
            conn_id,
            reason: "transport closed".to_owned()
        }),
    ]
}

proptest! {
    #[test]
    fn broadcaster_matches_model(ops in prop::collection::vec(operation_strategy(), 1..60)) {
        let mut harness = RelayHarness::new(SEED);
        let mut model = ModelWorld::new();

        for op in &ops {
            harness.apply(op).expect("harness apply");
            model.apply(op);

            // Step-level oracle: every attached identity references a
            // registered account.
            let state = harness.observable_state();
            for (_, mobile) in &state.session_auth {
                if let Some(mobile) = mobile {
                    prop_assert!(
                        harness.broadcaster().identity_store().contains(mobile),
                        "attached identity {mobile} has no account"
                    );
                }
            }
        }

        prop_assert_eq!(harness.observable_state(), model.observable_state());
    }

    #[test]
    fn duplicate_signups_have_exactly_one_success(
        first_conn in conn_id_strategy(),
        second_conn in conn_id_strategy(),
    ) {
        let mut harness = RelayHarness::new(SEED);

        let signup = |conn_id: u64| Operation::Signup {
            conn_id,
            name: "Alice".to_owned(),
            mobile: "1112223333".to_owned(),
            password: "pw".to_owned(),
        };

        harness.apply(&Operation::Connect { conn_id: first_conn }).expect("connect");
        harness.apply(&Operation::Connect { conn_id: second_conn }).expect("connect");
        harness.apply(&signup(first_conn)).expect("signup");
        harness.apply(&signup(second_conn)).expect("signup");

        let successes: usize = [first_conn, second_conn]
            .iter()
            .collect::<std::collections::BTreeSet<_>>()
            .iter()
            .map(|conn_id| {
                harness
                    .inbox(**conn_id)
                    .iter()
                    .filter(|e| matches!(e, ServerEvent::SignupSuccess))
                    .count()
            })
            .sum();

        // Back-to-back registrations for one mobile: one success, and the
        // store holds a single account regardless of which session won.
        prop_assert_eq!(successes, 1);
        prop_assert_eq!(harness.broadcaster().identity_store().len(), 1);
    }

    #[test]
    fn unauthenticated_chat_is_never_delivered(content in "[a-z]{1,8}") {
        let mut harness = RelayHarness::new(SEED);

        harness.apply(&Operation::Connect { conn_id: 1 }).expect("connect");
        harness.apply(&Operation::Connect { conn_id: 2 }).expect("connect");
        harness
            .apply(&Operation::Chat { conn_id: 1, content, media: None })
            .expect("chat");

        prop_assert!(harness.inbox(1).is_empty());
        prop_assert!(harness.inbox(2).is_empty());
    }
}
