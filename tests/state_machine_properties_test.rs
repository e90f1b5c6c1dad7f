//! Property tests for the transition table and the handlers
//!
//! Whatever a user types, a conversation only ever moves along the table
//! and never breaks its checkpoint invariants.

mod helpers;

use proptest::prelude::*;
use proptest::sample::select;

use helpers::*;
use OrderBuddy::state::TransitionData;
use OrderBuddy::{Conversation, ConversationState, OrderBuddyError};

const VOCABULARY: &[&str] = &[
    "hola", "menu", "carrito", "rastrear", "ayuda", "/admin", "1", "2", "3", "9", "2 a", "1 b a", "si", "no",
    "volver", "finalizar", "vaciar carrito", "seguir comprando", "cancelar", "adios", "efectivo",
    "transferencia", "Av. Siempre Viva 742", "???", "",
];

fn any_state() -> impl Strategy<Value = ConversationState> {
    select(ConversationState::ALL.to_vec())
}

proptest! {
    #[test]
    fn transition_succeeds_iff_table_allows(from in any_state(), to in any_state()) {
        let mut conversation = Conversation::new(TEST_TENANT, "1");
        conversation.force_transition(from, TransitionData::none());
        let before = conversation.clone();

        match conversation.transition(to, TransitionData::none()) {
            Ok(()) => {
                prop_assert!(from.can_transition_to(to));
                prop_assert_eq!(conversation.state(), to);
                prop_assert_eq!(conversation.transition_log().len(), before.transition_log().len() + 1);
            }
            Err(OrderBuddyError::InvalidTransition { .. }) => {
                prop_assert!(!from.can_transition_to(to));
                prop_assert_eq!(&conversation, &before);
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    #[test]
    fn every_state_can_return_to_idle(state in any_state()) {
        prop_assume!(state != ConversationState::Idle);
        prop_assert!(state.can_transition_to(ConversationState::Idle));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_messages_follow_the_table(messages in prop::collection::vec(select(VOCABULARY.to_vec()), 1..40)) {
        tokio_test::block_on(async {
            let ctx = TestContext::new();
            for text in &messages {
                let reply = ctx.send("42", text).await;
                assert!(!reply.text.is_empty());
            }

            if let Some(conversation) = ctx.registry.get(TEST_TENANT, "42").await {
                assert!(conversation.export().validate().is_ok());
                for record in conversation.transition_log() {
                    assert!(!record.forced, "forced move {} -> {} from message input", record.from, record.to);
                    assert!(record.from.can_transition_to(record.to));
                }
            }
        });
    }
}
