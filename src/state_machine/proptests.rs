//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::chat::{Attachment, ChatResponse};
use crate::llm::Source;
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ConvContext {
    ConvContext::new("test-conv", "gpt-4o-mini")
}

fn words_of(text: &str) -> Vec<String> {
    text.split(' ').map(String::from).collect()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_source() -> impl Strategy<Value = Source> {
    prop_oneof![
        Just(Source::Primary),
        Just(Source::Secondary),
        Just(Source::Fallback),
    ]
}

fn arb_response() -> impl Strategy<Value = ChatResponse> {
    (
        "[a-zA-Z ]{0,60}",
        arb_source(),
        proptest::option::of("[a-zA-Z ]{1,20}"),
    )
        .prop_map(|(text, source, note)| ChatResponse {
            text,
            model_used: "test-model".to_string(),
            source,
            note,
        })
}

fn arb_attachment() -> impl Strategy<Value = Attachment> {
    ("[a-z]{1,8}\\.txt", 0u64..4096).prop_map(|(name, size)| Attachment {
        name,
        mime_type: "text/plain".to_string(),
        size,
        content: None,
    })
}

fn arb_typing_state() -> impl Strategy<Value = ConvState> {
    ("[a-zA-Z ]{0,60}", 0u64..10, proptest::option::of("[a-z]{1,10}")).prop_flat_map(
        |(text, render_token, note)| {
            let words = words_of(&text);
            let len = words.len();
            (0..=len).prop_map(move |revealed| ConvState::Typing {
                message_id: "ai-1".to_string(),
                words: words.clone(),
                revealed,
                render_token,
                model: "test-model".to_string(),
                source: Source::Primary,
                note: note.clone(),
            })
        },
    )
}

fn arb_busy_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        (0u64..100).prop_map(|request_id| ConvState::AwaitingResponse { request_id }),
        arb_typing_state(),
    ]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![Just(ConvState::Idle), arb_busy_state()]
}

fn arb_submit_event() -> impl Strategy<Value = Event> {
    (
        "[a-zA-Z ]{0,30}",
        proptest::collection::vec(arb_attachment(), 0..3),
        0u64..5,
    )
        .prop_map(|(text, attachments, request_id)| Event::UserSubmit {
            text,
            attachments,
            message_id: uuid::Uuid::new_v4().to_string(),
            request_id,
            timestamp: Utc::now(),
        })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_submit_event(),
        (0u64..5, arb_response(), any::<bool>(), 0u64..5).prop_map(
            |(request_id, response, animate, render_token)| Event::ResponseReceived {
                request_id,
                response,
                message_id: uuid::Uuid::new_v4().to_string(),
                animate,
                render_token,
                timestamp: Utc::now(),
            }
        ),
        (0u64..5).prop_map(|request_id| Event::ResponseFailed {
            request_id,
            message_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }),
        (0u64..5).prop_map(|render_token| Event::TypingTick { render_token }),
        Just(Event::RenderAbandoned),
    ]
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn is_valid_state(state: &ConvState) -> bool {
    match state {
        ConvState::Typing {
            words, revealed, ..
        } => *revealed <= words.len() && !words.is_empty(),
        _ => true,
    }
}

fn effects_are_valid(effects: &[Effect], new_state: &ConvState) -> bool {
    let sends = effects
        .iter()
        .any(|e| matches!(e, Effect::SendRequest { .. }));
    let ticks = effects
        .iter()
        .any(|e| matches!(e, Effect::ScheduleTypingTick { .. }));

    // Requests are only sent when entering AwaitingResponse
    if sends && !matches!(new_state, ConvState::AwaitingResponse { .. }) {
        return false;
    }
    // Ticks are only scheduled while typing
    if ticks && !new_state.is_typing() {
        return false;
    }
    true
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Valid state and effects after any sequence of events
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = ConvState::Idle;
        let ctx = test_context();

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                prop_assert!(is_valid_state(&state), "Invalid state: {:?}", state);
                prop_assert!(
                    effects_are_valid(&result.effects, &state),
                    "Invalid effects for state {:?}: {:?}",
                    state,
                    result.effects
                );
            }
        }
    }

    // Busy states reject submissions
    #[test]
    fn prop_busy_rejects_submit(state in arb_busy_state(), event in arb_submit_event()) {
        let result = transition(&state, &test_context(), event);
        prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
    }

    // Idle accepts any message with visible text
    #[test]
    fn prop_idle_accepts_messages(text in "[a-zA-Z]{1,10}[a-zA-Z ]{0,20}") {
        let event = Event::UserSubmit {
            text,
            attachments: vec![],
            message_id: "user-1".to_string(),
            request_id: 1,
            timestamp: Utc::now(),
        };
        let result = transition(&ConvState::Idle, &test_context(), event);
        prop_assert!(result.is_ok(), "Idle rejected message: {:?}", result);
        prop_assert_eq!(result.unwrap().new_state, ConvState::AwaitingResponse { request_id: 1 });
    }

    // Whitespace alone is not a message
    #[test]
    fn prop_blank_submit_rejected(text in "[ \t\n]{0,10}") {
        let event = Event::UserSubmit {
            text,
            attachments: vec![],
            message_id: "user-1".to_string(),
            request_id: 1,
            timestamp: Utc::now(),
        };
        let result = transition(&ConvState::Idle, &test_context(), event);
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyMessage);
    }

    // Ticks carrying another render token never change anything
    #[test]
    fn prop_stale_tick_ignored(state in arb_typing_state(), offset in 1u64..5) {
        let ConvState::Typing { render_token, .. } = &state else {
            unreachable!("arb_typing_state only produces Typing");
        };
        let stale = render_token + offset;
        let result = transition(&state, &test_context(), Event::TypingTick { render_token: stale }).unwrap();
        prop_assert_eq!(&result.new_state, &state);
        prop_assert!(result.effects.is_empty());
    }

    // Typing always ends in Idle with exactly the received text
    #[test]
    fn prop_typing_reveals_full_text(response in arb_response()) {
        let ctx = test_context();
        let expected = response.text.clone();
        let word_count = words_of(&expected).len();
        let event = Event::ResponseReceived {
            request_id: 1,
            response,
            message_id: "ai-1".to_string(),
            animate: true,
            render_token: 9,
            timestamp: Utc::now(),
        };
        let mut state = transition(&ConvState::AwaitingResponse { request_id: 1 }, &ctx, event)
            .unwrap()
            .new_state;

        let mut last_content = None;
        let mut ticks = 0;
        while state.is_typing() {
            let result = transition(&state, &ctx, Event::TypingTick { render_token: 9 }).unwrap();
            for effect in result.effects {
                if let Effect::UpdateMessage { content, is_final, .. } = effect {
                    last_content = Some((content, is_final));
                }
            }
            state = result.new_state;
            ticks += 1;
            prop_assert!(ticks <= word_count + 1, "Typing did not terminate");
        }

        prop_assert_eq!(ticks, word_count + 1);
        prop_assert_eq!(last_content, Some((expected, true)));
    }

    // Abandoning a render finalizes the whole message
    #[test]
    fn prop_render_abandoned_finalizes(state in arb_typing_state()) {
        let ConvState::Typing { words, .. } = &state else {
            unreachable!("arb_typing_state only produces Typing");
        };
        let full = words.join(" ");
        let result = transition(&state, &test_context(), Event::RenderAbandoned).unwrap();
        prop_assert_eq!(&result.new_state, &ConvState::Idle);
        prop_assert_eq!(&result.effects[0], &Effect::finalize("ai-1", full));
        prop_assert!(result.effects.contains(&Effect::PersistConversation));
    }
}
