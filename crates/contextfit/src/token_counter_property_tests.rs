//! Property-based tests for the token counter
//!
//! Checks the counting contract with the proptest framework: empty input,
//! the character heuristic, and chat message framing.

#[cfg(test)]
mod property_tests {
    use crate::config::ContextFitConfig;
    use crate::token_counter::TokenCounter;
    use crate::types::{ChatMessage, ModelFamily};
    use proptest::prelude::*;
    use std::sync::LazyLock;

    /// Loading BPE ranks is slow; share one precise counter across cases
    static PRECISE: LazyLock<TokenCounter> = LazyLock::new(TokenCounter::default);

    // ============================================================================
    // Strategies for generating test data
    // ============================================================================

    fn family_strategy() -> impl Strategy<Value = ModelFamily> {
        prop::sample::select(ModelFamily::ALL.to_vec())
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z ,.!?]{0,200}",
            "[a-z0-9_(){};\n ]{0,200}",
            prop::collection::vec(prop::sample::select(vec!["你", "好", "世", "界", "é", "ß"]), 0..50)
                .prop_map(|chars| chars.join("")),
        ]
    }

    fn message_strategy() -> impl Strategy<Value = ChatMessage> {
        (
            prop::sample::select(vec!["system", "user", "assistant"]),
            "[a-zA-Z .]{0,80}",
            prop::option::of("[a-z]{1,12}"),
        )
            .prop_map(|(role, content, name)| {
                let message = ChatMessage::new(role, content);
                match name {
                    Some(name) => message.with_name(name),
                    None => message,
                }
            })
    }

    // ============================================================================
    // Properties
    // ============================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The heuristic is exactly characters divided by the configured ratio
        #[test]
        fn heuristic_matches_char_ratio(text in text_strategy(), family in family_strategy()) {
            let counter = TokenCounter::heuristic(&ContextFitConfig::default());
            prop_assert_eq!(counter.count_tokens(&text, family), text.chars().count() / 4);
        }

        /// Appending text never lowers a heuristic count
        #[test]
        fn heuristic_is_monotonic(a in text_strategy(), b in text_strategy()) {
            let counter = TokenCounter::heuristic(&ContextFitConfig::default());
            let joined = format!("{}{}", a, b);
            prop_assert!(
                counter.count_tokens(&joined, ModelFamily::Default)
                    >= counter.count_tokens(&a, ModelFamily::Default)
            );
        }

        /// A BPE token always covers at least one byte
        #[test]
        fn precise_count_bounded_by_bytes(text in text_strategy(), family in family_strategy()) {
            let tokens = PRECISE.count_tokens(&text, family);
            prop_assert!(tokens <= text.len());
            prop_assert_eq!(tokens == 0, text.is_empty());
        }

        /// Message framing adds the fixed per-message and priming overheads
        #[test]
        fn message_count_includes_overheads(
            messages in prop::collection::vec(message_strategy(), 0..8),
            family in family_strategy()
        ) {
            let counter = TokenCounter::heuristic(&ContextFitConfig::default());
            let content_tokens: usize = messages
                .iter()
                .map(|m| counter.count_tokens(&m.role, family) + counter.count_tokens(&m.content, family))
                .sum();

            let total = counter.count_messages_tokens(&messages, family);
            prop_assert!(total >= content_tokens + 4 * messages.len() + 2);
        }
    }
}
