//! Property-based tests for budget planning
//!
//! The residual file-content allocation must always equal the clamped
//! difference between the window and the fixed reservations.

#[cfg(test)]
mod property_tests {
    use crate::budget::{BudgetPlanner, ModelCatalog};
    use crate::config::ContextFitConfig;
    use crate::types::{BudgetAllocations, BudgetOverrides, TokenBudget};
    use proptest::prelude::*;

    // ============================================================================
    // Strategies for generating test data
    // ============================================================================

    fn model_id_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("gpt-4o".to_string()),
            Just("gpt-3.5-turbo-1106".to_string()),
            Just("claude-3-haiku-20240307".to_string()),
            Just("gemini-pro".to_string()),
            "[a-z]{1,12}",
        ]
    }

    fn overrides_strategy() -> impl Strategy<Value = BudgetOverrides> {
        (
            prop::option::of(0usize..300_000),
            prop::option::of(0usize..20_000),
            prop::option::of(0usize..20_000),
            prop::option::of(0usize..50_000),
            prop::option::of(0usize..20_000),
        )
            .prop_map(
                |(max_context, system_prompt, user_prompt, web_search, response_buffer)| {
                    BudgetOverrides {
                        max_context,
                        system_prompt,
                        user_prompt,
                        web_search,
                        response_buffer,
                    }
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// file_content == max(0, max_context - reservations) for any overrides
        #[test]
        fn residual_is_clamped_difference(
            model_id in model_id_strategy(),
            overrides in overrides_strategy()
        ) {
            let budget = BudgetPlanner::default().plan(&model_id, Some(&overrides));
            let expected = budget.max_context().saturating_sub(
                budget.system_prompt()
                    + budget.user_prompt()
                    + budget.web_search()
                    + budget.response_buffer(),
            );
            prop_assert_eq!(budget.file_content(), expected);
            prop_assert!(budget.file_content() <= budget.max_context());
        }

        /// Deserializing a budget recomputes the derived allocation
        #[test]
        fn serde_roundtrip_keeps_invariant(
            max_context in 0usize..300_000,
            reserved in prop::array::uniform4(0usize..40_000)
        ) {
            let budget = TokenBudget::new(BudgetAllocations {
                max_context,
                system_prompt: reserved[0],
                user_prompt: reserved[1],
                web_search: reserved[2],
                response_buffer: reserved[3],
            });
            let json = serde_json::to_string(&budget).map_err(|e| TestCaseError::fail(e.to_string()))?;
            let parsed: TokenBudget = serde_json::from_str(&json).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(parsed, budget);
        }

        /// Identifiers without any catalog pattern resolve to the default window
        #[test]
        fn unknown_identifiers_use_default(model_id in "[a-z]{1,12}") {
            let config = ContextFitConfig::default();
            let lookup = ModelCatalog::from_config(&config).lookup(&model_id);
            prop_assert!(!lookup.recognized);
            prop_assert_eq!(lookup.context_window, config.default_context_window);
        }
    }
}
