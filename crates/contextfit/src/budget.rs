//! Budget Planning Module
//!
//! Resolves a model identifier to a context window and partitions that window
//! into a [`TokenBudget`].
//!
//! # Lookup Strategy
//!
//! Model identifiers are free-form. Matching is case-insensitive:
//!
//! 1. an exact catalog entry wins
//! 2. otherwise the longest catalog pattern contained in the identifier wins
//! 3. otherwise the configured default window is used and the result is
//!    flagged as unrecognized
//!
//! Window sizes are metadata owned by the model-routing layer; the built-in
//! table is a baseline that configuration can extend or override.

use crate::config::ContextFitConfig;
use crate::types::{BudgetOverrides, TokenBudget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Built-in context window sizes keyed by model pattern.
pub static BUILTIN_CONTEXT_WINDOWS: LazyLock<BTreeMap<&'static str, usize>> =
    LazyLock::new(|| {
        let mut m = BTreeMap::new();
        // OpenAI models
        m.insert("gpt-4o", 128_000);
        m.insert("gpt-4o-mini", 128_000);
        m.insert("gpt-3.5-turbo", 16_385);
        // Anthropic models
        m.insert("claude-3.5-sonnet", 200_000);
        m.insert("claude-3-haiku", 200_000);
        // Google models
        m.insert("gemini-pro", 32_768);
        // Meta models
        m.insert("llama-3.1-405b", 32_768);
        m.insert("llama-3.1-70b", 32_768);
        m.insert("llama-3.1-8b", 32_768);
        m
    });

/// Result of resolving a model identifier against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLookup {
    pub context_window: usize,
    /// Catalog pattern that matched, if any
    pub matched_pattern: Option<String>,
    pub recognized: bool,
}

/// Pattern table mapping model identifiers to context window sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    windows: BTreeMap<String, usize>,
    default_window: usize,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin(crate::config::DEFAULT_CONTEXT_WINDOW)
    }
}

impl ModelCatalog {
    /// Catalog with only the built-in entries.
    pub fn builtin(default_window: usize) -> Self {
        let windows = BUILTIN_CONTEXT_WINDOWS
            .iter()
            .map(|(pattern, window)| (pattern.to_string(), *window))
            .collect();
        Self {
            windows,
            default_window,
        }
    }

    /// Built-in entries merged with configured ones; configured entries win.
    pub fn from_config(config: &ContextFitConfig) -> Self {
        let mut catalog = Self::builtin(config.default_context_window);
        for (pattern, window) in &config.model_context_windows {
            catalog.insert(pattern, *window);
        }
        catalog
    }

    pub fn insert(&mut self, pattern: &str, context_window: usize) {
        self.windows
            .insert(pattern.trim().to_lowercase(), context_window);
    }

    pub fn default_window(&self) -> usize {
        self.default_window
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn lookup(&self, model_id: &str) -> ModelLookup {
        let needle = model_id.trim().to_lowercase();

        if let Some(window) = self.windows.get(&needle) {
            return ModelLookup {
                context_window: *window,
                matched_pattern: Some(needle),
                recognized: true,
            };
        }

        // Longest pattern wins so "gpt-4o-mini-2024" does not resolve to "gpt-4o"
        let best = self
            .windows
            .iter()
            .filter(|(pattern, _)| !pattern.is_empty() && needle.contains(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len());

        match best {
            Some((pattern, window)) => ModelLookup {
                context_window: *window,
                matched_pattern: Some(pattern.clone()),
                recognized: true,
            },
            None => ModelLookup {
                context_window: self.default_window,
                matched_pattern: None,
                recognized: false,
            },
        }
    }
}

/// Computes per-request token budgets from a model identifier.
#[derive(Debug, Clone)]
pub struct BudgetPlanner {
    catalog: ModelCatalog,
    config: ContextFitConfig,
}

impl Default for BudgetPlanner {
    fn default() -> Self {
        Self::new(&ContextFitConfig::default())
    }
}

impl BudgetPlanner {
    pub fn new(config: &ContextFitConfig) -> Self {
        Self {
            catalog: ModelCatalog::from_config(config),
            config: config.clone(),
        }
    }

    pub fn with_catalog(config: &ContextFitConfig, catalog: ModelCatalog) -> Self {
        Self {
            catalog,
            config: config.clone(),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Resolve the context window, logging identifiers the catalog does not know.
    pub fn lookup(&self, model_id: &str) -> ModelLookup {
        let lookup = self.catalog.lookup(model_id);
        if !lookup.recognized {
            tracing::warn!(
                model = %model_id,
                default_window = lookup.context_window,
                "Unknown model identifier, using default context window"
            );
        }
        lookup
    }

    /// Build the budget for `model_id`.
    ///
    /// Overrides replace individual allocations before `file_content` is
    /// derived, so the residual always reflects them.
    pub fn plan(&self, model_id: &str, overrides: Option<&BudgetOverrides>) -> TokenBudget {
        self.plan_detailed(model_id, overrides).0
    }

    /// Like [`BudgetPlanner::plan`], also returning how the model resolved.
    pub fn plan_detailed(
        &self,
        model_id: &str,
        overrides: Option<&BudgetOverrides>,
    ) -> (TokenBudget, ModelLookup) {
        let lookup = self.lookup(model_id);
        let base = self.config.allocations_for(lookup.context_window);
        let allocations = match overrides {
            Some(overrides) => overrides.apply(base),
            None => base,
        };

        let budget = TokenBudget::new(allocations);
        tracing::debug!(
            model = %model_id,
            max_context = budget.max_context(),
            file_content = budget.file_content(),
            "Planned token budget"
        );
        (budget, lookup)
    }
}
