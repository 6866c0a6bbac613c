//! Configuration for budget planning, chunking and summarization.
//!
//! A single flat [`ContextFitConfig`] is constructed once per process and
//! handed to the services. Values come from built-in defaults, an optional
//! YAML/JSON file, and `CONTEXTFIT_*` environment variables, in that order.

use crate::types::{BudgetAllocations, ContextError};
use crate::ContextResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default reservation for the system prompt
pub const DEFAULT_SYSTEM_PROMPT_TOKENS: usize = 500;

/// Default reservation for the user prompt
pub const DEFAULT_USER_PROMPT_TOKENS: usize = 1000;

/// Default reservation for web-search context
pub const DEFAULT_WEB_SEARCH_TOKENS: usize = 5000;

/// Default reservation for the model's reply
pub const DEFAULT_RESPONSE_BUFFER_TOKENS: usize = 4000;

/// Context window assumed for unrecognised models
pub const DEFAULT_CONTEXT_WINDOW: usize = 4096;

/// Default overlap between sliding-window chunks
pub const DEFAULT_CHUNKING_OVERLAP_TOKENS: usize = 200;

/// Fraction of the context window at which reduction is recommended
pub const DEFAULT_CHUNKING_SOFT_THRESHOLD: f64 = 0.8;

/// Keyword-focused summaries below this fraction of target get backfilled
pub const DEFAULT_KEYWORD_BACKFILL_THRESHOLD: f64 = 0.9;

/// Share of the target a hybrid summary spends on keyword sentences
pub const DEFAULT_HYBRID_KEYWORD_SHARE: f64 = 0.7;

/// Share of the target a hybrid summary gives the structural pass
pub const DEFAULT_HYBRID_STRUCTURAL_SHARE: f64 = 0.8;

pub const DEFAULT_MAX_KEY_POINTS: usize = 10;

pub const DEFAULT_MAX_KEYWORDS_AUTOEXTRACTED: usize = 20;

/// Framing cost per chat message
pub const DEFAULT_MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Priming cost for the assistant reply
pub const DEFAULT_REPLY_PRIMING_TOKENS: usize = 2;

/// Heuristic ratio used when no tokenizer is available
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CONTEXTFIT_";

/// Configuration shared by every service in the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextFitConfig {
    /// Tokens reserved for the system prompt
    pub system_prompt_tokens: usize,

    /// Tokens reserved for the user prompt
    pub user_prompt_tokens: usize,

    /// Tokens reserved for web-search context
    pub web_search_tokens: usize,

    /// Tokens reserved for the model's response
    pub response_buffer_tokens: usize,

    /// Context window for model identifiers not found in the catalog
    pub default_context_window: usize,

    /// Overlap between consecutive sliding-window chunks
    pub chunking_overlap_tokens: usize,

    /// Fraction (0.0-1.0] of the window at which chunking is recommended
    pub chunking_soft_threshold: f64,

    /// Fraction (0.0-1.0] of target below which keyword summaries are backfilled
    pub keyword_backfill_threshold: f64,

    /// Fraction (0.0-1.0] of target for the keyword pass of hybrid summaries
    pub hybrid_keyword_share: f64,

    /// Fraction (0.0-1.0] of target for the structural pass of hybrid summaries
    pub hybrid_structural_share: f64,

    /// Cap on key points attached to a summary
    pub max_key_points: usize,

    /// Cap on keywords inferred when the caller supplies none
    pub max_keywords_autoextracted: usize,

    /// Per-message framing overhead for chat message counting
    pub message_overhead_tokens: usize,

    /// Reply priming overhead for chat message counting
    pub reply_priming_tokens: usize,

    /// Characters per token for heuristic counting
    pub chars_per_token: usize,

    /// Extra model substring -> context window entries from the routing layer
    pub model_context_windows: BTreeMap<String, usize>,
}

impl Default for ContextFitConfig {
    fn default() -> Self {
        Self {
            system_prompt_tokens: DEFAULT_SYSTEM_PROMPT_TOKENS,
            user_prompt_tokens: DEFAULT_USER_PROMPT_TOKENS,
            web_search_tokens: DEFAULT_WEB_SEARCH_TOKENS,
            response_buffer_tokens: DEFAULT_RESPONSE_BUFFER_TOKENS,
            default_context_window: DEFAULT_CONTEXT_WINDOW,
            chunking_overlap_tokens: DEFAULT_CHUNKING_OVERLAP_TOKENS,
            chunking_soft_threshold: DEFAULT_CHUNKING_SOFT_THRESHOLD,
            keyword_backfill_threshold: DEFAULT_KEYWORD_BACKFILL_THRESHOLD,
            hybrid_keyword_share: DEFAULT_HYBRID_KEYWORD_SHARE,
            hybrid_structural_share: DEFAULT_HYBRID_STRUCTURAL_SHARE,
            max_key_points: DEFAULT_MAX_KEY_POINTS,
            max_keywords_autoextracted: DEFAULT_MAX_KEYWORDS_AUTOEXTRACTED,
            message_overhead_tokens: DEFAULT_MESSAGE_OVERHEAD_TOKENS,
            reply_priming_tokens: DEFAULT_REPLY_PRIMING_TOKENS,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            model_context_windows: BTreeMap::new(),
        }
    }
}

impl ContextFitConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> ContextResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> ContextResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> ContextResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&raw),
            Some("json") => Self::from_json_str(&raw),
            _ => Err(ContextError::UnsupportedConfigFile(path.to_path_buf())),
        }
    }

    /// Apply `CONTEXTFIT_*` environment variables on top of this config.
    ///
    /// Unparseable values are ignored with a warning so a typo in the
    /// environment never takes the service down.
    pub fn with_env_overrides(mut self) -> ContextResult<Self> {
        let usize_fields: [(&str, &mut usize); 11] = [
            ("SYSTEM_PROMPT_TOKENS", &mut self.system_prompt_tokens),
            ("USER_PROMPT_TOKENS", &mut self.user_prompt_tokens),
            ("WEB_SEARCH_TOKENS", &mut self.web_search_tokens),
            ("RESPONSE_BUFFER_TOKENS", &mut self.response_buffer_tokens),
            ("DEFAULT_CONTEXT_WINDOW", &mut self.default_context_window),
            ("CHUNKING_OVERLAP_TOKENS", &mut self.chunking_overlap_tokens),
            ("MAX_KEY_POINTS", &mut self.max_key_points),
            ("MAX_KEYWORDS_AUTOEXTRACTED", &mut self.max_keywords_autoextracted),
            ("MESSAGE_OVERHEAD_TOKENS", &mut self.message_overhead_tokens),
            ("REPLY_PRIMING_TOKENS", &mut self.reply_priming_tokens),
            ("CHARS_PER_TOKEN", &mut self.chars_per_token),
        ];
        for (suffix, field) in usize_fields {
            if let Some(value) = env_value::<usize>(suffix) {
                *field = value;
            }
        }

        let fraction_fields: [(&str, &mut f64); 4] = [
            ("CHUNKING_SOFT_THRESHOLD", &mut self.chunking_soft_threshold),
            ("KEYWORD_BACKFILL_THRESHOLD", &mut self.keyword_backfill_threshold),
            ("HYBRID_KEYWORD_SHARE", &mut self.hybrid_keyword_share),
            ("HYBRID_STRUCTURAL_SHARE", &mut self.hybrid_structural_share),
        ];
        for (suffix, field) in fraction_fields {
            if let Some(value) = env_value::<f64>(suffix) {
                *field = value;
            }
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> ContextResult<()> {
        let fractions = [
            ("chunking_soft_threshold", self.chunking_soft_threshold),
            ("keyword_backfill_threshold", self.keyword_backfill_threshold),
            ("hybrid_keyword_share", self.hybrid_keyword_share),
            ("hybrid_structural_share", self.hybrid_structural_share),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ContextError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.chars_per_token == 0 {
            return Err(ContextError::InvalidConfig(
                "chars_per_token must be greater than zero".to_string(),
            ));
        }

        if self.max_key_points == 0 {
            return Err(ContextError::InvalidConfig(
                "max_key_points must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Fixed allocations for a model with the given context window.
    pub fn allocations_for(&self, max_context: usize) -> BudgetAllocations {
        BudgetAllocations {
            max_context,
            system_prompt: self.system_prompt_tokens,
            user_prompt: self.user_prompt_tokens,
            web_search: self.web_search_tokens,
            response_buffer: self.response_buffer_tokens,
        }
    }
}

fn env_value<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    let key = format!("{}{}", ENV_PREFIX, suffix);
    let raw = std::env::var(&key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = %key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ContextFitConfig::default();
        assert_eq!(config.chunking_overlap_tokens, 200);
        assert!((config.chunking_soft_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.max_key_points, 10);
        assert_eq!(config.max_keywords_autoextracted, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_allocations_for() {
        let allocations = ContextFitConfig::default().allocations_for(16_385);
        assert_eq!(allocations.max_context, 16_385);
        assert_eq!(allocations.system_prompt, 500);
        assert_eq!(allocations.response_buffer, 4000);
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = "web_search_tokens: 0\nmodel_context_windows:\n  mistral-large: 32000\n";
        let config = ContextFitConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.web_search_tokens, 0);
        assert_eq!(config.user_prompt_tokens, 1000);
        assert_eq!(config.model_context_windows.get("mistral-large"), Some(&32_000));
    }

    #[test]
    fn test_from_json_rejects_bad_threshold() {
        let err = ContextFitConfig::from_json_str(r#"{"chunking_soft_threshold": 1.5}"#);
        assert!(matches!(err, Err(ContextError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_chars_per_token() {
        let config = ContextFitConfig {
            chars_per_token: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "max_key_points: 5").unwrap();
        let config = ContextFitConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_key_points, 5);
    }

    #[test]
    fn test_from_file_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = ContextFitConfig::from_file(file.path());
        assert!(matches!(err, Err(ContextError::UnsupportedConfigFile(_))));
    }

    #[test]
    fn test_env_overrides() {
        temp_env::with_vars(
            [
                ("CONTEXTFIT_WEB_SEARCH_TOKENS", Some("1234")),
                ("CONTEXTFIT_CHUNKING_SOFT_THRESHOLD", Some("0.75")),
                ("CONTEXTFIT_MAX_KEY_POINTS", Some("not-a-number")),
            ],
            || {
                let config = ContextFitConfig::default().with_env_overrides().unwrap();
                assert_eq!(config.web_search_tokens, 1234);
                assert!((config.chunking_soft_threshold - 0.75).abs() < f64::EPSILON);
                assert_eq!(config.max_key_points, 10);
            },
        );
    }

    #[test]
    fn test_env_overrides_validated() {
        temp_env::with_var("CONTEXTFIT_HYBRID_KEYWORD_SHARE", Some("0"), || {
            assert!(ContextFitConfig::default().with_env_overrides().is_err());
        });
    }
}
