//! Token Counter Module
//!
//! Counts tokens for arbitrary text under a model family's tokenization
//! scheme.
//!
//! # Counting Strategy
//!
//! - Precise: a `tiktoken-rs` BPE encoder per family, loaded once when the
//!   counter is built. GPT-4 and GPT-3.5 use their own model encodings, every
//!   other family uses `cl100k_base`.
//! - Heuristic: `characters / chars_per_token` (4 by default). Used for any
//!   family whose encoder could not be loaded. Counts from this path can be
//!   off by a wide margin, which is what the response buffer and the soft
//!   chunking threshold absorb.
//!
//! Which families are precise is recorded at construction time and exposed
//! through [`TokenCounter::capabilities`].

use crate::config::ContextFitConfig;
use crate::types::{ChatMessage, ModelFamily};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tiktoken_rs::CoreBPE;

/// Which families count precisely and which fall back to the heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerCapabilities {
    pub precise: Vec<ModelFamily>,
    pub heuristic_only: Vec<ModelFamily>,
    pub chars_per_token: usize,
}

impl TokenizerCapabilities {
    pub fn is_precise(&self, family: ModelFamily) -> bool {
        self.precise.contains(&family)
    }
}

/// Long-lived, read-only token counting service.
///
/// Encoders are loaded in [`TokenCounter::new`] and never mutated afterwards,
/// so a single instance can be shared across threads behind an `Arc`.
pub struct TokenCounter {
    encoders: HashMap<ModelFamily, CoreBPE>,
    chars_per_token: usize,
    message_overhead_tokens: usize,
    reply_priming_tokens: usize,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut precise: Vec<_> = self.encoders.keys().collect();
        precise.sort();
        f.debug_struct("TokenCounter")
            .field("precise", &precise)
            .field("chars_per_token", &self.chars_per_token)
            .finish()
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new(&ContextFitConfig::default())
    }
}

impl TokenCounter {
    /// Build a counter, probing which tokenizers can be loaded.
    ///
    /// Load failures are logged and leave that family on the heuristic; they
    /// never surface as errors.
    pub fn new(config: &ContextFitConfig) -> Self {
        let mut counter = Self::heuristic(config);

        for family in ModelFamily::ALL {
            match load_encoder(family) {
                Ok(bpe) => {
                    counter.encoders.insert(family, bpe);
                }
                Err(e) => {
                    tracing::warn!(
                        family = %family,
                        error = %e,
                        "Tokenizer unavailable, falling back to character heuristic"
                    );
                }
            }
        }

        let capabilities = counter.capabilities();
        tracing::info!(
            precise = ?capabilities.precise,
            heuristic_only = ?capabilities.heuristic_only,
            "Token counter initialized"
        );

        counter
    }

    /// Build a counter that never loads a tokenizer.
    ///
    /// Every count is `chars / chars_per_token`, which makes results exact
    /// and predictable.
    pub fn heuristic(config: &ContextFitConfig) -> Self {
        Self {
            encoders: HashMap::new(),
            chars_per_token: config.chars_per_token.max(1),
            message_overhead_tokens: config.message_overhead_tokens,
            reply_priming_tokens: config.reply_priming_tokens,
        }
    }

    /// Families with a loaded encoder versus heuristic-only families.
    ///
    /// A family without its own encoder that can borrow the default encoder
    /// still counts as precise.
    pub fn capabilities(&self) -> TokenizerCapabilities {
        let (precise, heuristic_only) = ModelFamily::ALL
            .into_iter()
            .partition(|family| self.encoder_for(*family).is_some());

        TokenizerCapabilities {
            precise,
            heuristic_only,
            chars_per_token: self.chars_per_token,
        }
    }

    pub fn is_precise(&self, family: ModelFamily) -> bool {
        self.encoder_for(family).is_some()
    }

    fn encoder_for(&self, family: ModelFamily) -> Option<&CoreBPE> {
        self.encoders
            .get(&family)
            .or_else(|| self.encoders.get(&ModelFamily::Default))
    }

    /// Count tokens in `text`. Empty text is always zero.
    pub fn count_tokens(&self, text: &str, family: ModelFamily) -> usize {
        if text.is_empty() {
            return 0;
        }

        match self.encoder_for(family) {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => self.estimate_tokens(text),
        }
    }

    /// Character-ratio estimate, independent of any tokenizer.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count() / self.chars_per_token
    }

    /// Count a chat transcript including provider framing.
    ///
    /// Each message costs its field tokens plus a fixed overhead; a `name`
    /// field is one token cheaper than its text. The reply priming overhead
    /// is added once for the whole list.
    pub fn count_messages_tokens(&self, messages: &[ChatMessage], family: ModelFamily) -> usize {
        let body: usize = messages
            .iter()
            .map(|message| {
                let mut tokens = self.message_overhead_tokens
                    + self.count_tokens(&message.role, family)
                    + self.count_tokens(&message.content, family);
                if let Some(name) = &message.name {
                    tokens += self.count_tokens(name, family).saturating_sub(1);
                }
                tokens
            })
            .sum();

        body + self.reply_priming_tokens
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }
}

fn load_encoder(family: ModelFamily) -> Result<CoreBPE, String> {
    let loaded = match family {
        ModelFamily::Gpt4 => tiktoken_rs::get_bpe_from_model("gpt-4"),
        ModelFamily::Gpt35 => tiktoken_rs::get_bpe_from_model("gpt-3.5-turbo"),
        ModelFamily::Default => tiktoken_rs::cl100k_base(),
    };
    loaded.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristic() -> TokenCounter {
        TokenCounter::heuristic(&ContextFitConfig::default())
    }

    #[test]
    fn test_count_tokens_empty() {
        assert_eq!(heuristic().count_tokens("", ModelFamily::Default), 0);
        assert_eq!(TokenCounter::default().count_tokens("", ModelFamily::Gpt4), 0);
    }

    #[test]
    fn test_heuristic_is_chars_over_four() {
        let counter = heuristic();
        assert_eq!(counter.count_tokens("abcdefgh", ModelFamily::Default), 2);
        assert_eq!(counter.count_tokens("abc", ModelFamily::Gpt4), 0);
        // counts characters, not bytes
        assert_eq!(counter.count_tokens("日本語日本語日本", ModelFamily::Default), 2);
    }

    #[test]
    fn test_heuristic_capabilities() {
        let capabilities = heuristic().capabilities();
        assert!(capabilities.precise.is_empty());
        assert_eq!(capabilities.heuristic_only.len(), 3);
        assert!(!capabilities.is_precise(ModelFamily::Gpt4));
    }

    #[test]
    fn test_tiktoken_counter_is_precise() {
        let counter = TokenCounter::default();
        assert!(counter.is_precise(ModelFamily::Default));
        assert!(counter.capabilities().heuristic_only.is_empty());

        let tokens = counter.count_tokens("Hello, world!", ModelFamily::Gpt4);
        assert!(tokens > 0 && tokens < 10, "got {}", tokens);
    }

    #[test]
    fn test_tiktoken_scales_with_length() {
        let counter = TokenCounter::default();
        let short = counter.count_tokens("The quick brown fox.", ModelFamily::Default);
        let long = counter.count_tokens(&"The quick brown fox. ".repeat(20), ModelFamily::Default);
        assert!(long > short * 10);
    }

    #[test]
    fn test_count_messages_tokens_overhead() {
        let counter = heuristic();
        let messages = vec![
            ChatMessage::new("user", "abcdefgh"),
            ChatMessage::new("assistant", "abcd"),
        ];
        // user: 4 + 1 + 2, assistant: 4 + 2 + 1, priming: 2
        assert_eq!(counter.count_messages_tokens(&messages, ModelFamily::Default), 16);
    }

    #[test]
    fn test_count_messages_tokens_name_discount() {
        let counter = heuristic();
        let plain = vec![ChatMessage::new("user", "")];
        let named = vec![ChatMessage::new("user", "").with_name("abcdefgh")];
        let plain_tokens = counter.count_messages_tokens(&plain, ModelFamily::Default);
        let named_tokens = counter.count_messages_tokens(&named, ModelFamily::Default);
        assert_eq!(named_tokens, plain_tokens + 1);
    }

    #[test]
    fn test_count_messages_empty_list_is_priming_only() {
        assert_eq!(heuristic().count_messages_tokens(&[], ModelFamily::Default), 2);
    }
}
