//! Content Summarizer Module
//!
//! Reduces content to a token target while keeping the sentences most likely
//! to matter.
//!
//! # Strategies
//!
//! - `Extractive`: rank sentences by [`score_sentence`], accept greedily,
//!   emit in document order
//! - `Structural`: even per-paragraph shares, oversized paragraphs
//!   compressed extractively
//! - `KeywordFocused`: keyword-bearing sentences first, backfilled when
//!   they leave most of the budget unused
//! - `Hybrid`: keyword pass plus extractive fill when keywords are given,
//!   otherwise structural with an extractive fallback
//!
//! # Fallback Hierarchy
//!
//! 1. Content already within target: returned unchanged
//! 2. Target of zero: omitted-content placeholder
//! 3. Strategy output within target: kept
//! 4. Otherwise: hard truncation to the largest fitting character prefix,
//!    flagged in [`SummaryMetadata::truncated`]

use crate::config::ContextFitConfig;
use crate::scoring::{extract_key_points, score_sentence};
use crate::text::{contains_any_keyword, extract_keywords, split_paragraphs, split_sentences};
use crate::token_counter::TokenCounter;
use crate::types::{
    FileContent, ModelFamily, StrategyUsed, SummarizationStrategy, SummaryMetadata, SummaryResult,
};
use std::sync::Arc;

/// Name used in placeholders when content has no filename
pub const UNNAMED_CONTENT: &str = "content";

/// Marker emitted in place of content that has no budget left.
pub fn omitted_placeholder(filename: &str) -> String {
    format!("[File: {} - Content omitted due to token limits]", filename)
}

/// Per-call summarization parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummarizeOptions {
    pub strategy: SummarizationStrategy,
    pub model_family: ModelFamily,
    /// Caller-supplied relevance terms; empty means none
    pub context_keywords: Vec<String>,
}

impl SummarizeOptions {
    pub fn new(strategy: SummarizationStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_model_family(mut self, model_family: ModelFamily) -> Self {
        self.model_family = model_family;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();
        self
    }
}

/// Sentences of one text with their token counts.
struct Sentences<'a> {
    text: Vec<&'a str>,
    tokens: Vec<usize>,
}

impl Sentences<'_> {
    fn len(&self) -> usize {
        self.text.len()
    }
}

/// Long-lived summarization service. Holds no per-call state.
#[derive(Debug, Clone)]
pub struct ContentSummarizer {
    counter: Arc<TokenCounter>,
    keyword_backfill_threshold: f64,
    hybrid_keyword_share: f64,
    hybrid_structural_share: f64,
    max_key_points: usize,
    max_keywords_autoextracted: usize,
}

impl ContentSummarizer {
    pub fn new(counter: Arc<TokenCounter>, config: &ContextFitConfig) -> Self {
        Self {
            counter,
            keyword_backfill_threshold: config.keyword_backfill_threshold,
            hybrid_keyword_share: config.hybrid_keyword_share,
            hybrid_structural_share: config.hybrid_structural_share,
            max_key_points: config.max_key_points,
            max_keywords_autoextracted: config.max_keywords_autoextracted,
        }
    }

    pub fn token_counter(&self) -> &Arc<TokenCounter> {
        &self.counter
    }

    /// Summarize anonymous content to at most `target_tokens`.
    pub fn summarize(
        &self,
        content: &str,
        target_tokens: usize,
        options: &SummarizeOptions,
    ) -> SummaryResult {
        self.summarize_named(UNNAMED_CONTENT, content, target_tokens, options)
    }

    /// Summarize one file; its name appears in the omitted-content marker.
    pub fn summarize_file(
        &self,
        file: &FileContent,
        target_tokens: usize,
        options: &SummarizeOptions,
    ) -> SummaryResult {
        self.summarize_named(&file.filename, &file.content, target_tokens, options)
    }

    fn summarize_named(
        &self,
        name: &str,
        content: &str,
        target_tokens: usize,
        options: &SummarizeOptions,
    ) -> SummaryResult {
        let family = options.model_family;
        let original_tokens = self.count(content, family);

        if original_tokens <= target_tokens {
            tracing::debug!(
                source = %name,
                tokens = original_tokens,
                target_tokens,
                "Content within target, no compression needed"
            );
            return SummaryResult::new(
                content.to_string(),
                content.to_string(),
                original_tokens,
                original_tokens,
                StrategyUsed::NoneNeeded,
                extract_key_points(content, self.max_key_points),
                SummaryMetadata {
                    target_tokens: Some(target_tokens),
                    no_compression_needed: true,
                    ..Default::default()
                },
            );
        }

        if target_tokens == 0 {
            return self.placeholder(name, content, original_tokens, family);
        }

        let summary = match options.strategy {
            SummarizationStrategy::Extractive => {
                self.extractive(content, target_tokens, &options.context_keywords, family)
            }
            SummarizationStrategy::Structural => self.structural(content, target_tokens, family),
            SummarizationStrategy::KeywordFocused => {
                self.keyword_focused(content, target_tokens, &options.context_keywords, family)
            }
            SummarizationStrategy::Hybrid => {
                self.hybrid(content, target_tokens, &options.context_keywords, family)
            }
        };

        let mut summarized_tokens = self.count(&summary, family);
        let mut summarized_content = summary;
        let mut truncated = false;

        if summarized_content.trim().is_empty() || summarized_tokens > target_tokens {
            tracing::warn!(
                source = %name,
                strategy = %options.strategy,
                produced_tokens = summarized_tokens,
                target_tokens,
                "Summary did not fit target, falling back to hard truncation"
            );
            summarized_content = self.truncate_to(content, target_tokens, family);
            summarized_tokens = self.count(&summarized_content, family);
            truncated = true;
        }

        tracing::debug!(
            source = %name,
            strategy = %options.strategy,
            original_tokens,
            summarized_tokens,
            "Summarized content"
        );

        let key_points = extract_key_points(&summarized_content, self.max_key_points);
        let mut result = SummaryResult::new(
            content.to_string(),
            summarized_content,
            original_tokens,
            summarized_tokens,
            StrategyUsed::from(options.strategy),
            key_points,
            SummaryMetadata {
                target_tokens: Some(target_tokens),
                truncated,
                ..Default::default()
            },
        );
        result.metadata.tokens_saved = result.tokens_saved();
        result.metadata.compression_percentage =
            ((1.0 - result.compression_ratio) * 1000.0).round() / 10.0;
        result
    }

    /// Summarize files in order, carrying unused budget forward.
    ///
    /// Each file may use at most `min(total / n, remaining)`; `remaining`
    /// drops by what each file actually used. Once it reaches zero the
    /// remaining files get the omitted-content placeholder. Order matters:
    /// an early file that compresses poorly starves later ones.
    pub fn batch_summarize(
        &self,
        files: &[FileContent],
        total_target_tokens: usize,
        options: &SummarizeOptions,
    ) -> Vec<SummaryResult> {
        if files.is_empty() {
            return Vec::new();
        }

        let per_file = total_target_tokens / files.len();
        let mut remaining = total_target_tokens;
        let mut results = Vec::with_capacity(files.len());

        for file in files {
            let allocation = per_file.min(remaining);
            let result = self.summarize_file(file, allocation, options);
            if result.strategy_used != StrategyUsed::BudgetExceeded {
                remaining = remaining.saturating_sub(result.summarized_tokens);
            }
            results.push(result);
        }

        tracing::debug!(
            files = files.len(),
            total_target_tokens,
            remaining,
            "Batch summarization complete"
        );
        results
    }

    fn count(&self, text: &str, family: ModelFamily) -> usize {
        self.counter.count_tokens(text, family)
    }

    fn placeholder(
        &self,
        name: &str,
        content: &str,
        original_tokens: usize,
        family: ModelFamily,
    ) -> SummaryResult {
        tracing::warn!(
            source = %name,
            original_tokens,
            "Token budget exhausted, content omitted"
        );
        let marker = omitted_placeholder(name);
        let marker_tokens = self.count(&marker, family);
        let mut result = SummaryResult::new(
            content.to_string(),
            marker,
            original_tokens,
            marker_tokens,
            StrategyUsed::BudgetExceeded,
            Vec::new(),
            SummaryMetadata {
                target_tokens: Some(0),
                budget_exceeded: true,
                ..Default::default()
            },
        );
        result.metadata.tokens_saved = result.tokens_saved();
        result
    }

    fn sentences<'a>(&self, text: &'a str, family: ModelFamily) -> Sentences<'a> {
        let text = split_sentences(text);
        let tokens = text.iter().map(|s| self.count(s, family)).collect();
        Sentences { text, tokens }
    }

    /// Indices ordered by descending score; ties keep document order.
    fn rank(
        &self,
        sentences: &Sentences<'_>,
        candidates: impl IntoIterator<Item = usize>,
        keywords: &[String],
    ) -> Vec<usize> {
        let mut scored: Vec<(usize, f64)> = candidates
            .into_iter()
            .map(|i| (i, score_sentence(sentences.text[i], keywords)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().map(|(i, _)| i).collect()
    }

    /// Accept candidates in the given order while the running sum fits.
    ///
    /// The scan does not stop at the first candidate that fails to fit: that
    /// candidate is skipped, and shorter lower-ranked sentences after it may
    /// still be accepted into the leftover budget.
    fn accept(
        sentences: &Sentences<'_>,
        order: impl IntoIterator<Item = usize>,
        budget: usize,
        used: &mut usize,
        accepted: &mut Vec<usize>,
    ) {
        for i in order {
            let tokens = sentences.tokens[i];
            if *used + tokens <= budget {
                *used += tokens;
                accepted.push(i);
            }
        }
    }

    /// Join accepted sentences in document order, dropping the most recently
    /// accepted ones while separators push the joined text over `budget`.
    fn assemble(
        &self,
        sentences: &Sentences<'_>,
        mut accepted: Vec<usize>,
        budget: usize,
        family: ModelFamily,
    ) -> String {
        loop {
            let mut ordered = accepted.clone();
            ordered.sort_unstable();
            let text = ordered
                .iter()
                .map(|i| sentences.text[*i])
                .collect::<Vec<_>>()
                .join(" ");
            if accepted.is_empty() || self.count(&text, family) <= budget {
                return text;
            }
            accepted.pop();
        }
    }

    fn extractive(
        &self,
        content: &str,
        target_tokens: usize,
        keywords: &[String],
        family: ModelFamily,
    ) -> String {
        let sentences = self.sentences(content, family);
        let order = self.rank(&sentences, 0..sentences.len(), keywords);

        let mut used = 0;
        let mut accepted = Vec::new();
        Self::accept(&sentences, order, target_tokens, &mut used, &mut accepted);

        self.assemble(&sentences, accepted, target_tokens, family)
    }

    fn structural(&self, content: &str, target_tokens: usize, family: ModelFamily) -> String {
        let mut paragraphs = split_paragraphs(content);
        if paragraphs.len() <= 1 {
            paragraphs = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
        }
        if paragraphs.is_empty() {
            return String::new();
        }

        let share = target_tokens / paragraphs.len();
        let mut remaining = target_tokens;
        let mut kept: Vec<String> = Vec::new();

        for paragraph in paragraphs {
            if remaining == 0 {
                break;
            }
            let limit = share.min(remaining);
            let tokens = self.count(paragraph, family);

            let (text, tokens) = if tokens <= limit {
                (paragraph.to_string(), tokens)
            } else {
                let compressed = self.extractive(paragraph, limit, &[], family);
                let tokens = self.count(&compressed, family);
                (compressed, tokens)
            };

            if !text.is_empty() {
                remaining = remaining.saturating_sub(tokens);
                kept.push(text);
            }
        }

        // paragraph separators are not part of any share
        loop {
            let joined = kept.join("\n\n");
            if kept.len() <= 1 || self.count(&joined, family) <= target_tokens {
                return joined;
            }
            kept.pop();
        }
    }

    fn keyword_focused(
        &self,
        content: &str,
        target_tokens: usize,
        keywords: &[String],
        family: ModelFamily,
    ) -> String {
        let sentences = self.sentences(content, family);
        let keywords = self.effective_keywords(content, keywords);
        let (accepted, _) = self.keyword_select(&sentences, target_tokens, &keywords);
        self.assemble(&sentences, accepted, target_tokens, family)
    }

    fn effective_keywords(&self, content: &str, keywords: &[String]) -> Vec<String> {
        if keywords.is_empty() {
            extract_keywords(content, self.max_keywords_autoextracted)
        } else {
            keywords.to_vec()
        }
    }

    /// Keyword sentences in document order, then non-keyword backfill when
    /// the keyword pass used less than the backfill threshold.
    fn keyword_select(
        &self,
        sentences: &Sentences<'_>,
        budget: usize,
        keywords: &[String],
    ) -> (Vec<usize>, usize) {
        let (matching, other): (Vec<usize>, Vec<usize>) = (0..sentences.len())
            .partition(|i| contains_any_keyword(sentences.text[*i], keywords));

        let mut used = 0;
        let mut accepted = Vec::new();
        Self::accept(sentences, matching, budget, &mut used, &mut accepted);

        if (used as f64) < budget as f64 * self.keyword_backfill_threshold {
            Self::accept(sentences, other, budget, &mut used, &mut accepted);
        }

        (accepted, used)
    }

    fn hybrid(
        &self,
        content: &str,
        target_tokens: usize,
        keywords: &[String],
        family: ModelFamily,
    ) -> String {
        if keywords.is_empty() {
            let structural_budget =
                (target_tokens as f64 * self.hybrid_structural_share).floor() as usize;
            let structural = self.structural(content, structural_budget, family);
            if !structural.trim().is_empty() && self.count(&structural, family) <= target_tokens {
                return structural;
            }
            tracing::debug!("Structural pass did not fit, using extractive");
            return self.extractive(content, target_tokens, keywords, family);
        }

        let sentences = self.sentences(content, family);
        let keyword_budget = (target_tokens as f64 * self.hybrid_keyword_share).floor() as usize;
        let (mut accepted, mut used) = self.keyword_select(&sentences, keyword_budget, keywords);

        let mut taken = vec![false; sentences.len()];
        for &i in &accepted {
            taken[i] = true;
        }
        let leftover: Vec<usize> = (0..sentences.len()).filter(|&i| !taken[i]).collect();
        let order = self.rank(&sentences, leftover, keywords);
        Self::accept(&sentences, order, target_tokens, &mut used, &mut accepted);

        self.assemble(&sentences, accepted, target_tokens, family)
    }

    /// Largest character prefix of `content` that fits `target_tokens`.
    fn truncate_to(&self, content: &str, target_tokens: usize, family: ModelFamily) -> String {
        let boundaries: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();

        // boundaries[k] is the byte end of a k-character prefix
        let prefix = |k: usize| content.get(..boundaries[k]).unwrap_or_default();

        let mut lo = 0;
        let mut hi = boundaries.len() - 1;
        while lo < hi {
            let mid = lo + (hi - lo).div_ceil(2);
            if self.count(prefix(mid), family) <= target_tokens {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        prefix(lo).trim_end().to_string()
    }
}
