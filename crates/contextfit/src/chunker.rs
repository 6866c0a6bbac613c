//! Content Chunker Module
//!
//! Splits oversized content into bounded, ordered [`ChunkInfo`] fragments.
//!
//! # Strategies
//!
//! - `Semantic`: accumulate paragraphs; an oversized paragraph is split by
//!   sentences with the same accumulation rule
//! - `SlidingWindow`: word windows of `max_tokens` width sharing an overlap
//! - `DocumentSections`: one chunk per detected header section, oversized
//!   sections reduced semantically
//! - `Uniform`: word windows with no overlap and no boundary awareness
//!
//! Word windows are sized from the measured words-per-token ratio of the
//! whole input, then tightened until each window of more than one word fits.
//! Chunks are annotated with their index and sibling count only once the
//! full split is known.

use crate::config::{ContextFitConfig, DEFAULT_CHUNKING_OVERLAP_TOKENS};
use crate::text::{split_paragraphs, split_sections, split_sentences, word_count, words};
use crate::token_counter::TokenCounter;
use crate::types::{ChunkInfo, ChunkMetadata, ChunkingStrategy, ModelFamily};
use std::sync::Arc;

/// Words per token assumed when the input counts as zero tokens
const FALLBACK_WORDS_PER_TOKEN: f64 = 0.75;

/// Extra tokens budgeted per join on top of the separator's own count,
/// covering merges at unit boundaries
const JOIN_ALLOWANCE_TOKENS: usize = 1;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

const SENTENCE_SEPARATOR: &str = " ";

/// Source name used when the caller does not supply one
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Parameters for one chunking call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOptions {
    pub max_tokens: usize,
    pub strategy: ChunkingStrategy,
    /// Only used by the sliding-window strategy
    pub overlap_tokens: usize,
    pub source_name: String,
    pub model_family: ModelFamily,
}

impl ChunkOptions {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            strategy: ChunkingStrategy::default(),
            overlap_tokens: DEFAULT_CHUNKING_OVERLAP_TOKENS,
            source_name: UNKNOWN_SOURCE.to_string(),
            model_family: ModelFamily::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ChunkingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_overlap(mut self, overlap_tokens: usize) -> Self {
        self.overlap_tokens = overlap_tokens;
        self
    }

    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn with_model_family(mut self, model_family: ModelFamily) -> Self {
        self.model_family = model_family;
        self
    }
}

/// Split output before annotation.
#[derive(Debug)]
struct Piece {
    content: String,
    tokens: usize,
    exceeds_max_tokens: bool,
}

/// Chunk under construction.
///
/// Units are counted once when added; the running size is their sum plus
/// `join_allowance` per separator. Only a closing chunk is counted as a
/// whole, so building a chunk stays linear in its length.
#[derive(Debug)]
struct Accumulator<'a> {
    units: Vec<(&'a str, usize)>,
    /// Sum of unit tokens plus one allowance per unit
    running: usize,
    separator: &'static str,
    join_allowance: usize,
}

impl<'a> Accumulator<'a> {
    fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn estimate_with(&self, tokens: usize) -> usize {
        self.running + tokens
    }

    fn push(&mut self, unit: &'a str, tokens: usize) {
        self.running += tokens + self.join_allowance;
        self.units.push((unit, tokens));
    }

    fn drain_front(&mut self, count: usize) {
        for (_, tokens) in self.units.drain(..count) {
            self.running -= tokens + self.join_allowance;
        }
    }

    fn joined(&self, count: usize) -> String {
        self.units
            .iter()
            .take(count)
            .map(|(unit, _)| *unit)
            .collect::<Vec<_>>()
            .join(self.separator)
    }
}

/// Long-lived chunking service. Holds no per-call state.
#[derive(Debug, Clone)]
pub struct ContentChunker {
    counter: Arc<TokenCounter>,
    default_overlap_tokens: usize,
}

impl ContentChunker {
    pub fn new(counter: Arc<TokenCounter>, config: &ContextFitConfig) -> Self {
        Self {
            counter,
            default_overlap_tokens: config.chunking_overlap_tokens,
        }
    }

    /// Options prefilled with the configured overlap.
    pub fn options(&self, max_tokens: usize) -> ChunkOptions {
        ChunkOptions::new(max_tokens).with_overlap(self.default_overlap_tokens)
    }

    pub fn token_counter(&self) -> &Arc<TokenCounter> {
        &self.counter
    }

    /// Split `content` into chunks of at most `options.max_tokens`.
    ///
    /// Content that already fits, including empty content, comes back as a
    /// single chunk.
    pub fn chunk(&self, content: &str, options: &ChunkOptions) -> Vec<ChunkInfo> {
        let family = options.model_family;
        let total_tokens = self.counter.count_tokens(content, family);

        if total_tokens <= options.max_tokens {
            tracing::debug!(
                source = %options.source_name,
                tokens = total_tokens,
                "Content fits in a single chunk"
            );
            let mut chunks = annotate(
                vec![Piece {
                    content: content.to_string(),
                    tokens: total_tokens,
                    exceeds_max_tokens: false,
                }],
                options,
            );
            for chunk in &mut chunks {
                chunk.metadata.original_length = Some(content.chars().count());
            }
            return chunks;
        }

        let mut pieces = match options.strategy {
            ChunkingStrategy::Semantic => self.semantic(content, options.max_tokens, family),
            ChunkingStrategy::SlidingWindow => self.word_windows(
                content,
                options.max_tokens,
                options.overlap_tokens,
                total_tokens,
                family,
            ),
            ChunkingStrategy::DocumentSections => self.sections(content, options.max_tokens, family),
            ChunkingStrategy::Uniform => {
                self.word_windows(content, options.max_tokens, 0, total_tokens, family)
            }
        };

        // whitespace-only content can count as tokens yet yield no boundaries
        if pieces.is_empty() {
            pieces.push(Piece {
                content: content.to_string(),
                tokens: total_tokens,
                exceeds_max_tokens: true,
            });
        }

        let chunks = annotate(pieces, options);
        tracing::debug!(
            source = %options.source_name,
            strategy = %options.strategy,
            tokens = total_tokens,
            max_tokens = options.max_tokens,
            chunks = chunks.len(),
            "Chunked content"
        );
        chunks
    }

    fn semantic(&self, content: &str, max_tokens: usize, family: ModelFamily) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut current = self.accumulator(PARAGRAPH_SEPARATOR, family);

        for paragraph in split_paragraphs(content) {
            let tokens = self.counter.count_tokens(paragraph, family);
            if tokens > max_tokens {
                self.close_all(&mut pieces, &mut current, max_tokens, family);
                pieces.extend(self.sentence_groups(paragraph, max_tokens, family));
                continue;
            }
            self.accumulate(&mut pieces, &mut current, paragraph, tokens, max_tokens, family);
        }
        self.close_all(&mut pieces, &mut current, max_tokens, family);

        pieces
    }

    fn sentence_groups(&self, paragraph: &str, max_tokens: usize, family: ModelFamily) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut current = self.accumulator(SENTENCE_SEPARATOR, family);

        for sentence in split_sentences(paragraph) {
            let tokens = self.counter.count_tokens(sentence, family);
            if tokens > max_tokens {
                // kept whole, flagged through `exceeds_max_tokens`
                self.close_all(&mut pieces, &mut current, max_tokens, family);
                pieces.push(Piece {
                    content: sentence.to_string(),
                    tokens,
                    exceeds_max_tokens: true,
                });
                continue;
            }
            self.accumulate(&mut pieces, &mut current, sentence, tokens, max_tokens, family);
        }
        self.close_all(&mut pieces, &mut current, max_tokens, family);

        pieces
    }

    fn accumulator<'a>(&self, separator: &'static str, family: ModelFamily) -> Accumulator<'a> {
        Accumulator {
            units: Vec::new(),
            running: 0,
            separator,
            join_allowance: self.counter.count_tokens(separator, family) + JOIN_ALLOWANCE_TOKENS,
        }
    }

    /// Add a pre-counted unit, closing chunks while the running estimate
    /// says it would not fit.
    fn accumulate<'a>(
        &self,
        pieces: &mut Vec<Piece>,
        current: &mut Accumulator<'a>,
        unit: &'a str,
        tokens: usize,
        max_tokens: usize,
        family: ModelFamily,
    ) {
        while !current.is_empty() && current.estimate_with(tokens) > max_tokens {
            self.close(pieces, current, max_tokens, family);
        }
        current.push(unit, tokens);
    }

    /// Emit the longest run of leading units whose joined text fits, counted
    /// exactly. Units that do not fit stay in `current` for the next chunk.
    fn close(
        &self,
        pieces: &mut Vec<Piece>,
        current: &mut Accumulator<'_>,
        max_tokens: usize,
        family: ModelFamily,
    ) {
        let mut keep = current.units.len();
        loop {
            let content = current.joined(keep);
            let tokens = self.counter.count_tokens(&content, family);
            if tokens <= max_tokens || keep <= 1 {
                pieces.push(Piece {
                    content,
                    tokens,
                    exceeds_max_tokens: tokens > max_tokens,
                });
                current.drain_front(keep);
                return;
            }

            // shed trailing units worth at least the overshoot before recounting
            let overshoot = tokens - max_tokens;
            let mut shed = 0;
            while keep > 1 && shed < overshoot {
                keep -= 1;
                shed += current.units[keep].1 + current.join_allowance;
            }
        }
    }

    fn close_all(
        &self,
        pieces: &mut Vec<Piece>,
        current: &mut Accumulator<'_>,
        max_tokens: usize,
        family: ModelFamily,
    ) {
        while !current.is_empty() {
            self.close(pieces, current, max_tokens, family);
        }
    }

    fn sections(&self, content: &str, max_tokens: usize, family: ModelFamily) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for section in split_sections(content) {
            let tokens = self.counter.count_tokens(&section, family);
            if tokens <= max_tokens {
                pieces.push(Piece {
                    content: section,
                    tokens,
                    exceeds_max_tokens: false,
                });
            } else {
                pieces.extend(self.semantic(&section, max_tokens, family));
            }
        }
        pieces
    }

    fn word_windows(
        &self,
        content: &str,
        max_tokens: usize,
        overlap_tokens: usize,
        total_tokens: usize,
        family: ModelFamily,
    ) -> Vec<Piece> {
        let words = words(content);
        if words.is_empty() {
            return Vec::new();
        }

        let words_per_token = if total_tokens == 0 {
            FALLBACK_WORDS_PER_TOKEN
        } else {
            words.len() as f64 / total_tokens as f64
        };
        let chunk_words = ((max_tokens as f64 * words_per_token).floor() as usize).max(1);
        let overlap_words = (overlap_tokens as f64 * words_per_token).floor() as usize;

        let mut pieces = Vec::new();
        let mut start = 0;
        loop {
            let mut end = (start + chunk_words).min(words.len());
            let mut text = words[start..end].join(" ");
            let mut tokens = self.counter.count_tokens(&text, family);

            while tokens > max_tokens && end - start > 1 {
                let len = end - start;
                let scaled = len * max_tokens / tokens.max(1);
                end = start + scaled.clamp(1, len - 1);
                text = words[start..end].join(" ");
                tokens = self.counter.count_tokens(&text, family);
            }

            pieces.push(Piece {
                content: text,
                tokens,
                exceeds_max_tokens: tokens > max_tokens,
            });

            if end >= words.len() {
                break;
            }
            let step = (end - start).saturating_sub(overlap_words).max(1);
            start += step;
        }

        pieces
    }
}

/// Second pass: number the pieces now that the total is known.
fn annotate(pieces: Vec<Piece>, options: &ChunkOptions) -> Vec<ChunkInfo> {
    let total_chunks = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, piece)| ChunkInfo {
            metadata: ChunkMetadata {
                character_count: piece.content.chars().count(),
                word_count: word_count(&piece.content),
                original_length: None,
                exceeds_max_tokens: piece.exceeds_max_tokens,
            },
            content: piece.content,
            tokens: piece.tokens,
            chunk_index,
            total_chunks,
            source_file: options.source_name.clone(),
            chunk_type: options.strategy,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> ContentChunker {
        let config = ContextFitConfig::default();
        ContentChunker::new(Arc::new(TokenCounter::heuristic(&config)), &config)
    }

    /// 100 three-character words, 399 chars, 99 heuristic tokens
    fn numbered_words() -> String {
        (0..100).map(|i| format!("w{:02}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_fast_path_single_chunk() {
        let chunks = chunker().chunk("small text", &ChunkOptions::new(100).with_source("a.txt"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "small text");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].source_file, "a.txt");
        assert_eq!(chunks[0].metadata.original_length, Some(10));
    }

    #[test]
    fn test_empty_content_single_chunk() {
        let chunks = chunker().chunk("", &ChunkOptions::new(0));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "");
        assert_eq!(chunks[0].tokens, 0);
    }

    #[test]
    fn test_semantic_groups_paragraphs() {
        let paragraph = "word ".repeat(8).trim().to_string();
        let content = [paragraph.as_str(); 3].join("\n\n");

        let chunks = chunker().chunk(&content, &ChunkOptions::new(20));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, format!("{}\n\n{}", paragraph, paragraph));
        assert_eq!(chunks[1].content, paragraph);
        assert!(chunks.iter().all(|c| c.tokens <= 20));
        assert!(chunks[1].is_last());
    }

    #[test]
    fn test_semantic_resplits_when_joined_count_overshoots() {
        // each "abc" counts 0 tokens alone, but three joined count 3
        let content = ["abc"; 5].join("\n\n");

        let chunks = chunker().chunk(&content, &ChunkOptions::new(2));
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abc\n\nabc", "abc\n\nabc", "abc"]);
        assert!(chunks.iter().all(|c| c.tokens <= 2 && !c.metadata.exceeds_max_tokens));
    }

    #[test]
    fn test_piece_tokens_are_exact_counts() {
        let content = "Alpha beta gamma delta. ".repeat(30);
        let chunker = chunker();
        let chunks = chunker.chunk(&content, &ChunkOptions::new(25));
        for chunk in &chunks {
            assert_eq!(
                chunk.tokens,
                chunker.token_counter().count_tokens(&chunk.content, ModelFamily::Default)
            );
        }
    }

    #[test]
    fn test_semantic_oversized_sentence_kept_whole() {
        let long = format!("{}.", "x".repeat(100));
        let content = format!("Short one. {}", long);

        let chunks = chunker().chunk(&content, &ChunkOptions::new(5));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Short one.");
        assert!(!chunks[0].metadata.exceeds_max_tokens);
        assert_eq!(chunks[1].content, long);
        assert!(chunks[1].metadata.exceeds_max_tokens);
    }

    #[test]
    fn test_sliding_window_overlap() {
        let content = numbered_words();
        let options = ChunkOptions::new(20)
            .with_strategy(ChunkingStrategy::SlidingWindow)
            .with_overlap(5);
        let chunks = chunker().chunk(&content, &options);

        assert_eq!(chunks.len(), 7);
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].content.split(' ').collect();
            let next: Vec<&str> = pair[1].content.split(' ').collect();
            assert_eq!(prev[prev.len() - 5..], next[..5]);
        }
        assert!(chunks.last().is_some_and(|c| c.content.ends_with("w99")));
    }

    #[test]
    fn test_uniform_partitions_words() {
        let content = numbered_words();
        let options = ChunkOptions::new(20).with_strategy(ChunkingStrategy::Uniform);
        let chunks = chunker().chunk(&content, &options);

        assert_eq!(chunks.len(), 5);
        let rebuilt: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt.join(" "), content);
        assert!(chunks.iter().all(|c| c.chunk_type == ChunkingStrategy::Uniform));
    }

    #[test]
    fn test_overlap_larger_than_window_still_advances() {
        let options = ChunkOptions::new(20)
            .with_strategy(ChunkingStrategy::SlidingWindow)
            .with_overlap(50);
        let chunks = chunker().chunk(&numbered_words(), &options);
        assert_eq!(chunks.len(), 81);
        assert_eq!(chunks[80].total_chunks, 81);
    }

    #[test]
    fn test_document_sections() {
        let content = "# Intro\nSome intro text.\n# Details\nMore details here.";
        let options = ChunkOptions::new(7).with_strategy(ChunkingStrategy::DocumentSections);
        let chunks = chunker().chunk(content, &options);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "# Intro\nSome intro text.");
        assert_eq!(chunks[1].content, "# Details\nMore details here.");
    }

    #[test]
    fn test_indices_contiguous() {
        let content = "Sentence number one here. ".repeat(40);
        let chunks = chunker().chunk(&content, &ChunkOptions::new(15));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.total_chunks, chunks.len());
        }
    }

    #[test]
    fn test_options_use_configured_overlap() {
        let config = ContextFitConfig {
            chunking_overlap_tokens: 42,
            ..Default::default()
        };
        let chunker = ContentChunker::new(Arc::new(TokenCounter::heuristic(&config)), &config);
        assert_eq!(chunker.options(10).overlap_tokens, 42);
    }
}
