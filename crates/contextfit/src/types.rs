//! Core type definitions for the content reduction pipeline.
//!
//! Everything in this module is plain data: budgets, chunks, summaries and
//! analysis reports are created fresh per call, carry no behaviour beyond
//! small derived accessors, and serialize to JSON for transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while loading configuration or parsing user-facing names.
///
/// Counting, chunking, summarizing and analysis never fail; they degrade to
/// documented approximations instead.
#[derive(Debug, Error)]
pub enum ContextError {
    /// IO error while reading a configuration file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file with an extension we cannot parse
    #[error("Unsupported configuration file: {0}")]
    UnsupportedConfigFile(PathBuf),

    /// Unknown chunking or summarization strategy name
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Unknown model family name
    #[error("Unknown model family: {0}")]
    UnknownModelFamily(String),
}

impl From<serde_json::Error> for ContextError {
    fn from(err: serde_json::Error) -> Self {
        ContextError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ContextError {
    fn from(err: serde_yaml::Error) -> Self {
        ContextError::Serialization(err.to_string())
    }
}

// ============================================================================
// Model Family
// ============================================================================

/// Tokenization scheme family used for counting.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ModelFamily {
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5")]
    Gpt35,
    /// Generic scheme covering most modern instruction-tuned models
    #[default]
    #[serde(rename = "default")]
    Default,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [ModelFamily::Gpt4, ModelFamily::Gpt35, ModelFamily::Default];

    /// Pick the counting family for a free-form model identifier.
    ///
    /// Claude, Gemini, Llama and anything unrecognised count with the
    /// default scheme.
    pub fn from_model_id(model_id: &str) -> Self {
        let lower = model_id.to_lowercase();
        if lower.contains("gpt-4") {
            ModelFamily::Gpt4
        } else if lower.contains("gpt-3.5") {
            ModelFamily::Gpt35
        } else {
            ModelFamily::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Gpt4 => "gpt-4",
            ModelFamily::Gpt35 => "gpt-3.5",
            ModelFamily::Default => "default",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gpt-4" | "gpt4" => Ok(ModelFamily::Gpt4),
            "gpt-3.5" | "gpt35" => Ok(ModelFamily::Gpt35),
            "default" => Ok(ModelFamily::Default),
            other => Err(ContextError::UnknownModelFamily(other.to_string())),
        }
    }
}

// ============================================================================
// Token Budget
// ============================================================================

/// Partition of a model's context window into named allocations.
///
/// `file_content` is derived: whatever is left of `max_context` after the four
/// fixed reservations, floored at zero. Fields are private so the derived
/// value cannot drift from its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BudgetAllocations")]
pub struct TokenBudget {
    max_context: usize,
    system_prompt: usize,
    user_prompt: usize,
    web_search: usize,
    response_buffer: usize,
    file_content: usize,
}

/// The independent inputs of a [`TokenBudget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAllocations {
    pub max_context: usize,
    pub system_prompt: usize,
    pub user_prompt: usize,
    pub web_search: usize,
    pub response_buffer: usize,
}

impl From<BudgetAllocations> for TokenBudget {
    fn from(allocations: BudgetAllocations) -> Self {
        TokenBudget::new(allocations)
    }
}

impl TokenBudget {
    pub fn new(allocations: BudgetAllocations) -> Self {
        let reserved = allocations
            .system_prompt
            .saturating_add(allocations.user_prompt)
            .saturating_add(allocations.web_search)
            .saturating_add(allocations.response_buffer);

        Self {
            max_context: allocations.max_context,
            system_prompt: allocations.system_prompt,
            user_prompt: allocations.user_prompt,
            web_search: allocations.web_search,
            response_buffer: allocations.response_buffer,
            file_content: allocations.max_context.saturating_sub(reserved),
        }
    }

    pub fn max_context(&self) -> usize {
        self.max_context
    }

    pub fn system_prompt(&self) -> usize {
        self.system_prompt
    }

    pub fn user_prompt(&self) -> usize {
        self.user_prompt
    }

    pub fn web_search(&self) -> usize {
        self.web_search
    }

    pub fn response_buffer(&self) -> usize {
        self.response_buffer
    }

    /// Tokens left for file content after the fixed reservations.
    pub fn file_content(&self) -> usize {
        self.file_content
    }

    /// Sum of the four fixed reservations.
    pub fn reserved_tokens(&self) -> usize {
        self.system_prompt
            .saturating_add(self.user_prompt)
            .saturating_add(self.web_search)
            .saturating_add(self.response_buffer)
    }

    /// Token count at which reduction should be triggered proactively.
    pub fn soft_limit(&self, threshold: f64) -> f64 {
        self.max_context as f64 * threshold
    }

    pub fn allocations(&self) -> BudgetAllocations {
        BudgetAllocations {
            max_context: self.max_context,
            system_prompt: self.system_prompt,
            user_prompt: self.user_prompt,
            web_search: self.web_search,
            response_buffer: self.response_buffer,
        }
    }
}

/// Caller adjustments applied before `file_content` is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetOverrides {
    pub max_context: Option<usize>,
    pub system_prompt: Option<usize>,
    pub user_prompt: Option<usize>,
    pub web_search: Option<usize>,
    pub response_buffer: Option<usize>,
}

impl BudgetOverrides {
    pub fn apply(&self, base: BudgetAllocations) -> BudgetAllocations {
        BudgetAllocations {
            max_context: self.max_context.unwrap_or(base.max_context),
            system_prompt: self.system_prompt.unwrap_or(base.system_prompt),
            user_prompt: self.user_prompt.unwrap_or(base.user_prompt),
            web_search: self.web_search.unwrap_or(base.web_search),
            response_buffer: self.response_buffer.unwrap_or(base.response_buffer),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == BudgetOverrides::default()
    }
}

// ============================================================================
// Files
// ============================================================================

/// One uploaded document, already decoded to text upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub filename: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub content: String,
}

impl FileContent {
    pub fn new(
        filename: impl Into<String>,
        file_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            file_type: file_type.into(),
            content: content.into(),
        }
    }

    /// Plain-text file, the common case in tests and the CLI.
    pub fn text(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(filename, "text", content)
    }
}

/// A single role/content pair in provider chat format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

// ============================================================================
// Chunking Types
// ============================================================================

/// How a document is split into bounded chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Paragraph accumulation, falling back to sentences
    #[default]
    Semantic,
    /// Overlapping word windows
    SlidingWindow,
    /// Structural headers as boundaries
    DocumentSections,
    /// Fixed word windows, no overlap
    Uniform,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Semantic => "semantic",
            ChunkingStrategy::SlidingWindow => "sliding_window",
            ChunkingStrategy::DocumentSections => "document_sections",
            ChunkingStrategy::Uniform => "uniform",
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "semantic" => Ok(ChunkingStrategy::Semantic),
            "sliding_window" => Ok(ChunkingStrategy::SlidingWindow),
            "document_sections" | "sections" => Ok(ChunkingStrategy::DocumentSections),
            "uniform" => Ok(ChunkingStrategy::Uniform),
            other => Err(ContextError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Descriptive counts attached to every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub character_count: usize,
    pub word_count: usize,
    /// Set only on the single chunk returned by the fast path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
    /// A lone sentence that could not fit and was kept whole
    #[serde(default)]
    pub exceeds_max_tokens: bool,
}

/// One fragment of a larger document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub content: String,
    pub tokens: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub source_file: String,
    pub chunk_type: ChunkingStrategy,
    pub metadata: ChunkMetadata,
}

impl ChunkInfo {
    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 == self.total_chunks
    }
}

// ============================================================================
// Summarization Types
// ============================================================================

/// Selectable summarization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizationStrategy {
    Extractive,
    Structural,
    KeywordFocused,
    #[default]
    Hybrid,
}

impl SummarizationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummarizationStrategy::Extractive => "extractive",
            SummarizationStrategy::Structural => "structural",
            SummarizationStrategy::KeywordFocused => "keyword_focused",
            SummarizationStrategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SummarizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummarizationStrategy {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "extractive" => Ok(SummarizationStrategy::Extractive),
            "structural" => Ok(SummarizationStrategy::Structural),
            "keyword_focused" | "keyword" | "keywords" => Ok(SummarizationStrategy::KeywordFocused),
            "hybrid" => Ok(SummarizationStrategy::Hybrid),
            other => Err(ContextError::UnknownStrategy(other.to_string())),
        }
    }
}

/// What actually produced a [`SummaryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyUsed {
    /// Content already fit; returned unchanged
    NoneNeeded,
    /// No budget left; content replaced by the omitted marker
    BudgetExceeded,
    Extractive,
    Structural,
    KeywordFocused,
    Hybrid,
}

impl From<SummarizationStrategy> for StrategyUsed {
    fn from(strategy: SummarizationStrategy) -> Self {
        match strategy {
            SummarizationStrategy::Extractive => StrategyUsed::Extractive,
            SummarizationStrategy::Structural => StrategyUsed::Structural,
            SummarizationStrategy::KeywordFocused => StrategyUsed::KeywordFocused,
            SummarizationStrategy::Hybrid => StrategyUsed::Hybrid,
        }
    }
}

/// Diagnostics attached to every summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tokens: Option<usize>,
    pub tokens_saved: usize,
    pub compression_percentage: f64,
    #[serde(default)]
    pub no_compression_needed: bool,
    #[serde(default)]
    pub budget_exceeded: bool,
    /// Content was cut at a character offset, ignoring sentence boundaries
    #[serde(default)]
    pub truncated: bool,
}

/// Result of reducing one piece of content to a token target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub original_content: String,
    pub summarized_content: String,
    pub original_tokens: usize,
    pub summarized_tokens: usize,
    pub compression_ratio: f64,
    pub strategy_used: StrategyUsed,
    pub key_points: Vec<String>,
    pub metadata: SummaryMetadata,
}

impl SummaryResult {
    /// Build a result; the ratio is always derived from the two counts.
    pub fn new(
        original_content: String,
        summarized_content: String,
        original_tokens: usize,
        summarized_tokens: usize,
        strategy_used: StrategyUsed,
        key_points: Vec<String>,
        metadata: SummaryMetadata,
    ) -> Self {
        Self {
            compression_ratio: compression_ratio(original_tokens, summarized_tokens),
            original_content,
            summarized_content,
            original_tokens,
            summarized_tokens,
            strategy_used,
            key_points,
            metadata,
        }
    }

    pub fn tokens_saved(&self) -> usize {
        self.original_tokens.saturating_sub(self.summarized_tokens)
    }

    pub fn was_truncated(&self) -> bool {
        self.metadata.truncated
    }
}

/// summarized / original, or 1.0 when there was nothing to compress.
pub fn compression_ratio(original_tokens: usize, summarized_tokens: usize) -> f64 {
    if original_tokens == 0 {
        1.0
    } else {
        summarized_tokens as f64 / original_tokens as f64
    }
}

// ============================================================================
// Analysis Types
// ============================================================================

/// Per-file breakdown inside a [`ContentAnalysis`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub file_type: String,
    pub tokens: usize,
    pub characters: usize,
    /// Larger than an even share of the file-content budget
    pub needs_chunking: bool,
}

/// Read-only report of whether a request fits its model's context window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub model_id: String,
    pub model_family: ModelFamily,
    /// False when the context window came from the default fallback
    pub model_recognized: bool,
    pub budget: TokenBudget,
    pub user_prompt_tokens: usize,
    pub web_search_tokens: usize,
    pub file_tokens: usize,
    pub total_estimated_tokens: usize,
    pub exceeds_limit: bool,
    pub chunking_recommended: bool,
    pub file_analysis: Vec<FileAnalysis>,
}

impl ContentAnalysis {
    /// Total estimate as a percentage of the context window.
    pub fn usage_percentage(&self) -> f64 {
        if self.budget.max_context() == 0 {
            return 0.0;
        }
        (self.total_estimated_tokens as f64 / self.budget.max_context() as f64) * 100.0
    }

    pub fn files_needing_chunking(&self) -> impl Iterator<Item = &FileAnalysis> {
        self.file_analysis.iter().filter(|f| f.needs_chunking)
    }
}

// ============================================================================
// Tests
// ============================================================================
