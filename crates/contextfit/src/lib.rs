//! ContextFit - token-aware content reduction
//!
//! Decides whether a set of documents, a user prompt and optional web-search
//! context fit a language model's context window, and reduces the documents
//! when they do not. Content is never cut at an arbitrary offset except as a
//! clearly flagged last resort.
//!
//! # Architecture
//!
//! - `types`: Core records (TokenBudget, ChunkInfo, SummaryResult, ContentAnalysis)
//! - `config`: Configuration loading and environment overrides
//! - `token_counter`: Token counting with a tokenizer capability probe
//! - `budget`: Model catalog and budget planning
//! - `text`: Paragraph, sentence and section segmentation
//! - `scoring`: Sentence importance and key point heuristics
//! - `chunker`: Bounded splitting under four strategies
//! - `summarizer`: Target-driven summarization under four strategies
//! - `analyzer`: Request analysis and reduction orchestration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use contextfit::{ContentAnalyzer, ContextFitConfig, FileContent, ReductionPreference};
//!
//! let config = ContextFitConfig::default();
//! let analyzer = ContentAnalyzer::new(&config);
//!
//! let files = vec![FileContent::text("notes.md", "Quarterly results were strong.")];
//! let analysis = analyzer.analyze(&files, "gpt-4o", "Summarize the notes", None);
//! println!("Context usage: {:.1}%", analysis.usage_percentage());
//!
//! let reduced = analyzer.reduce(
//!     &files,
//!     "gpt-4o",
//!     "Summarize the notes",
//!     None,
//!     &[],
//!     ReductionPreference::Auto,
//! );
//! println!("{:?}", reduced.plan);
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod analyzer;
pub mod budget;
pub mod chunker;
pub mod config;
pub mod scoring;
pub mod summarizer;
pub mod text;
pub mod token_counter;
pub mod types;

#[cfg(test)]
mod token_counter_property_tests;

#[cfg(test)]
mod budget_property_tests;



// ============================================================================
// Re-exports
// ============================================================================

/// Error type shared by every fallible operation
pub use types::ContextError;

/// Result alias for fallible operations in this crate
pub type ContextResult<T> = Result<T, ContextError>;

pub use config::ContextFitConfig;

pub use types::{
    BudgetAllocations, BudgetOverrides, ChatMessage, ChunkInfo, ChunkMetadata, ChunkingStrategy,
    ContentAnalysis, FileAnalysis, FileContent, ModelFamily, StrategyUsed, SummarizationStrategy,
    SummaryMetadata, SummaryResult, TokenBudget,
};

pub use token_counter::{TokenCounter, TokenizerCapabilities};

pub use budget::{BudgetPlanner, ModelCatalog, ModelLookup};

pub use chunker::{ChunkOptions, ContentChunker};

pub use summarizer::{ContentSummarizer, SummarizeOptions};

pub use scoring::{extract_key_points, score_sentence};

pub use text::extract_keywords;

pub use analyzer::{
    ContentAnalyzer, ReducedContent, ReducedFiles, ReductionPlan, ReductionPreference,
};
