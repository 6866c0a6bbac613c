//! Content Analyzer Module
//!
//! Orchestrates the counting, planning, chunking and summarizing services
//! for one request: measure everything against the model's budget, decide
//! whether reduction is needed, and optionally carry it out.
//!
//! # Totals
//!
//! The grand total charges the system prompt and response buffer in full,
//! and the user prompt and web-search context at whichever is larger of
//! their reservation or their measured size:
//!
//! ```text
//! total = system + max(user_res, user) + max(web_res, web) + response + files
//! ```
//!
//! `exceeds_limit` is `total > max_context`; `chunking_recommended` fires at
//! the configured soft threshold (80% by default) to absorb counting error.

use crate::budget::BudgetPlanner;
use crate::chunker::ContentChunker;
use crate::config::ContextFitConfig;
use crate::summarizer::{ContentSummarizer, SummarizeOptions};
use crate::token_counter::TokenCounter;
use crate::types::{
    BudgetOverrides, ChunkInfo, ChunkingStrategy, ContentAnalysis, ContextError, FileAnalysis,
    FileContent, ModelFamily, SummarizationStrategy, SummaryResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How the caller prefers oversized requests to be reduced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionPreference {
    /// Chunk when some file is oversized on its own, otherwise summarize
    #[default]
    Auto,
    Summarize,
    Chunk,
}

impl fmt::Display for ReductionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReductionPreference::Auto => "auto",
            ReductionPreference::Summarize => "summarize",
            ReductionPreference::Chunk => "chunk",
        };
        f.write_str(s)
    }
}

impl FromStr for ReductionPreference {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ReductionPreference::Auto),
            "summarize" | "summary" => Ok(ReductionPreference::Summarize),
            "chunk" | "chunking" => Ok(ReductionPreference::Chunk),
            other => Err(ContextError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Follow-up action derived from a [`ContentAnalysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReductionPlan {
    FitsAsIs,
    /// Batch-summarize all files into the file-content budget
    Summarize { target_tokens: usize },
    /// Chunk each file to an even share of the file-content budget
    ChunkFiles { max_tokens_per_file: usize },
}

/// File content after the chosen reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "files", rename_all = "snake_case")]
pub enum ReducedFiles {
    Original(Vec<FileContent>),
    Summaries(Vec<SummaryResult>),
    Chunks(Vec<Vec<ChunkInfo>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedContent {
    pub analysis: ContentAnalysis,
    pub plan: ReductionPlan,
    pub output: ReducedFiles,
}

impl ReducedContent {
    /// Tokens of file content the caller will actually send.
    ///
    /// For chunked output this is the first chunk of every file, since
    /// later chunks go out in follow-up requests.
    pub fn delivered_file_tokens(&self) -> usize {
        match &self.output {
            ReducedFiles::Original(_) => self.analysis.file_tokens,
            ReducedFiles::Summaries(summaries) => {
                summaries.iter().map(|s| s.summarized_tokens).sum()
            }
            ReducedFiles::Chunks(files) => files
                .iter()
                .filter_map(|chunks| chunks.first())
                .map(|c| c.tokens)
                .sum(),
        }
    }
}

/// Injected service bundle shared by request handlers.
#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    counter: Arc<TokenCounter>,
    planner: BudgetPlanner,
    chunker: ContentChunker,
    summarizer: ContentSummarizer,
    soft_threshold: f64,
}

impl ContentAnalyzer {
    /// Build every service from `config`, probing tokenizers once.
    pub fn new(config: &ContextFitConfig) -> Self {
        Self::with_counter(config, Arc::new(TokenCounter::new(config)))
    }

    /// Build around an existing counter, e.g. a heuristic one.
    pub fn with_counter(config: &ContextFitConfig, counter: Arc<TokenCounter>) -> Self {
        Self {
            planner: BudgetPlanner::new(config),
            chunker: ContentChunker::new(Arc::clone(&counter), config),
            summarizer: ContentSummarizer::new(Arc::clone(&counter), config),
            soft_threshold: config.chunking_soft_threshold,
            counter,
        }
    }

    pub fn token_counter(&self) -> &Arc<TokenCounter> {
        &self.counter
    }

    pub fn planner(&self) -> &BudgetPlanner {
        &self.planner
    }

    pub fn chunker(&self) -> &ContentChunker {
        &self.chunker
    }

    pub fn summarizer(&self) -> &ContentSummarizer {
        &self.summarizer
    }

    pub fn analyze(
        &self,
        files: &[FileContent],
        model_id: &str,
        user_prompt: &str,
        web_search: Option<&str>,
    ) -> ContentAnalysis {
        self.analyze_with_overrides(files, model_id, user_prompt, web_search, None)
    }

    pub fn analyze_with_overrides(
        &self,
        files: &[FileContent],
        model_id: &str,
        user_prompt: &str,
        web_search: Option<&str>,
        overrides: Option<&BudgetOverrides>,
    ) -> ContentAnalysis {
        let (budget, lookup) = self.planner.plan_detailed(model_id, overrides);
        let family = ModelFamily::from_model_id(model_id);

        let user_prompt_tokens = self.counter.count_tokens(user_prompt, family);
        let web_search_tokens = web_search
            .map(|text| self.counter.count_tokens(text, family))
            .unwrap_or(0);

        let per_file_share = if files.is_empty() {
            budget.file_content()
        } else {
            budget.file_content() / files.len()
        };

        let file_analysis: Vec<FileAnalysis> = files
            .iter()
            .map(|file| {
                let tokens = self.counter.count_tokens(&file.content, family);
                FileAnalysis {
                    filename: file.filename.clone(),
                    file_type: file.file_type.clone(),
                    tokens,
                    characters: file.content.chars().count(),
                    needs_chunking: tokens > per_file_share,
                }
            })
            .collect();
        let file_tokens: usize = file_analysis.iter().map(|f| f.tokens).sum();

        let total_estimated_tokens = budget.system_prompt()
            + budget.user_prompt().max(user_prompt_tokens)
            + budget.web_search().max(web_search_tokens)
            + budget.response_buffer()
            + file_tokens;

        let exceeds_limit = total_estimated_tokens > budget.max_context();
        let chunking_recommended =
            total_estimated_tokens as f64 > budget.soft_limit(self.soft_threshold);

        tracing::debug!(
            model = %model_id,
            family = %family,
            files = files.len(),
            total_tokens = total_estimated_tokens,
            max_context = budget.max_context(),
            exceeds_limit,
            chunking_recommended,
            "Analyzed request"
        );

        ContentAnalysis {
            model_id: model_id.to_string(),
            model_family: family,
            model_recognized: lookup.recognized,
            budget,
            user_prompt_tokens,
            web_search_tokens,
            file_tokens,
            total_estimated_tokens,
            exceeds_limit,
            chunking_recommended,
            file_analysis,
        }
    }

    /// Chunk every file to an even share of the model's file-content budget.
    pub fn chunk_files_for_model(
        &self,
        files: &[FileContent],
        model_id: &str,
        strategy: ChunkingStrategy,
    ) -> Vec<Vec<ChunkInfo>> {
        let budget = self.planner.plan(model_id, None);
        let per_file = if files.is_empty() {
            budget.file_content()
        } else {
            budget.file_content() / files.len()
        };
        self.chunk_files(files, per_file, strategy, ModelFamily::from_model_id(model_id))
    }

    fn chunk_files(
        &self,
        files: &[FileContent],
        max_tokens: usize,
        strategy: ChunkingStrategy,
        family: ModelFamily,
    ) -> Vec<Vec<ChunkInfo>> {
        files
            .iter()
            .map(|file| {
                let options = self
                    .chunker
                    .options(max_tokens)
                    .with_strategy(strategy)
                    .with_source(file.filename.as_str())
                    .with_model_family(family);
                self.chunker.chunk(&file.content, &options)
            })
            .collect()
    }

    /// Decide the follow-up for an analysis.
    pub fn recommend(
        &self,
        analysis: &ContentAnalysis,
        preference: ReductionPreference,
    ) -> ReductionPlan {
        if !analysis.exceeds_limit && !analysis.chunking_recommended {
            return ReductionPlan::FitsAsIs;
        }

        let file_budget = analysis.budget.file_content();
        let max_tokens_per_file = if analysis.file_analysis.is_empty() {
            file_budget
        } else {
            file_budget / analysis.file_analysis.len()
        };

        let chunk = match preference {
            ReductionPreference::Summarize => false,
            ReductionPreference::Chunk => true,
            ReductionPreference::Auto => analysis.files_needing_chunking().next().is_some(),
        };

        if chunk {
            ReductionPlan::ChunkFiles {
                max_tokens_per_file,
            }
        } else {
            ReductionPlan::Summarize {
                target_tokens: file_budget,
            }
        }
    }

    /// Analyze, then apply the recommended reduction.
    pub fn reduce(
        &self,
        files: &[FileContent],
        model_id: &str,
        user_prompt: &str,
        web_search: Option<&str>,
        keywords: &[String],
        preference: ReductionPreference,
    ) -> ReducedContent {
        let analysis = self.analyze(files, model_id, user_prompt, web_search);
        let plan = self.recommend(&analysis, preference);
        let family = analysis.model_family;

        let output = match plan {
            ReductionPlan::FitsAsIs => ReducedFiles::Original(files.to_vec()),
            ReductionPlan::Summarize { target_tokens } => {
                let options = SummarizeOptions::new(SummarizationStrategy::Hybrid)
                    .with_model_family(family)
                    .with_keywords(keywords.iter().cloned());
                ReducedFiles::Summaries(self.summarizer.batch_summarize(
                    files,
                    target_tokens,
                    &options,
                ))
            }
            ReductionPlan::ChunkFiles {
                max_tokens_per_file,
            } => ReducedFiles::Chunks(self.chunk_files(
                files,
                max_tokens_per_file,
                ChunkingStrategy::Semantic,
                family,
            )),
        };

        tracing::info!(
            model = %model_id,
            plan = ?plan,
            file_tokens = analysis.file_tokens,
            "Reduced request content"
        );

        ReducedContent {
            analysis,
            plan,
            output,
        }
    }
}
