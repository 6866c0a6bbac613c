//! ContextFit CLI
//!
//! Command-line front end for analyzing and reducing documents against a
//! model's context window. Results are written to stdout as JSON; logs go
//! to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contextfit::{
    ChunkingStrategy, ContentAnalyzer, ContextFitConfig, FileContent, ModelFamily,
    ReductionPreference, SummarizationStrategy, SummarizeOptions, TokenCounter,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "contextfit")]
#[command(about = "Fit documents into an LLM context window", version, long_about = None)]
struct Cli {
    /// YAML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Count with the chars-per-token heuristic instead of a tokenizer
    #[arg(long, global = true)]
    heuristic: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether files and prompt fit the model's context window
    Analyze {
        /// Model identifier, e.g. gpt-4o
        #[arg(short, long)]
        model: String,

        /// User prompt text
        #[arg(short, long, default_value = "")]
        prompt: String,

        /// File holding web-search context
        #[arg(long)]
        web_search: Option<PathBuf>,

        /// Documents to include
        files: Vec<PathBuf>,
    },

    /// Analyze, then chunk or summarize the files as needed
    Reduce {
        #[arg(short, long)]
        model: String,

        #[arg(short, long, default_value = "")]
        prompt: String,

        #[arg(long)]
        web_search: Option<PathBuf>,

        /// auto, summarize or chunk
        #[arg(long, default_value = "auto")]
        preference: ReductionPreference,

        /// Comma-separated keywords that steer summaries
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        files: Vec<PathBuf>,
    },

    /// Split one document into bounded chunks
    Chunk {
        file: PathBuf,

        #[arg(long)]
        max_tokens: usize,

        /// semantic, sliding_window, document_sections or uniform
        #[arg(short, long, default_value = "semantic")]
        strategy: ChunkingStrategy,

        /// Overlap for sliding windows; defaults to the configured value
        #[arg(long)]
        overlap: Option<usize>,

        /// gpt-4, gpt-3.5 or default
        #[arg(long, default_value = "default")]
        family: ModelFamily,
    },

    /// Reduce one or more documents to a token target
    Summarize {
        /// Total target shared by all files
        #[arg(short, long)]
        target_tokens: usize,

        /// extractive, structural, keyword_focused or hybrid
        #[arg(short, long, default_value = "hybrid")]
        strategy: SummarizationStrategy,

        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        #[arg(long, default_value = "default")]
        family: ModelFamily,

        files: Vec<PathBuf>,
    },

    /// Show the token budget planned for a model
    Budget {
        model: String,
    },

    /// Show which tokenizers are available
    Capabilities,
}

#[derive(Serialize)]
struct BudgetReport {
    model_id: String,
    recognized: bool,
    matched_pattern: Option<String>,
    budget: contextfit::TokenBudget,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;
    let counter = if cli.heuristic {
        TokenCounter::heuristic(&config)
    } else {
        TokenCounter::new(&config)
    };
    let analyzer = ContentAnalyzer::with_counter(&config, Arc::new(counter));

    match cli.command {
        Commands::Analyze {
            model,
            prompt,
            web_search,
            files,
        } => {
            let files = read_files(&files)?;
            let web_search = read_optional(web_search.as_deref())?;
            let analysis = analyzer.analyze(&files, &model, &prompt, web_search.as_deref());
            print_json(&analysis, cli.pretty)
        }
        Commands::Reduce {
            model,
            prompt,
            web_search,
            preference,
            keywords,
            files,
        } => {
            let files = read_files(&files)?;
            let web_search = read_optional(web_search.as_deref())?;
            let reduced = analyzer.reduce(
                &files,
                &model,
                &prompt,
                web_search.as_deref(),
                &keywords,
                preference,
            );
            print_json(&reduced, cli.pretty)
        }
        Commands::Chunk {
            file,
            max_tokens,
            strategy,
            overlap,
            family,
        } => {
            let file = read_file(&file)?;
            let mut options = analyzer
                .chunker()
                .options(max_tokens)
                .with_strategy(strategy)
                .with_source(file.filename.as_str())
                .with_model_family(family);
            if let Some(overlap) = overlap {
                options = options.with_overlap(overlap);
            }
            let chunks = analyzer.chunker().chunk(&file.content, &options);
            print_json(&chunks, cli.pretty)
        }
        Commands::Summarize {
            target_tokens,
            strategy,
            keywords,
            family,
            files,
        } => {
            let files = read_files(&files)?;
            let options = SummarizeOptions::new(strategy)
                .with_model_family(family)
                .with_keywords(keywords);
            let results = analyzer
                .summarizer()
                .batch_summarize(&files, target_tokens, &options);
            print_json(&results, cli.pretty)
        }
        Commands::Budget { model } => {
            let (budget, lookup) = analyzer.planner().plan_detailed(&model, None);
            let report = BudgetReport {
                model_id: model,
                recognized: lookup.recognized,
                matched_pattern: lookup.matched_pattern,
                budget,
            };
            print_json(&report, cli.pretty)
        }
        Commands::Capabilities => print_json(&analyzer.token_counter().capabilities(), cli.pretty),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "contextfit=info,contextfit_cli=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<ContextFitConfig> {
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            ContextFitConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            tracing::debug!("Using built-in configuration defaults");
            ContextFitConfig::default()
        }
    };
    config
        .with_env_overrides()
        .context("Invalid CONTEXTFIT_* environment override")
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<FileContent>> {
    paths.iter().map(|p| read_file(p)).collect()
}

fn read_file(path: &Path) -> Result<FileContent> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file_type = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "text".to_string());
    tracing::debug!(
        path = %path.display(),
        bytes = content.len(),
        file_type = %file_type,
        "Read input file"
    );
    Ok(FileContent::new(filename, file_type, content))
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| {
        std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
    })
    .transpose()
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
