use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ragdb_core::config::{expand_path, Config};
use ragdb_core::data_processor::DataProcessor;
use ragdb_core::store::FILE_TYPE_KEY;
use ragdb_core::types::Meta;
use ragdb_core::Error;
use ragdb_hybrid::RagEngine;

/// Hybrid (dense + BM25) search over a directory of text files.
#[derive(Debug, Parser)]
#[command(name = "ragdb")]
struct Cli {
    /// Directory to ingest (defaults to `data.dir` from config)
    #[arg(short, long, value_name = "PATH", global = true)]
    data_dir: Option<PathBuf>,

    /// Ingest at most this many files
    #[arg(long, global = true)]
    limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ranked results for a query
    Search {
        query: String,
        /// Number of results (defaults to `rag.retrieval.default_k`)
        #[arg(short = 'k', long)]
        k: Option<usize>,
        /// Drop results whose hybrid score is below this
        #[arg(long)]
        min_confidence: Option<f32>,
        /// Sort by hybrid score only
        #[arg(long)]
        no_rerank: bool,
        /// Include citations for every result
        #[arg(long)]
        cite: bool,
    },
    /// Per-term BM25 breakdown and fused score of one chunk
    Explain { query: String, chunk_id: String },
    /// Index statistics
    Stats,
    /// Ingested documents
    Documents,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let settings = config.rag_settings()?;
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => expand_path(config.get::<String>("data.dir").unwrap_or_else(|_| "../dev_data/txt".to_string())),
    };

    let engine = RagEngine::from_settings(settings)?;
    ingest(&engine, &data_dir, cli.limit).await?;

    let output = match cli.command {
        Command::Search { query, k, min_confidence, no_rerank, cite } => {
            let retrieval = &engine.settings().retrieval;
            let k = k.unwrap_or(retrieval.default_k);
            let min_confidence = min_confidence.unwrap_or(retrieval.min_confidence);
            let rerank = retrieval.rerank && !no_rerank;
            if cite {
                serde_json::to_value(engine.search_cited(&query, k, min_confidence, rerank).await?)?
            } else {
                serde_json::to_value(engine.search(&query, k, min_confidence, rerank).await?)?
            }
        }
        Command::Explain { query, chunk_id } => serde_json::to_value(engine.explain(&query, &chunk_id).await?)?,
        Command::Stats => serde_json::to_value(engine.stats())?,
        Command::Documents => serde_json::to_value(engine.list_documents())?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn ingest(engine: &RagEngine, data_dir: &Path, limit: Option<usize>) -> Result<()> {
    let processor = match limit {
        Some(n) => DataProcessor::with_limit(n),
        None => DataProcessor::new(),
    };
    let sources = processor.process_directory(data_dir).with_context(|| format!("reading {}", data_dir.display()))?;
    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let mut chunks = 0usize;
    for source in sources {
        let mut metadata = Meta::new();
        metadata.insert(FILE_TYPE_KEY.to_string(), source.file_type.to_string());
        match engine.upload(&source.text, &source.title, &source.source, metadata).await {
            Ok(receipt) => chunks += receipt.chunks_created,
            Err(e @ Error::EmptyDocument(_)) => tracing::warn!(source = %source.source, error = %e, "skipping file"),
            Err(e) => return Err(e.into()),
        }
        pb.set_message(source.title);
        pb.inc(1);
    }
    pb.finish_with_message(format!("{chunks} chunks indexed"));
    tracing::info!(dir = %data_dir.display(), documents = engine.list_documents().len(), chunks, "ingest complete");
    Ok(())
}
