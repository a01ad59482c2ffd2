use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fundfaq_answer::FaqService;
use fundfaq_core::config::{Config, Settings};
use fundfaq_core::extract::collect_chunks;
use fundfaq_core::source::Corpus;
use fundfaq_embed::load_embedder;
use fundfaq_vector::IndexBuilder;

#[derive(Parser)]
#[command(name = "fundfaq")]
#[command(about = "Facts-only mutual fund FAQ assistant", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract chunks from the scraped records, embed them and write the vector store
    Build {
        /// Directory of scheme records (overrides data.schemes_dir)
        #[arg(long)]
        schemes: Option<PathBuf>,
        /// Directory of guide records (overrides data.guides_dir)
        #[arg(long)]
        guides: Option<PathBuf>,
        /// Output directory (overrides data.vector_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Answer one question from the vector store
    Query {
        #[arg(short, long)]
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the HTTP response payload instead of plain text
        #[arg(long)]
        json: bool,
        /// Also print every retrieved hit
        #[arg(long)]
        show_hits: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "fundfaq=debug,info" } else { "warn,fundfaq=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    info!(env = config.env_name(), "configuration loaded");

    match cli.command {
        Commands::Build { schemes, guides, out } => build(&settings, schemes, guides, out),
        Commands::Query { question, top_k, json, show_hits } => query(&settings, &question, top_k, json, show_hits),
    }
}

fn build(settings: &Settings, schemes: Option<PathBuf>, guides: Option<PathBuf>, out: Option<PathBuf>) -> anyhow::Result<()> {
    let schemes = schemes.unwrap_or_else(|| settings.data.schemes_path());
    let guides = guides.unwrap_or_else(|| settings.data.guides_path());
    let out = out.unwrap_or_else(|| settings.data.vector_path());

    let corpus = Corpus::load(&schemes, &guides)?;
    info!(schemes = corpus.schemes.len(), guides = corpus.guides.len(), "loaded source records");
    let chunks = collect_chunks(&corpus)?;

    let embedder = load_embedder(&settings.embedding).context("loading embedder")?;
    let report = IndexBuilder::new(embedder)
        .with_batch_size(settings.embedding.batch_size)
        .with_progress(true)
        .build_and_save(chunks, &out)?;
    println!("Wrote {} chunks -> {} and {}", report.chunks, report.paths.index.display(), report.paths.documents.display());
    Ok(())
}

fn query(settings: &Settings, question: &str, top_k: Option<usize>, as_json: bool, show_hits: bool) -> anyhow::Result<()> {
    let question = question.trim();
    anyhow::ensure!(!question.is_empty(), "Question cannot be empty");
    let service = FaqService::from_settings(settings)?;
    let outcome = service.answer_with(question, top_k.unwrap_or_else(|| service.top_k()))?;

    if as_json {
        let payload = json!({
            "success": true,
            "question": outcome.question,
            "answer": outcome.answer,
            "source": outcome.source,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", outcome.answer);
    }
    if show_hits {
        eprintln!("\nRetrieved {} hit(s):", outcome.hits.len());
        for hit in &outcome.hits {
            eprintln!("  [{}] d={:.4} {} | {}", hit.rank, hit.distance, hit.url().unwrap_or("-"), hit.text);
        }
    }
    Ok(())
}
