use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use lexrag_core::types::{AnswerMode, QueryResult, RetrievalConfig};
use lexrag_embed::get_default_embedder;
use lexrag_generate::GroqClient;
use lexrag_rag::AnswerOrchestrator;
use lexrag_vector::LanceStoreProvider;

const DISCLAIMER: &str = "This tool is for educational purposes only and does not constitute legal advice. Consult a qualified attorney for legal matters.";

#[derive(Parser)]
#[command(name = "lexrag-ask")]
#[command(about = "Answer a legal question, grounded in the prebuilt vector store when available", long_about = None)]
struct Args {
    #[arg(help = "The legal question to answer")]
    question: String,

    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..=10), help = "Number of sources to retrieve (1-10)")]
    top_k: Option<usize>,

    #[arg(long, help = "Minimum similarity score for a source (0.0-1.0)")]
    min_score: Option<f32>,

    #[arg(long, help = "Print the result as JSON")]
    json: bool,
}

fn print_result(result: &QueryResult) {
    println!("{}\n", result.answer);
    let mode = match result.mode {
        AnswerMode::RetrievalAugmented => "retrieval-augmented",
        AnswerMode::GenerationOnly => "generation-only",
    };
    println!("Confidence: {:.1}%  ({mode})", result.confidence * 100.0);
    if !result.sources.is_empty() {
        println!("\nLegal sources:");
        for (i, source) in result.sources.iter().enumerate() {
            match source.page {
                Some(page) => println!("  Source {}: {} (page {}, score {:.2})", i + 1, source.source_name, page, source.score),
                None => println!("  Source {}: {} (score {:.2})", i + 1, source.source_name, source.score),
            }
            println!("    {}", source.preview);
        }
    }
    println!("\n{DISCLAIMER}");
}

async fn run(args: Args) -> anyhow::Result<()> {
    let (settings, base) = lexrag_cli::load_settings()?;
    let config = RetrievalConfig::new(
        args.top_k.unwrap_or(settings.retrieval.top_k),
        args.min_score.unwrap_or(settings.retrieval.min_score),
    )?;
    let embedder = get_default_embedder(&settings.embedding, &base)?;
    let generator = Arc::new(GroqClient::from_settings(&settings.generation)?);
    info!(model = generator.model(), "generation backend ready");
    let provider = Arc::new(LanceStoreProvider::new(settings.data.persist_path(&base), Some(embedder.dim())));
    let orchestrator = AnswerOrchestrator::from_settings(&settings, embedder, generator, provider);

    let result = orchestrator.answer(&args.question, &config).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    lexrag_cli::init_tracing();
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "query failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
