use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use lexrag_core::data_processor::DataProcessor;
use lexrag_embed::get_default_embedder;
use lexrag_vector::IndexBuilder;

#[derive(Parser)]
#[command(name = "lexrag-indexer")]
#[command(about = "Prebuild the legal vector store from a document directory", long_about = None)]
struct Args {
    #[arg(long, help = "Source document directory (overrides data.source_dir)")]
    source: Option<PathBuf>,

    #[arg(long, help = "Vector store directory (overrides data.persist_dir)")]
    persist: Option<PathBuf>,

    #[arg(long, help = "Index only the first N files")]
    limit: Option<usize>,
}

async fn run(args: Args) -> anyhow::Result<()> {
    let (settings, base) = lexrag_cli::load_settings()?;
    let source = args.source.unwrap_or_else(|| settings.data.source_path(&base));
    let persist = args.persist.unwrap_or_else(|| settings.data.persist_path(&base));
    println!("Legal vector store indexer\n==========================");
    println!("Source:  {}", source.display());
    println!("Persist: {}", persist.display());

    let embedder = get_default_embedder(&settings.embedding, &base)?;
    let report = IndexBuilder::new(embedder, DataProcessor::with_config(settings.chunking.clone()))
        .with_limit(args.limit)
        .build(&source, &persist)
        .await?;

    println!("\nIndexed {} documents into {} chunks (dim {}) in {:.1}s", report.documents, report.chunks, report.dimension, report.elapsed.as_secs_f64());
    println!("Vector store written to {}", persist.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    lexrag_cli::init_tracing();
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "indexing failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
