//! NewsVerify Indexer
//!
//! Offline build pass over a cleaned corpus:
//! 1. Reads document records
//! 2. Embeds each record via the configured embedding provider
//! 3. Writes the parallel vectors file
//! 4. Builds the similarity index and writes its snapshot
//!
//! Usage: `indexer build` or `indexer check`

mod processor;

use crate::processor::{check, BuildSummary, IndexBuilder};
use newsverify_common::{config::AppConfig, embeddings::create_embedder, logging, VERSION};
use tracing::{error, info};

fn report(summary: &BuildSummary) {
    println!("Documents: {}", summary.documents);
    println!("Dimension: {}", summary.dimension);
    println!("Vectors:   {}", summary.vectors_path.display());
    if let Some(path) = &summary.index_path {
        println!("Snapshot:  {}", path.display());
    }
    println!("Elapsed:   {}ms", summary.elapsed_ms);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    logging::init_tracing(&config.observability);

    info!("Starting NewsVerify Indexer v{}", VERSION);

    let command = std::env::args().nth(1).unwrap_or_else(|| "build".to_string());

    let result = match command.as_str() {
        "build" => {
            let embedder = create_embedder(&config.embedding)?;
            info!(
                model = %embedder.model_name(),
                dimension = embedder.dimension(),
                "Embedder initialized"
            );
            IndexBuilder::new(embedder, config.embedding.batch_size)
                .build(&config.corpus)
                .await
        }
        "check" => check(&config.corpus),
        other => {
            eprintln!("Unknown command '{}'. Usage: indexer [build|check]", other);
            std::process::exit(2);
        }
    };

    match result {
        Ok(summary) => {
            info!(documents = summary.documents, "Corpus artefacts ready");
            report(&summary);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, code = ?e.code(), "Index build failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
