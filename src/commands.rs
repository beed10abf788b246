use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::{Embedder, OllamaClient};
use crate::ingest::{IngestOptions, IngestPipeline, IngestionStats};

const RECENT_RUNS_SHOWN: i64 = 5;
const FAILURES_SHOWN: usize = 10;

/// Ingest every article file in `dir`
#[inline]
pub async fn ingest_directory(
    config: &Config,
    dir: &Path,
    options: IngestOptions,
) -> Result<IngestionStats> {
    info!("Ingesting articles from {}", dir.display());

    let client = OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
    client
        .health_check()
        .context("Ollama is not ready; start it or run 'med-ingest config'")?;

    let mut pipeline = IngestPipeline::from_config(config, client)
        .await
        .context("Failed to initialize ingestion pipeline")?;

    println!("Processing files from {}...", dir.display());
    let stats = pipeline.run(dir, &options).await?;

    println!();
    println!("Processing Complete!");
    println!("  Total files processed: {}", stats.total);
    println!("  Successful: {}", stats.successful);
    println!("  Failed: {}", stats.failed);
    if stats.skipped > 0 {
        println!("  Skipped (already ingested): {}", stats.skipped);
    }

    if stats.failed > 0 {
        let failures = pipeline
            .ledger()
            .list_failures(&stats.run_id)
            .await
            .context("Failed to read failures from ledger")?;

        println!();
        println!("Failures:");
        for failure in failures.iter().take(FAILURES_SHOWN) {
            println!(
                "  ❌ {}: {}",
                failure.file_name,
                failure.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        if failures.len() > FAILURES_SHOWN {
            println!("  ... and {} more", failures.len() - FAILURES_SHOWN);
        }
    }

    Ok(stats)
}

/// Embed `query` and print the closest articles
#[inline]
pub async fn search_articles(
    config: &Config,
    query: &str,
    limit: usize,
    year: Option<&str>,
) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Search query cannot be empty");
    }

    let client = OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
    let vector = client
        .embed(query)
        .context("Failed to generate query embedding")?;

    let store = VectorStore::new(config)
        .await
        .context("Failed to open vector store")?;
    let results = store
        .search_similar(&vector, limit, year)
        .await
        .context("Search failed")?;

    if results.is_empty() {
        println!("No matching articles found.");
        return Ok(());
    }

    println!("Top {} results for \"{}\":", results.len(), query);
    println!();

    for (rank, result) in results.iter().enumerate() {
        let article = &result.article;
        println!(
            "{}. {} (PMID {}, score {:.3})",
            rank + 1,
            article.title,
            article.pmid,
            result.similarity_score
        );
        println!("   {} ({})", article.journal, article.year);
        if !article.medical_terms.is_empty() {
            println!("   Terms: {}", article.medical_terms.join(", "));
        }
    }

    Ok(())
}

/// Remove one article from the vector index
#[inline]
pub async fn delete_article(config: &Config, pmid: &str) -> Result<()> {
    let mut store = VectorStore::new(config)
        .await
        .context("Failed to open vector store")?;

    if store
        .delete_article(pmid)
        .await
        .context("Failed to delete article")?
    {
        println!("Deleted article {}", pmid);
    } else {
        println!("No article with PMID {} in '{}'", pmid, store.table_name());
    }

    Ok(())
}

/// Show embedding service health, index size and recent runs
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 Medical Ingest Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Unavailable - {:#}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Invalid configuration - {}", e);
        }
    }

    println!();
    println!("🔍 Vector Database Status:");
    match VectorStore::new(config).await {
        Ok(store) => match store.count_articles().await {
            Ok(count) => {
                println!("   ✅ LanceDB: Connected");
                println!("   📚 Collection: {}", store.table_name());
                println!("   📊 Articles: {}", count);
                println!("   🔢 Dimensions: {}", store.vector_dimension());
            }
            Err(e) => {
                warn!("Failed to count articles: {}", e);
                println!("   ⚠️  LanceDB: Connected but unreadable - {}", e);
            }
        },
        Err(e) => {
            error!("Failed to open vector store: {}", e);
            println!("   ❌ LanceDB: Failed to connect - {}", e);
        }
    }

    println!();
    println!("🗄️  Recent Runs:");
    let ledger = Database::open_ledger(&config.ledger_path())
        .await
        .context("Failed to open ingestion ledger")?;
    let runs = ledger
        .list_recent_runs(RECENT_RUNS_SHOWN)
        .await
        .context("Failed to list ingest runs")?;

    if runs.is_empty() {
        println!("   No ingestion runs yet.");
        println!("   Use 'med-ingest ingest <dir>' to ingest articles.");
        return Ok(());
    }

    for run in &runs {
        let state = if run.is_finished() { "✅" } else { "⏳" };
        println!(
            "   {} {} {}",
            state,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.source_dir
        );
        println!(
            "      Total: {}, Successful: {}, Failed: {}, Skipped: {}",
            run.total_files, run.successful, run.failed, run.skipped
        );
        if let Some(duration) = run.duration() {
            println!("      Duration: {}s", duration.num_seconds());
        }
    }

    Ok(())
}
