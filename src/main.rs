use clap::{Parser, Subcommand};
use med_ingest::Result;
use med_ingest::commands::{delete_article, ingest_directory, search_articles, show_status};
use med_ingest::config::{Config, resolve_base_dir, run_interactive_config, show_config};
use med_ingest::ingest::IngestOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "med-ingest")]
#[command(about = "Normalize medical article records and index them for similarity search")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the ledger and the vector database
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection, normalization and ingestion settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a directory of article JSON files
    Ingest {
        /// Directory containing one JSON article record per file
        dir: PathBuf,
        /// Maximum number of files to process, 0 for all
        #[arg(long)]
        limit: Option<usize>,
        /// Skip files that were already ingested successfully
        #[arg(long)]
        skip_ingested: bool,
    },
    /// Search indexed articles by similarity
    Search {
        /// Free-text query
        query: String,
        /// Number of results to return
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only return articles from this publication year
        #[arg(long)]
        year: Option<String>,
    },
    /// Delete an article from the vector index
    Delete {
        /// PubMed ID of the article
        pmid: String,
    },
    /// Show detailed status of the ingestion pipeline
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_dir = resolve_base_dir(cli.base_dir)
        .map_err(|e| med_ingest::IngestError::Config(e.to_string()))?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&base_dir)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Ingest {
            dir,
            limit,
            skip_ingested,
        } => {
            let config = Config::load(&base_dir)?;
            let mut options = IngestOptions::from(&config.ingest);
            if let Some(limit) = limit {
                options.file_limit = limit;
            }
            options.skip_ingested |= skip_ingested;
            ingest_directory(&config, &dir, options).await?;
        }
        Commands::Search { query, limit, year } => {
            let config = Config::load(&base_dir)?;
            search_articles(&config, &query, limit, year.as_deref()).await?;
        }
        Commands::Delete { pmid } => {
            let config = Config::load(&base_dir)?;
            delete_article(&config, &pmid).await?;
        }
        Commands::Status => {
            let config = Config::load(&base_dir)?;
            show_status(&config).await?;
        }
    }

    Ok(())
}
