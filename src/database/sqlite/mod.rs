use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{IngestRun, IngestedFile, NewFileOutcome, RunTotals};
use crate::database::sqlite::queries::{IngestRunQueries, IngestedFileQueries};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// SQLite ledger of ingestion runs and per-file outcomes
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Open `ledger_path`, creating its parent directory when needed
    pub async fn open_ledger(ledger_path: &Path) -> Result<Self> {
        if let Some(parent) = ledger_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create ledger directory: {}", parent.display())
            })?;
        }

        Self::new(ledger_path).await
    }

    // Run operations
    pub async fn start_run(&self, source_dir: &str) -> Result<IngestRun> {
        IngestRunQueries::start(&self.pool, source_dir).await
    }

    pub async fn finish_run(&self, run_id: &str, totals: RunTotals) -> Result<Option<IngestRun>> {
        IngestRunQueries::finish(&self.pool, run_id, totals).await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<IngestRun>> {
        IngestRunQueries::get_by_id(&self.pool, run_id).await
    }

    pub async fn list_recent_runs(&self, limit: i64) -> Result<Vec<IngestRun>> {
        IngestRunQueries::list_recent(&self.pool, limit).await
    }

    // File outcome operations
    pub async fn record_file(&self, outcome: NewFileOutcome) -> Result<IngestedFile> {
        IngestedFileQueries::record(&self.pool, outcome).await
    }

    pub async fn list_run_files(&self, run_id: &str) -> Result<Vec<IngestedFile>> {
        IngestedFileQueries::list_for_run(&self.pool, run_id).await
    }

    pub async fn list_failures(&self, run_id: &str) -> Result<Vec<IngestedFile>> {
        IngestedFileQueries::list_failures(&self.pool, run_id).await
    }

    pub async fn file_already_ingested(&self, file_name: &str) -> Result<bool> {
        IngestedFileQueries::has_succeeded(&self.pool, file_name).await
    }

    pub async fn last_ingested_pmid(&self, file_name: &str) -> Result<Option<String>> {
        IngestedFileQueries::last_succeeded_pmid(&self.pool, file_name).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}
