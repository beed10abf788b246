
use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

const RUN_COLUMNS: &str =
    "id, source_dir, started_at, finished_at, total_files, successful, failed, skipped";
const FILE_COLUMNS: &str = "id, run_id, file_name, pmid, status, error_message, processed_at";

pub struct IngestRunQueries;

impl IngestRunQueries {
    #[inline]
    pub async fn start(pool: &SqlitePool, source_dir: &str) -> Result<IngestRun> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query("INSERT INTO ingest_runs (id, source_dir, started_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(source_dir)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to start ingest run")?;

        debug!("Started ingest run {} for {}", id, source_dir);

        Self::get_by_id(pool, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created ingest run"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<IngestRun>> {
        let result = sqlx::query_as::<_, IngestRun>(&format!(
            "SELECT {RUN_COLUMNS} FROM ingest_runs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get ingest run by id")?;

        Ok(result)
    }

    /// Record the final counters of a run and stamp its finish time
    #[inline]
    pub async fn finish(
        pool: &SqlitePool,
        id: &str,
        totals: RunTotals,
    ) -> Result<Option<IngestRun>> {
        let now = Utc::now().naive_utc();

        let rows = sqlx::query(
            r#"
            UPDATE ingest_runs
            SET finished_at = ?, total_files = ?, successful = ?, failed = ?, skipped = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(totals.total_files)
        .bind(totals.successful)
        .bind(totals.failed)
        .bind(totals.skipped)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to finish ingest run")?
        .rows_affected();

        if rows == 0 {
            return Ok(None);
        }

        Self::get_by_id(pool, id).await
    }

    /// Most recent runs first
    #[inline]
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<IngestRun>> {
        let runs = sqlx::query_as::<_, IngestRun>(&format!(
            "SELECT {RUN_COLUMNS} FROM ingest_runs ORDER BY started_at DESC, rowid DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list ingest runs")?;

        Ok(runs)
    }
}

pub struct IngestedFileQueries;

impl IngestedFileQueries {
    #[inline]
    pub async fn record(pool: &SqlitePool, outcome: NewFileOutcome) -> Result<IngestedFile> {
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            r#"
            INSERT INTO ingested_files (run_id, file_name, pmid, status, error_message, processed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&outcome.run_id)
        .bind(&outcome.file_name)
        .bind(&outcome.pmid)
        .bind(outcome.status)
        .bind(&outcome.error_message)
        .bind(now)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to record outcome for {}", outcome.file_name))?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve recorded file outcome"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<IngestedFile>> {
        let result = sqlx::query_as::<_, IngestedFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM ingested_files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get file outcome by id")?;

        Ok(result)
    }

    #[inline]
    pub async fn list_for_run(pool: &SqlitePool, run_id: &str) -> Result<Vec<IngestedFile>> {
        let files = sqlx::query_as::<_, IngestedFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM ingested_files WHERE run_id = ? ORDER BY id"
        ))
        .bind(run_id)
        .fetch_all(pool)
        .await
        .context("Failed to list file outcomes for run")?;

        Ok(files)
    }

    #[inline]
    pub async fn list_failures(pool: &SqlitePool, run_id: &str) -> Result<Vec<IngestedFile>> {
        let files = sqlx::query_as::<_, IngestedFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM ingested_files WHERE run_id = ? AND status = ? ORDER BY id"
        ))
        .bind(run_id)
        .bind(FileStatus::Failed)
        .fetch_all(pool)
        .await
        .context("Failed to list failed files for run")?;

        Ok(files)
    }

    /// Whether any earlier run ingested `file_name` successfully
    #[inline]
    pub async fn has_succeeded(pool: &SqlitePool, file_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ingested_files WHERE file_name = ? AND status = ?",
        )
        .bind(file_name)
        .bind(FileStatus::Succeeded)
        .fetch_one(pool)
        .await
        .context("Failed to look up previous file outcome")?;

        Ok(count > 0)
    }

    /// PMID stored by the most recent successful ingestion of `file_name`
    #[inline]
    pub async fn last_succeeded_pmid(pool: &SqlitePool, file_name: &str) -> Result<Option<String>> {
        let pmid: Option<Option<String>> = sqlx::query_scalar(
            "SELECT pmid FROM ingested_files WHERE file_name = ? AND status = ? ORDER BY processed_at DESC, id DESC LIMIT 1",
        )
        .bind(file_name)
        .bind(FileStatus::Succeeded)
        .fetch_optional(pool)
        .await
        .context("Failed to look up previously ingested PMID")?;

        Ok(pmid.flatten())
    }
}
