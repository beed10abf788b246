// Ingest module
// Directory-level pipeline: read, validate, normalize, embed and index article files


use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::article::ArticleRecord;
use crate::config::{Config, IngestConfig};
use crate::database::lancedb::{ArticleVector, VectorStore};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{NewFileOutcome, RunTotals};
use crate::embeddings::Embedder;
use crate::normalize::{NormalizedArticle, TextProcessor};
use crate::{IngestError, Result};

/// Per-run knobs, usually taken from `[ingest]` and overridden on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Maximum number of files to consider, 0 for no limit
    pub file_limit: usize,
    /// Skip files that already succeeded in an earlier run
    pub skip_ingested: bool,
}

impl Default for IngestOptions {
    #[inline]
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestOptions {
    #[inline]
    fn from(config: &IngestConfig) -> Self {
        Self {
            file_limit: config.file_limit,
            skip_ingested: config.skip_ingested,
        }
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    pub run_id: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl IngestionStats {
    fn new(run_id: String, total: usize) -> Self {
        Self {
            run_id,
            total,
            successful: 0,
            failed: 0,
            skipped: 0,
        }
    }

    #[inline]
    pub fn processed(&self) -> usize {
        self.successful + self.failed + self.skipped
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }
}

impl From<&IngestionStats> for RunTotals {
    #[inline]
    fn from(stats: &IngestionStats) -> Self {
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Self {
            total_files: count(stats.total),
            successful: count(stats.successful),
            failed: count(stats.failed),
            skipped: count(stats.skipped),
        }
    }
}

/// A normalized article waiting for its embedding
struct PendingArticle {
    file_name: String,
    article: NormalizedArticle,
}

fn ledger_error(error: anyhow::Error) -> IngestError {
    IngestError::Database(format!("{error:#}"))
}

/// Collect the `*.json` files in `dir`, sorted by file name and truncated to `limit` (0 = all)
#[inline]
pub fn collect_article_files(dir: &Path, limit: usize) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory not found: {}", dir.display()),
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No JSON files found in directory: {}", dir.display()),
        )));
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if limit > 0 {
        files.truncate(limit);
    }

    Ok(files)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Batch ingestion of article files into the vector index and the ledger
pub struct IngestPipeline<E: Embedder> {
    processor: TextProcessor,
    embedder: E,
    vector_store: VectorStore,
    ledger: Database,
    batch_size: usize,
}

impl<E: Embedder> IngestPipeline<E> {
    #[inline]
    pub fn new(
        processor: TextProcessor,
        embedder: E,
        vector_store: VectorStore,
        ledger: Database,
        batch_size: usize,
    ) -> Self {
        Self {
            processor,
            embedder,
            vector_store,
            ledger,
            batch_size: batch_size.max(1),
        }
    }

    /// Build every component from the application configuration
    #[inline]
    pub async fn from_config(config: &Config, embedder: E) -> Result<Self> {
        let processor = TextProcessor::new(&config.normalization)?;
        let vector_store = VectorStore::new(config).await?;
        let ledger = Database::open_ledger(&config.ledger_path())
            .await
            .map_err(ledger_error)?;

        if embedder.dimension() != vector_store.vector_dimension() {
            warn!(
                "Embedder produces {} dimensions but '{}' holds {}; the table will be recreated on the first write",
                embedder.dimension(),
                vector_store.table_name(),
                vector_store.vector_dimension()
            );
        }

        Ok(Self::new(
            processor,
            embedder,
            vector_store,
            ledger,
            config.ollama.batch_size as usize,
        ))
    }

    #[inline]
    pub fn vector_store(&self) -> &VectorStore {
        &self.vector_store
    }

    #[inline]
    pub fn ledger(&self) -> &Database {
        &self.ledger
    }

    /// Ingest every article file of `dir`.
    ///
    /// Per-file failures are logged, recorded in the ledger and counted; they
    /// never abort the run. Only a missing or empty directory, or a failing
    /// ledger, is an error.
    #[inline]
    pub async fn run(&mut self, dir: &Path, options: &IngestOptions) -> Result<IngestionStats> {
        let files = collect_article_files(dir, options.file_limit)?;
        info!("Processing {} files from {}", files.len(), dir.display());

        let run = self
            .ledger
            .start_run(&dir.display().to_string())
            .await
            .map_err(ledger_error)?;
        let mut stats = IngestionStats::new(run.id.clone(), files.len());

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(files.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Ingesting {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut pending = Vec::with_capacity(self.batch_size);

        for path in &files {
            let file_name = file_name_of(path);
            bar.set_message(file_name.clone());

            if options.skip_ingested && self.already_indexed(&file_name).await? {
                debug!("Skipping already ingested file: {}", file_name);
                self.record(NewFileOutcome::skipped(&stats.run_id, &file_name))
                    .await?;
                stats.skipped += 1;
                bar.inc(1);
                continue;
            }

            match ArticleRecord::from_path(path) {
                Ok(record) => {
                    let article = self.processor.process_article(&record);
                    debug!(
                        "Normalized {} (pmid {}, {} terms)",
                        file_name,
                        article.pmid,
                        article.medical_terms.len()
                    );
                    pending.push(PendingArticle { file_name, article });
                }
                Err(e) => {
                    error!("Error processing file {}: {}", path.display(), e);
                    self.record(NewFileOutcome::failed(
                        &stats.run_id,
                        &file_name,
                        None,
                        &e.to_string(),
                    ))
                    .await?;
                    stats.failed += 1;
                }
            }

            if pending.len() >= self.batch_size {
                self.flush(&mut pending, &mut stats).await?;
            }

            bar.inc(1);
            info!(
                "Processed {}/{} files. Success: {}, Failed: {}, Remaining: {}",
                stats.processed() + pending.len(),
                stats.total,
                stats.successful,
                stats.failed,
                stats.remaining().saturating_sub(pending.len())
            );
        }

        self.flush(&mut pending, &mut stats).await?;
        bar.finish_and_clear();

        self.ledger
            .finish_run(&stats.run_id, RunTotals::from(&stats))
            .await
            .map_err(ledger_error)?;

        if stats.successful > 0 {
            if let Err(e) = self.vector_store.optimize().await {
                warn!("Failed to optimize vector database: {}", e);
            }
        }

        info!(
            "Total files: {}, Successful: {}, Failed: {}, Skipped: {}",
            stats.total, stats.successful, stats.failed, stats.skipped
        );

        Ok(stats)
    }

    /// Embed and store everything in `pending`, draining it
    async fn flush(
        &mut self,
        pending: &mut Vec<PendingArticle>,
        stats: &mut IngestionStats,
    ) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        let batch: Vec<PendingArticle> = std::mem::take(pending);
        debug!("Embedding batch of {} articles", batch.len());

        let mut embedded = Vec::with_capacity(batch.len());
        for (item, vector) in self.embed_batch(&batch) {
            match vector {
                Ok(vector) => embedded.push((item, vector)),
                Err(e) => {
                    error!("Failed to embed {}: {}", item.file_name, e);
                    self.record(NewFileOutcome::failed(
                        &stats.run_id,
                        &item.file_name,
                        Some(&item.article.pmid),
                        &e.to_string(),
                    ))
                    .await?;
                    stats.failed += 1;
                }
            }
        }

        if embedded.is_empty() {
            return Ok(());
        }

        let records = embedded
            .iter()
            .map(|(item, vector)| ArticleVector::from_normalized(&item.article, vector.clone()))
            .collect();

        match self.vector_store.upsert_articles(records).await {
            Ok(()) => {
                for (item, _) in &embedded {
                    self.record(NewFileOutcome::succeeded(
                        &stats.run_id,
                        &item.file_name,
                        &item.article.pmid,
                    ))
                    .await?;
                    info!("Successfully processed file: {}", item.file_name);
                }
                stats.successful += embedded.len();
            }
            Err(e) => {
                error!("Failed to store batch of {} articles: {}", embedded.len(), e);
                for (item, _) in &embedded {
                    self.record(NewFileOutcome::failed(
                        &stats.run_id,
                        &item.file_name,
                        Some(&item.article.pmid),
                        &e.to_string(),
                    ))
                    .await?;
                }
                stats.failed += embedded.len();
            }
        }

        Ok(())
    }

    /// Embed a batch in one request, falling back to one request per article
    fn embed_batch<'a>(
        &self,
        batch: &'a [PendingArticle],
    ) -> Vec<(&'a PendingArticle, Result<Vec<f32>>)> {
        let texts: Vec<String> = batch
            .iter()
            .map(|item| item.article.embedding_text())
            .collect();

        match self.embedder.embed_batch(&texts) {
            Ok(vectors) if vectors.len() == batch.len() => {
                batch.iter().zip(vectors.into_iter().map(Ok)).collect()
            }
            Ok(vectors) => {
                warn!(
                    "Embedder returned {} vectors for {} texts, retrying individually",
                    vectors.len(),
                    batch.len()
                );
                self.embed_individually(batch, &texts)
            }
            Err(e) => {
                warn!(
                    "Batch embedding of {} articles failed ({}), retrying individually",
                    batch.len(),
                    e
                );
                self.embed_individually(batch, &texts)
            }
        }
    }

    fn embed_individually<'a>(
        &self,
        batch: &'a [PendingArticle],
        texts: &[String],
    ) -> Vec<(&'a PendingArticle, Result<Vec<f32>>)> {
        batch
            .iter()
            .zip(texts)
            .map(|(item, text)| (item, self.embedder.embed(text)))
            .collect()
    }

    /// A file counts as ingested only while its last successful PMID is still in the vector table
    async fn already_indexed(&self, file_name: &str) -> Result<bool> {
        let Some(pmid) = self
            .ledger
            .last_ingested_pmid(file_name)
            .await
            .map_err(ledger_error)?
        else {
            return Ok(false);
        };

        if self.vector_store.contains_article(&pmid).await? {
            return Ok(true);
        }

        warn!(
            "{} was ingested as {} but is missing from '{}', re-ingesting",
            file_name,
            pmid,
            self.vector_store.table_name()
        );
        Ok(false)
    }

    async fn record(&self, outcome: NewFileOutcome) -> Result<()> {
        self.ledger
            .record_file(outcome)
            .await
            .map_err(ledger_error)?;
        Ok(())
    }
}
