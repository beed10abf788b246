#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use med_ingest::article::ArticleRecord;
use med_ingest::config::Config;
use med_ingest::database::sqlite::models::FileStatus;
use med_ingest::embeddings::Embedder;
use med_ingest::ingest::{IngestOptions, IngestPipeline};
use med_ingest::normalize::TextProcessor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEST_DIMENSION: usize = 8;

/// Bag-of-bytes embedder, so identical texts map to identical vectors
struct HistogramEmbedder;

impl Embedder for HistogramEmbedder {
    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    fn embed_batch(&self, texts: &[String]) -> med_ingest::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; TEST_DIMENSION];
                for byte in text.bytes() {
                    vector[usize::from(byte) % TEST_DIMENSION] += 1.0;
                }
                vector
            })
            .collect())
    }
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::new(temp_dir.path());
    config.ollama.embedding_dimension = TEST_DIMENSION as u32;
    config.ollama.batch_size = 2;
    (config, temp_dir)
}

#[tokio::test]
async fn fixture_directory_end_to_end() {
    let (config, _temp_dir) = create_test_config();
    let mut pipeline = IngestPipeline::from_config(&config, HistogramEmbedder)
        .await
        .expect("should build pipeline");

    let stats = pipeline
        .run(&fixtures_dir(), &IngestOptions::default())
        .await
        .expect("run should complete despite bad files");

    assert_eq!(stats.total, 4);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.skipped, 0);
    assert_eq!(
        pipeline
            .vector_store()
            .count_articles()
            .await
            .expect("should count"),
        2
    );

    let run = pipeline
        .ledger()
        .get_run(&stats.run_id)
        .await
        .expect("should read run")
        .expect("run should exist");
    assert!(run.is_finished());
    assert_eq!(run.successful, 2);
    assert_eq!(run.failed, 2);

    let failures = pipeline
        .ledger()
        .list_failures(&stats.run_id)
        .await
        .expect("should list failures");
    let mut failed_files: Vec<&str> = failures.iter().map(|f| f.file_name.as_str()).collect();
    failed_files.sort_unstable();
    assert_eq!(failed_files, vec!["30001003.json", "30001004.json"]);
    assert!(failures.iter().all(|f| f.status == FileStatus::Failed));
    assert!(failures.iter().all(|f| f.error_message.is_some()));
}

#[tokio::test]
async fn ingested_article_is_its_own_nearest_neighbour() {
    let (config, _temp_dir) = create_test_config();
    let mut pipeline = IngestPipeline::from_config(&config, HistogramEmbedder)
        .await
        .expect("should build pipeline");
    pipeline
        .run(&fixtures_dir(), &IngestOptions::default())
        .await
        .expect("run should complete");

    let record = ArticleRecord::from_path(fixtures_dir().join("30001002.json"))
        .expect("fixture should parse");
    let processor = TextProcessor::new(&config.normalization).expect("default config is valid");
    let article = processor.process_article(&record);
    let query = HistogramEmbedder
        .embed(&article.embedding_text())
        .expect("fake embedder never fails");

    let results = pipeline
        .vector_store()
        .search_similar(&query, 2, None)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].article.pmid, "30001002");
    assert_eq!(results[0].article.journal, "Nature Genetics");
    assert_eq!(results[0].article.year, "2023");
    assert!(
        results[0]
            .article
            .medical_terms
            .contains(&"TP53".to_string())
    );

    let filtered = pipeline
        .vector_store()
        .search_similar(&query, 5, Some("2021"))
        .await
        .expect("search should succeed");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].article.pmid, "30001001");
}

#[tokio::test]
async fn second_run_skips_ingested_files() {
    let (config, _temp_dir) = create_test_config();
    let mut pipeline = IngestPipeline::from_config(&config, HistogramEmbedder)
        .await
        .expect("should build pipeline");
    pipeline
        .run(&fixtures_dir(), &IngestOptions::default())
        .await
        .expect("first run should complete");

    let options = IngestOptions {
        file_limit: 0,
        skip_ingested: true,
    };
    let stats = pipeline
        .run(&fixtures_dir(), &options)
        .await
        .expect("second run should complete");

    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.successful, 0);
    assert_eq!(stats.failed, 2);

    let runs = pipeline
        .ledger()
        .list_recent_runs(10)
        .await
        .expect("should list runs");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, stats.run_id);
}

#[tokio::test]
async fn state_survives_reopening() {
    let (config, _temp_dir) = create_test_config();
    {
        let mut pipeline = IngestPipeline::from_config(&config, HistogramEmbedder)
            .await
            .expect("should build pipeline");
        let options = IngestOptions {
            file_limit: 1,
            skip_ingested: false,
        };
        let stats = pipeline
            .run(&fixtures_dir(), &options)
            .await
            .expect("run should complete");
        assert_eq!(stats.total, 1);
        assert_eq!(stats.successful, 1);
    }

    let pipeline = IngestPipeline::from_config(&config, HistogramEmbedder)
        .await
        .expect("should reopen pipeline");
    assert_eq!(
        pipeline
            .vector_store()
            .count_articles()
            .await
            .expect("should count"),
        1
    );
    assert!(
        pipeline
            .ledger()
            .file_already_ingested("30001001.json")
            .await
            .expect("should query ledger")
    );
}
