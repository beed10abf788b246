
use super::{ArticlePayload, ArticleVector, sql_literal};
use crate::{IngestError, config::Config};
use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, ListArray, ListBuilder,
    RecordBatchIterator, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub article: ArticlePayload,
    pub similarity_score: f32,
    pub distance: f32,
}

fn db_error(context: &str) -> impl FnOnce(lancedb::Error) -> IngestError + '_ {
    move |e| IngestError::Database(format!("{context}: {e}"))
}

fn string_array(records: &[ArticleVector], field: impl Fn(&ArticleVector) -> &str) -> ArrayRef {
    Arc::new(StringArray::from(
        records.iter().map(field).collect::<Vec<_>>(),
    ))
}

impl VectorStore {
    /// Open the vector store described by the application configuration
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, IngestError> {
        Self::open(
            &config.vector_database_path(),
            &config.ingest.collection,
            config.ollama.embedding_dimension as usize,
        )
        .await
    }

    /// Open (or create) `table_name` under `db_path` for vectors of `vector_dimension`
    #[inline]
    pub async fn open(
        db_path: &Path,
        table_name: &str,
        vector_dimension: usize,
    ) -> Result<Self, IngestError> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            IngestError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(db_error("Failed to connect to LanceDB"))?;

        let mut store = Self {
            connection,
            table_name: table_name.to_string(),
            vector_dimension,
        };

        store.initialize_table().await?;

        info!(
            "Vector store '{}' initialized with {} dimensions",
            store.table_name, store.vector_dimension
        );
        Ok(store)
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Create the table when missing, or adopt the dimension of the existing one
    async fn initialize_table(&mut self) -> Result<(), IngestError> {
        if self.table_exists().await? {
            let existing = self.detect_existing_vector_dimension().await?;
            if existing != self.vector_dimension {
                info!(
                    "Existing table uses {} dimensions, configured {}; it will be recreated on the next write",
                    existing, self.vector_dimension
                );
            }
            self.vector_dimension = existing;
            return Ok(());
        }

        self.create_table(self.vector_dimension).await
    }

    async fn table_exists(&self) -> Result<bool, IngestError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(db_error("Failed to list tables"))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn create_table(&self, vector_dim: usize) -> Result<(), IngestError> {
        self.connection
            .create_empty_table(&self.table_name, Self::create_schema(vector_dim))
            .execute()
            .await
            .map_err(db_error("Failed to create table"))?;

        info!(
            "Table '{}' created with {} dimensions",
            self.table_name, vector_dim
        );
        Ok(())
    }

    async fn open_table(&self) -> Result<Table, IngestError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(db_error("Failed to open table"))
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, IngestError> {
        let schema = self
            .open_table()
            .await?
            .schema()
            .await
            .map_err(db_error("Failed to get table schema"))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                IngestError::Database(
                    "Could not find vector column or determine dimension".to_string(),
                )
            })
    }

    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("pmid", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("title", DataType::Utf8, false),
            Field::new("abstract", DataType::Utf8, false),
            Field::new(
                "medical_terms",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                false,
            ),
            Field::new("year", DataType::Utf8, false),
            Field::new("journal", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Insert or replace articles, keyed by PMID.
    ///
    /// Rows whose PMID is already stored are updated in place and new PMIDs
    /// are inserted, in a single commit. When several records share a PMID
    /// the last one wins.
    #[inline]
    pub async fn upsert_articles(&mut self, records: Vec<ArticleVector>) -> Result<(), IngestError> {
        if records.is_empty() {
            debug!("No articles to store");
            return Ok(());
        }

        let records = Self::deduplicate(records);

        let vector_dim = records[0].vector.len();
        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(IngestError::Database(format!(
                "Article {} has {} dimensions, expected {}",
                bad.pmid,
                bad.vector.len(),
                vector_dim
            )));
        }

        if vector_dim != self.vector_dimension {
            info!(
                "Vector dimension changed from {} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.drop_table_if_exists().await?;
            self.create_table(vector_dim).await?;
            self.vector_dimension = vector_dim;
        }

        debug!("Upserting batch of {} articles", records.len());

        let table = self.open_table().await?;

        let record_batch = self.create_record_batch(&records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        // Matched rows are replaced in the same commit as the inserts
        let mut merge = table.merge_insert(&["pmid"]);
        merge.when_matched_update_all(None);
        merge.when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(db_error("Failed to upsert articles"))?;

        info!("Stored {} articles in '{}'", records.len(), self.table_name);
        Ok(())
    }

    fn deduplicate(records: Vec<ArticleVector>) -> Vec<ArticleVector> {
        let last_index: HashMap<String, usize> = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.pmid.clone(), index))
            .collect();

        records
            .into_iter()
            .enumerate()
            .filter(|(index, record)| last_index.get(&record.pmid) == Some(index))
            .map(|(_, record)| record)
            .collect()
    }

    fn create_record_batch(&self, records: &[ArticleVector]) -> Result<RecordBatch, IngestError> {
        let vector_dim = self.vector_dimension;

        let flat_values: Vec<f32> = records
            .iter()
            .flat_map(|r| r.vector.iter().copied())
            .collect();
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array = FixedSizeListArray::try_new(
            field,
            vector_dim as i32,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| IngestError::Database(format!("Failed to create vector array: {}", e)))?;

        let mut terms_builder = ListBuilder::new(StringBuilder::new());
        for record in records {
            for term in &record.payload.medical_terms {
                terms_builder.values().append_value(term);
            }
            terms_builder.append(true);
        }

        let arrays: Vec<ArrayRef> = vec![
            string_array(records, |r| &r.pmid),
            Arc::new(vector_array),
            string_array(records, |r| &r.payload.title),
            string_array(records, |r| &r.payload.abstract_text),
            Arc::new(terms_builder.finish()),
            string_array(records, |r| &r.payload.year),
            string_array(records, |r| &r.payload.journal),
            string_array(records, |r| &r.payload.created_at),
        ];

        RecordBatch::try_new(Self::create_schema(vector_dim), arrays)
            .map_err(|e| IngestError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for the articles closest to `query_vector` by cosine distance
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
        year_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>, IngestError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        if query_vector.len() != self.vector_dimension {
            return Err(IngestError::Embedding(format!(
                "Query has {} dimensions, index uses {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        let table = self.open_table().await?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(db_error("Failed to create vector search"))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit);

        if let Some(year) = year_filter {
            query = query.only_if(format!("year = {}", sql_literal(year)));
        }

        let mut results = query
            .execute()
            .await
            .map_err(db_error("Failed to execute search"))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(db_error("Failed to read result stream"))?
        {
            search_results.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, IngestError> {
        batch
            .column_by_name(name)
            .ok_or_else(|| IngestError::Database(format!("Missing {name} column")))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| IngestError::Database(format!("Invalid {name} column type")))
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, IngestError> {
        let pmids = Self::string_column(batch, "pmid")?;
        let titles = Self::string_column(batch, "title")?;
        let abstracts = Self::string_column(batch, "abstract")?;
        let years = Self::string_column(batch, "year")?;
        let journals = Self::string_column(batch, "journal")?;
        let created_ats = Self::string_column(batch, "created_at")?;

        let terms = batch
            .column_by_name("medical_terms")
            .ok_or_else(|| IngestError::Database("Missing medical_terms column".to_string()))?
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or_else(|| IngestError::Database("Invalid medical_terms column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        (0..batch.num_rows())
            .map(|row| {
                let row_terms = terms.value(row);
                let medical_terms = row_terms
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        IngestError::Database("Invalid medical_terms item type".to_string())
                    })?
                    .iter()
                    .flatten()
                    .map(str::to_string)
                    .collect();

                let distance = distances
                    .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

                Ok(SearchResult {
                    article: ArticlePayload {
                        pmid: pmids.value(row).to_string(),
                        title: titles.value(row).to_string(),
                        abstract_text: abstracts.value(row).to_string(),
                        medical_terms,
                        year: years.value(row).to_string(),
                        journal: journals.value(row).to_string(),
                        created_at: created_ats.value(row).to_string(),
                    },
                    similarity_score: 1.0 - distance,
                    distance,
                })
            })
            .collect()
    }

    /// Delete the article with `pmid`, returning whether it was present
    #[inline]
    pub async fn delete_article(&mut self, pmid: &str) -> Result<bool, IngestError> {
        debug!("Deleting article: {}", pmid);

        let table = self.open_table().await?;
        let predicate = format!("pmid = {}", sql_literal(pmid));

        let existing = table
            .count_rows(Some(predicate.clone()))
            .await
            .map_err(db_error("Failed to count matching articles"))?;

        if existing == 0 {
            debug!("Article {} not present", pmid);
            return Ok(false);
        }

        table
            .delete(&predicate)
            .await
            .map_err(db_error("Failed to delete article"))?;

        info!("Deleted article: {}", pmid);
        Ok(true)
    }

    /// Whether a row with `pmid` is stored
    #[inline]
    pub async fn contains_article(&self, pmid: &str) -> Result<bool, IngestError> {
        let count = self
            .open_table()
            .await?
            .count_rows(Some(format!("pmid = {}", sql_literal(pmid))))
            .await
            .map_err(db_error("Failed to look up article"))?;

        Ok(count > 0)
    }

    /// Get the total number of articles stored
    #[inline]
    pub async fn count_articles(&self) -> Result<u64, IngestError> {
        let count = self
            .open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(db_error("Failed to count rows"))?;

        Ok(count as u64)
    }

    /// Optimize the vector database by compacting and reorganizing data
    #[inline]
    pub async fn optimize(&mut self) -> Result<(), IngestError> {
        debug!("Optimizing vector database");

        self.open_table()
            .await?
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(db_error("Failed to optimize table"))?;

        info!("Vector database optimization completed");
        Ok(())
    }

    async fn drop_table_if_exists(&self) -> Result<(), IngestError> {
        if self.table_exists().await? {
            info!("Dropping existing table '{}'", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(db_error("Failed to drop table"))?;
        }

        Ok(())
    }
}
