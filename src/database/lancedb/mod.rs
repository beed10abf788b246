// LanceDB vector database module
// Handles vector storage and similarity search for article embeddings


pub mod vector_store;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedArticle;

pub use vector_store::{SearchResult, VectorStore};

/// One article row in the vector table, keyed by PMID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleVector {
    pub pmid: String,
    /// Embedding of the article's processed text and terms
    pub vector: Vec<f32>,
    pub payload: ArticlePayload,
}

/// Searchable metadata stored alongside each vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePayload {
    pub pmid: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub medical_terms: Vec<String>,
    pub year: String,
    pub journal: String,
    /// RFC 3339 timestamp of when the row was written
    pub created_at: String,
}

impl ArticleVector {
    #[inline]
    pub fn from_normalized(article: &NormalizedArticle, vector: Vec<f32>) -> Self {
        Self {
            pmid: article.pmid.clone(),
            vector,
            payload: ArticlePayload {
                pmid: article.pmid.clone(),
                title: article.title.clone(),
                abstract_text: article.abstract_text.clone(),
                medical_terms: article.medical_terms.iter().cloned().collect(),
                year: article.publication_year.clone(),
                journal: article.journal.clone(),
                created_at: Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Quote a string literal for a LanceDB filter expression
#[inline]
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
