// Article record module
// Canonical, validated shape of one medical article JSON document

#[cfg(test)]
mod tests;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::error::Category;
use std::fs;
use std::path::Path;

use crate::{IngestError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalInfo {
    pub title: String,
    pub issn: String,
    pub issue: Option<String>,
    pub volume: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationDate {
    pub year: String,
    pub month: Option<String>,
    pub day: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub pmid: String,
    pub publication_date: PublicationDate,
    pub journal: JournalInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub last_name: String,
    pub fore_name: String,
    #[serde(default)]
    pub affiliations: Vec<String>,
}

/// One labelled part of a structured abstract (e.g. BACKGROUND, METHODS)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AbstractSection {
    pub label: Option<String>,
    pub nlm_category: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_sections: Vec<AbstractSection>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Metadata {
    pub doi: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// A single publication as produced by the upstream crawler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub basic_info: BasicInfo,
    pub content: Content,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub extracted_at: NaiveDateTime,
}

impl ArticleRecord {
    /// Parse and validate a JSON document.
    ///
    /// Schema violations (missing required fields, wrong value types) are
    /// reported as [`IngestError::InvalidInput`]; documents that are not JSON
    /// at all are reported as [`IngestError::Json`].
    #[inline]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| match e.classify() {
            Category::Data => IngestError::InvalidInput(e.to_string()),
            Category::Io | Category::Syntax | Category::Eof => IngestError::Json(e),
        })
    }

    #[inline]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}

/// Accepts RFC 3339 timestamps (normalized to UTC) as well as naive ISO 8601 ones
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(timestamp.naive_utc());
    }

    raw.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
}
