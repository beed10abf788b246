
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// One invocation of the ingestion pipeline over a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IngestRun {
    pub id: String,
    pub source_dir: String,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub total_files: i64,
    pub successful: i64,
    pub failed: i64,
    pub skipped: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum FileStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl std::fmt::Display for FileStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            FileStatus::Succeeded => write!(f, "Succeeded"),
            FileStatus::Failed => write!(f, "Failed"),
            FileStatus::Skipped => write!(f, "Skipped"),
        }
    }
}

/// Outcome of one input file within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IngestedFile {
    pub id: i64,
    pub run_id: String,
    pub file_name: String,
    pub pmid: Option<String>,
    pub status: FileStatus,
    pub error_message: Option<String>,
    pub processed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFileOutcome {
    pub run_id: String,
    pub file_name: String,
    pub pmid: Option<String>,
    pub status: FileStatus,
    pub error_message: Option<String>,
}

/// Final counters written when a run finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunTotals {
    pub total_files: i64,
    pub successful: i64,
    pub failed: i64,
    pub skipped: i64,
}

impl IngestRun {
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    #[inline]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }
}

impl NewFileOutcome {
    #[inline]
    pub fn succeeded(run_id: &str, file_name: &str, pmid: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            file_name: file_name.to_string(),
            pmid: Some(pmid.to_string()),
            status: FileStatus::Succeeded,
            error_message: None,
        }
    }

    #[inline]
    pub fn failed(run_id: &str, file_name: &str, pmid: Option<&str>, error: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            file_name: file_name.to_string(),
            pmid: pmid.map(str::to_string),
            status: FileStatus::Failed,
            error_message: Some(error.to_string()),
        }
    }

    #[inline]
    pub fn skipped(run_id: &str, file_name: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            file_name: file_name.to_string(),
            pmid: None,
            status: FileStatus::Skipped,
            error_message: None,
        }
    }
}
