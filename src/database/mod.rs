// Database module
// SQLite ingestion ledger plus LanceDB vector index

pub mod lancedb;
pub mod sqlite;

pub use self::lancedb::{ArticlePayload, ArticleVector, SearchResult, VectorStore};
pub use self::sqlite::Database;
