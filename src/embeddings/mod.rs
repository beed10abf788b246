// Embeddings module
// Turns normalized article text into fixed-width vectors

pub mod ollama;

pub use ollama::OllamaClient;

use crate::Result;

/// Source of text embeddings used by the ingestion pipeline
pub trait Embedder: Send + Sync {
    /// Width of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Embed a single text
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| {
            crate::IngestError::Embedding("embedding service returned no vectors".to_string())
        })
    }

    /// Embed several texts, returning one vector per input in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
