use crate::error::RagError;

/// Operations related to embeddings.
///
/// Implementations must be deterministic for a given model so that index
/// queries are reproducible.
#[async_trait::async_trait]
pub trait Embedder {
    fn id(&self) -> &'static str;

    /// Get the vectors for the elements in `content`, one per element and in the same order.
    /// The content passed in can be a user's query or a chunked document.
    ///
    /// * `content`: The text to embed.
    async fn embed(&self, content: &[&str]) -> Result<Vec<Vec<f64>>, RagError>;
}
