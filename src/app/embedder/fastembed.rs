use crate::{core::embedder::Embedder, error::RagError, map_err};

pub use ragchat_embedders::fastembed::local::{LocalFastEmbedder, DEFAULT_MODEL};

#[async_trait::async_trait]
impl Embedder for LocalFastEmbedder {
    fn id(&self) -> &'static str {
        "fembed"
    }

    async fn embed(&self, content: &[&str]) -> Result<Vec<Vec<f64>>, RagError> {
        // Inference is CPU bound, keep it off the scheduler threads.
        Ok(map_err!(tokio::task::block_in_place(|| {
            LocalFastEmbedder::embed(self, content)
        })))
    }
}
