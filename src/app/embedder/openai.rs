use crate::{core::embedder::Embedder, error::RagError, map_err};

pub use ragchat_embedders::openai::{OpenAiEmbeddings, DEFAULT_MODEL};

#[async_trait::async_trait]
impl Embedder for OpenAiEmbeddings {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, content: &[&str]) -> Result<Vec<Vec<f64>>, RagError> {
        Ok(map_err!(OpenAiEmbeddings::embed(self, content).await))
    }
}
