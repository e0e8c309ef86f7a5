use crate::{config::SamplingParams, error::RagError};

/// A text generation backend. Accepts a prompt and returns the generated text,
/// which may or may not echo the prompt.
#[async_trait::async_trait]
pub trait Generator {
    fn id(&self) -> &'static str;

    /// Generate a continuation of `prompt`.
    ///
    /// * `prompt`: The fully assembled prompt.
    /// * `params`: Sampling parameters. Backends ignore the ones they do not support.
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, RagError>;
}
