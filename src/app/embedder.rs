#[cfg(not(any(feature = "fe-local", feature = "openai")))]
compile_error!("one of `fe-local` or `openai` features must be enabled");

/// Embedder implementation for fastembed when running it locally.
#[cfg(feature = "fe-local")]
pub mod fastembed;

/// Embedder implementation for the OpenAI embeddings API.
#[cfg(feature = "openai")]
pub mod openai;
