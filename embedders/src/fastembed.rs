/// Embedder implementation for fastembed when running it locally.
#[cfg(feature = "fe-local")]
pub mod local;
