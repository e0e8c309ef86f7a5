#[cfg(not(any(feature = "openai", feature = "tgi")))]
compile_error!("one of `openai` or `tgi` features must be enabled");

/// Generator implementation for OpenAI chat completions.
#[cfg(feature = "openai")]
pub mod openai;

/// Generator implementation for a self-hosted text generation server.
#[cfg(feature = "tgi")]
pub mod tgi;
