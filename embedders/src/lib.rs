//! Embedding provider clients. Each provider turns text into fixed-length
//! vectors and is enabled through its own cargo feature.

pub mod error;

#[cfg(feature = "fe-local")]
pub mod fastembed;

#[cfg(feature = "openai")]
pub mod openai;
