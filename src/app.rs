//! Concrete implementations of the [core][crate::core] module.

pub mod corpus;
pub mod embedder;
pub mod llm;
pub mod log;
pub mod state;
