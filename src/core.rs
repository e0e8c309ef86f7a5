//! The core module defines the retrieval and memory substrate of the chat.
//! It provides the traits upstream adapters need to implement.

pub mod chat;
pub mod chunk;
pub mod embedder;
pub mod generator;
pub mod log;
pub mod memory;
pub mod prompt;
pub mod vector;
