/// Concrete implementations of core traits and application wiring.
pub mod app;

/// Interactive terminal front end.
pub mod cli;

/// Startup arguments and chat configuration.
pub mod config;

/// Chunking, retrieval, memory, prompting and the chat loop.
pub mod core;

pub mod error;
