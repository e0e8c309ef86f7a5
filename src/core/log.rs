use crate::error::RagError;

/// Append-only record of the conversation, one entry per turn.
pub trait ChatLog {
    fn log(&self, user: &str, assistant: &str) -> Result<(), RagError>;
}
