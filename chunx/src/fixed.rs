use super::ChunkerError;
use tracing::debug;

const FIXED_WINDOW_DEFAULT_SIZE: usize = 80;

/// Splits input into contiguous, non-overlapping chunks of at most
/// `size` characters. The last chunk holds whatever remains.
///
/// Sizes are measured in `char`s, so multi-byte input is never split
/// inside a code point.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindow {
    pub size: usize,
}

impl FixedWindow {
    /// Create a new `FixedWindow` chunker.
    /// Errors if `size` is 0.
    pub fn new(size: usize) -> Result<Self, ChunkerError> {
        if size == 0 {
            return Err(ChunkerError::Config(
                "size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { size })
    }

    pub fn chunk<'a>(&self, input: &'a str) -> Vec<&'a str> {
        if input.is_empty() {
            return vec![];
        }

        let mut chunks = vec![];
        let mut start = 0;

        // Byte offset of every `size`-th char is a chunk boundary.
        for (i, (offset, _)) in input.char_indices().enumerate() {
            if i > 0 && i % self.size == 0 {
                chunks.push(&input[start..offset]);
                start = offset;
            }
        }

        chunks.push(&input[start..]);

        debug!(
            "Chunked {} chunks, avg chunk size: {}",
            chunks.len(),
            input.len() / chunks.len()
        );

        chunks
    }
}

impl Default for FixedWindow {
    fn default() -> Self {
        Self {
            size: FIXED_WINDOW_DEFAULT_SIZE,
        }
    }
}
