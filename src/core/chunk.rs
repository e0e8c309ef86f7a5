use crate::{err, error::RagError};
use chunx::{ChunkerError, FixedWindow};

/// Split `text` into contiguous chunks of at most `chunk_size` characters.
/// Empty input yields no chunks.
pub fn chunk(text: &str, chunk_size: usize) -> Result<Vec<&str>, RagError> {
    let window = match FixedWindow::new(chunk_size) {
        Ok(window) => window,
        Err(ChunkerError::Config(e)) => return err!(InvalidArgument, "chunk size: {}", e),
    };
    Ok(window.chunk(text))
}

/// Chunk every document in order and concatenate the results.
/// Chunks are owned since they outlive the corpus once indexed.
pub fn chunk_documents<S: AsRef<str>>(
    documents: &[S],
    chunk_size: usize,
) -> Result<Vec<String>, RagError> {
    let mut chunks = vec![];
    for document in documents {
        chunks.extend(chunk(document.as_ref(), chunk_size)?.into_iter().map(String::from));
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagErr;

    #[test]
    fn chunking_works() {
        assert_eq!(vec!["abc", "def", "g"], chunk("abcdefg", 3).unwrap());
    }

    #[test]
    fn zero_chunk_size_is_invalid() {
        let e = chunk("abc", 0).unwrap_err();
        assert!(matches!(e.error, RagErr::InvalidArgument(_)));
    }

    #[test]
    fn chunking_documents_preserves_order() {
        let docs = ["abcde", "", "fg"];
        let chunks = chunk_documents(&docs, 2).unwrap();

        assert_eq!(vec!["ab", "cd", "e", "fg"], chunks);
    }
}
