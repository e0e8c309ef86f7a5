use crate::{
    core::{chunk::chunk_documents, embedder::Embedder, vector::VectorIndex},
    err,
    error::{RagErr, RagError},
    map_err,
};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Documents indexed when no corpus directory is configured.
pub const DEFAULT_DOCUMENTS: &[&str] = &[
    "Quantum entanglement describes correlations between particles that cannot be explained classically.",
    "The Higgs boson explains how particles acquire mass through interaction with the Higgs field.",
    "Transformers rely on self-attention mechanisms to model token relationships.",
];

#[derive(Debug, Deserialize)]
struct Record {
    text: String,
}

/// Read every `.jsonl` file in `dir`, in file name order, and return the `text`
/// field of each record in order. Blank lines are skipped.
pub fn load_corpus(dir: impl AsRef<Path>) -> Result<Vec<String>, RagError> {
    let dir = dir.as_ref();

    let mut files = vec![];
    for entry in map_err!(std::fs::read_dir(dir)) {
        let path = map_err!(entry).path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(path);
        }
    }
    files.sort();

    let mut documents = vec![];

    for file in files {
        let content = map_err!(std::fs::read_to_string(&file));

        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Record>(line) {
                Ok(record) => documents.push(record.text),
                Err(e) => {
                    return err!(CorruptState, "{}:{}: {}", file.display(), i + 1, e);
                }
            }
        }
    }

    info!("Loaded {} document(s) from {}", documents.len(), dir.display());

    Ok(documents)
}

/// Chunk `documents` and index the chunks.
/// An empty corpus yields an empty index which answers every query with no results.
pub async fn build_index<S: AsRef<str>>(
    documents: &[S],
    chunk_size: usize,
    embedder: &(dyn Embedder + Send + Sync),
) -> Result<VectorIndex, RagError> {
    let chunks = chunk_documents(documents, chunk_size)?;

    info!(
        "Indexing {} chunk(s) from {} document(s) with '{}'",
        chunks.len(),
        documents.len(),
        embedder.id()
    );

    match VectorIndex::build(chunks, embedder).await {
        Ok(index) => Ok(index),
        Err(e) if matches!(e.error, RagErr::EmptyCorpus) => {
            warn!("Corpus is empty, retrieval will not return any context");
            Ok(VectorIndex::default())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test::LengthEmbedder;

    #[test]
    fn loads_records_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.jsonl"),
            "{\"text\": \"third\"}\n\n{\"text\": \"fourth\", \"source\": \"x\"}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.jsonl"),
            "{\"text\": \"first\"}\n{\"text\": \"second\"}",
        )
        .unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "not a record").unwrap();

        let documents = load_corpus(dir.path()).unwrap();

        assert_eq!(vec!["first", "second", "third", "fourth"], documents);
    }

    #[test]
    fn malformed_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jsonl"), "{\"body\": \"no text\"}\n").unwrap();

        let e = load_corpus(dir.path()).unwrap_err();
        assert!(matches!(e.error, RagErr::CorruptState(_)));
    }

    #[tokio::test]
    async fn builds_index_from_chunks() {
        let index = build_index(DEFAULT_DOCUMENTS, 80, &LengthEmbedder).await.unwrap();

        let expected = DEFAULT_DOCUMENTS
            .iter()
            .map(|d| d.chars().count().div_ceil(80))
            .sum::<usize>();

        assert_eq!(expected, index.len());
        assert_eq!(DEFAULT_DOCUMENTS[0][..80], index.documents()[0]);
    }

    #[tokio::test]
    async fn empty_corpus_builds_empty_index() {
        let documents: &[&str] = &[];
        let index = build_index(documents, 80, &LengthEmbedder).await.unwrap();

        assert!(index.is_empty());
    }
}
