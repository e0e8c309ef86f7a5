use super::embedder::Embedder;
use crate::{err, error::RagError};
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// A document returned from a [VectorIndex] query.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    /// The stored text.
    pub content: String,

    /// Squared euclidean distance to the query vector.
    pub distance: f64,
}

/// Exact nearest neighbour index over a fixed set of embedded documents.
///
/// Documents and their vectors are stored in parallel and never change after
/// [build][VectorIndex::build]. Queries compare against every stored vector,
/// so results are fully reproducible for a given query vector.
///
/// The index is read only and can be shared between sessions, e.g. behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    documents: Vec<String>,
    vectors: Vec<Vec<f64>>,
    dimensions: usize,
}

impl VectorIndex {
    /// Embed every document and store it alongside its vector.
    ///
    /// Fails with `EmptyCorpus` if there are no documents and with `Embedding`
    /// if the embedder fails or returns inconsistent vectors.
    ///
    /// * `documents`: The documents to store, usually chunks.
    /// * `embedder`: Produces the document vectors.
    pub async fn build(
        documents: Vec<String>,
        embedder: &(dyn Embedder + Send + Sync),
    ) -> Result<Self, RagError> {
        if documents.is_empty() {
            return err!(EmptyCorpus);
        }

        let __start = Instant::now();

        let content = documents.iter().map(String::as_str).collect::<Vec<_>>();
        let vectors = embedder.embed(&content).await?;

        Self::from_embeddings(documents, vectors).inspect(|index| {
            debug!(
                "Built index of {} documents ({}d) with '{}' in {}ms",
                index.len(),
                index.dimensions,
                embedder.id(),
                __start.elapsed().as_millis()
            )
        })
    }

    /// Create an index from already embedded documents.
    /// `documents` and `vectors` must be 1:1.
    pub fn from_embeddings(
        documents: Vec<String>,
        vectors: Vec<Vec<f64>>,
    ) -> Result<Self, RagError> {
        if documents.is_empty() {
            return err!(EmptyCorpus);
        }

        if documents.len() != vectors.len() {
            return err!(
                Embedding,
                "expected {} vectors, got {}",
                documents.len(),
                vectors.len()
            );
        }

        let dimensions = vectors[0].len();

        if dimensions == 0 {
            return err!(Embedding, "received empty vectors");
        }

        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return err!(
                Embedding,
                "vector {} has {} dimensions, expected {}",
                i,
                v.len(),
                dimensions
            );
        }

        Ok(Self {
            documents,
            vectors,
            dimensions,
        })
    }

    /// Amount of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Dimensionality shared by all stored vectors. 0 for an empty index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Embed `query` and return the `k` closest documents, closest first.
    ///
    /// * `query`: The text to search by.
    /// * `k`: Maximum amount of results.
    /// * `embedder`: Must be the one the index was built with.
    pub async fn query(
        &self,
        query: &str,
        k: usize,
        embedder: &(dyn Embedder + Send + Sync),
    ) -> Result<Vec<Retrieved>, RagError> {
        if k < 1 {
            return err!(InvalidArgument, "k must be at least 1, got {}", k);
        }

        if self.is_empty() {
            return Ok(vec![]);
        }

        let mut embeddings = embedder.embed(&[query]).await?;

        if embeddings.len() != 1 {
            return err!(
                Embedding,
                "expected 1 query vector, got {}",
                embeddings.len()
            );
        }

        self.query_vector(&std::mem::take(&mut embeddings[0]), k)
    }

    /// Return the `k` documents closest to `search` in ascending distance order.
    /// Equal distances keep insertion order. If `k` exceeds the amount of
    /// documents, all of them are returned.
    pub fn query_vector(&self, search: &[f64], k: usize) -> Result<Vec<Retrieved>, RagError> {
        if k < 1 {
            return err!(InvalidArgument, "k must be at least 1, got {}", k);
        }

        if self.is_empty() {
            return Ok(vec![]);
        }

        if search.len() != self.dimensions {
            return err!(
                Embedding,
                "query has {} dimensions, index has {}",
                search.len(),
                self.dimensions
            );
        }

        let distances = self
            .vectors
            .par_iter()
            .map(|v| squared_euclidean_distance(search, v))
            .collect::<Vec<_>>();

        let mut ranked = (0..distances.len()).collect::<Vec<_>>();
        // Stable sort, ties stay in insertion order.
        ranked.sort_by(|a, b| distances[*a].total_cmp(&distances[*b]));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|i| Retrieved {
                content: self.documents[i].clone(),
                distance: distances[i],
            })
            .collect())
    }
}

/// https://en.wikipedia.org/wiki/Euclidean_distance#Squared_Euclidean_distance
fn squared_euclidean_distance(vec1: &[f64], vec2: &[f64]) -> f64 {
    vec1.iter()
        .zip(vec2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app::test::StubEmbedder, error::RagErr};

    fn animals() -> StubEmbedder {
        StubEmbedder::new([
            ("cat", vec![0., 0.]),
            ("dog", vec![10., 10.]),
            ("car", vec![1., 0.]),
            ("cats", vec![0., 0.]),
        ])
    }

    fn docs(d: &[&str]) -> Vec<String> {
        d.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn query_returns_closest_first() {
        let embedder = animals();
        let index = VectorIndex::build(docs(&["cat", "dog", "car"]), &embedder)
            .await
            .unwrap();

        let results = index.query("cats", 2, &embedder).await.unwrap();

        let content = results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>();
        assert_eq!(vec!["cat", "car"], content);
        assert_eq!(0., results[0].distance);
        assert_eq!(1., results[1].distance);
    }

    #[tokio::test]
    async fn k_larger_than_corpus_returns_all() {
        let embedder = animals();
        let index = VectorIndex::build(docs(&["cat", "dog", "car"]), &embedder)
            .await
            .unwrap();

        let results = index.query("cats", 10, &embedder).await.unwrap();

        let content = results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>();
        assert_eq!(vec!["cat", "car", "dog"], content);
    }

    #[tokio::test]
    async fn zero_k_is_invalid() {
        let embedder = animals();
        let index = VectorIndex::build(docs(&["cat"]), &embedder).await.unwrap();

        let e = index.query("cats", 0, &embedder).await.unwrap_err();
        assert!(matches!(e.error, RagErr::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn empty_corpus_fails_build() {
        let embedder = animals();

        let e = VectorIndex::build(vec![], &embedder).await.unwrap_err();
        assert!(matches!(e.error, RagErr::EmptyCorpus));
    }

    #[tokio::test]
    async fn empty_index_answers_with_nothing() {
        let embedder = animals();
        let index = VectorIndex::default();

        assert!(index.query("cats", 3, &embedder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_fails_build() {
        let embedder = animals();

        let e = VectorIndex::build(docs(&["cat", "unknown"]), &embedder)
            .await
            .unwrap_err();
        assert!(matches!(e.error, RagErr::Embedding(_)));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let e = VectorIndex::from_embeddings(docs(&["a", "b"]), vec![vec![0., 1.], vec![1.]])
            .unwrap_err();
        assert!(matches!(e.error, RagErr::Embedding(_)));

        let index = VectorIndex::from_embeddings(docs(&["a"]), vec![vec![0., 1.]]).unwrap();
        let e = index.query_vector(&[0., 1., 2.], 1).unwrap_err();
        assert!(matches!(e.error, RagErr::Embedding(_)));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = VectorIndex::from_embeddings(
            docs(&["first", "far", "second", "third"]),
            vec![vec![1., 0.], vec![5., 5.], vec![0., 1.], vec![-1., 0.]],
        )
        .unwrap();

        let results = index.query_vector(&[0., 0.], 3).unwrap();

        let content = results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>();
        assert_eq!(vec!["first", "second", "third"], content);
    }

    #[test]
    fn results_are_sorted_bounded_and_distinct() {
        let documents = (0..20).map(|i| format!("doc {i}")).collect::<Vec<_>>();
        let vectors = (0..20)
            .map(|i| {
                let x = ((i * 7) % 11) as f64;
                vec![x, (i % 3) as f64, -x / 2.]
            })
            .collect::<Vec<_>>();
        let index = VectorIndex::from_embeddings(documents, vectors).unwrap();

        for k in 1..25 {
            let results = index.query_vector(&[3., 1., 0.], k).unwrap();

            assert_eq!(k.min(index.len()), results.len());
            assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));

            let mut seen = results.iter().map(|r| &r.content).collect::<Vec<_>>();
            seen.sort();
            seen.dedup();
            assert_eq!(results.len(), seen.len());
        }
    }

    #[test]
    fn queries_are_reproducible() {
        let index = VectorIndex::from_embeddings(
            docs(&["a", "b", "c"]),
            vec![vec![0.3, 0.1], vec![0.2, 0.2], vec![0.1, 0.3]],
        )
        .unwrap();

        let first = index.query_vector(&[0.2, 0.2], 3).unwrap();
        let second = index.query_vector(&[0.2, 0.2], 3).unwrap();

        assert_eq!(first, second);
    }
}
