use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, ModelInfo};
use ort::execution_providers::CPUExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

/// Model used when none is configured. Small enough to run on CPU.
pub const DEFAULT_MODEL: &str = "Qdrant/all-MiniLM-L6-v2-onnx";

/// A single fastembed text embedding model running in-process.
pub struct LocalFastEmbedder {
    model: fastembed::TextEmbedding,
    info: ModelInfo<EmbeddingModel>,
}

impl LocalFastEmbedder {
    /// Initialise the embedder with the model identified by `model_code`.
    /// Downloads the model on first use.
    pub fn new(model_code: &str) -> Result<Self, EmbeddingError> {
        tracing::info!("Initializing local Fastembed with '{model_code}'");

        #[cfg(feature = "cuda")]
        {
            use ort::execution_providers::ExecutionProvider;
            tracing::info!(
                "Using CUDA: {:?}",
                ExecutionProvider::is_available(&CUDAExecutionProvider::default())
            );
        }

        let info = list_models()
            .into_iter()
            .find(|m| m.model_code == model_code)
            .ok_or_else(|| {
                EmbeddingError::InvalidModel(format!(
                    "model '{model_code}' not supported by fastembed"
                ))
            })?;

        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(info.model.clone())
                .with_execution_providers(vec![
                    #[cfg(feature = "cuda")]
                    CUDAExecutionProvider::default().into(),
                    CPUExecutionProvider::default().into(),
                ])
                .with_show_download_progress(true),
        )?;

        Ok(Self { model, info })
    }

    pub fn model_code(&self) -> &str {
        &self.info.model_code
    }

    /// Vector size produced by the loaded model.
    pub fn dimensions(&self) -> usize {
        self.info.dim
    }

    pub fn embed(&self, content: &[&str]) -> Result<Vec<Vec<f64>>, EmbeddingError> {
        if content.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self.model.embed(content.to_vec(), None)?;

        debug_assert_eq!(
            embeddings.len(),
            content.len(),
            "Content length is different from embeddings!"
        );

        Ok(embeddings
            .into_iter()
            .map(|e| e.into_iter().map(|e| e as f64).collect())
            .collect())
    }
}

/// Models this embedder accepts.
pub fn list_models() -> Vec<ModelInfo<EmbeddingModel>> {
    const MODEL_LIST: &[EmbeddingModel] = &[
        EmbeddingModel::BGESmallENV15,
        EmbeddingModel::BGEBaseENV15,
        EmbeddingModel::AllMiniLML6V2,
        EmbeddingModel::AllMiniLML12V2,
    ];

    fastembed::TextEmbedding::list_supported_models()
        .into_iter()
        .filter(|model| MODEL_LIST.contains(&model.model))
        .collect()
}

impl std::fmt::Debug for LocalFastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFastEmbedder")
            .field("model", &self.info.model_code)
            .field("dim", &self.info.dim)
            .finish()
    }
}
