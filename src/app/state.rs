use crate::{
    app::{corpus, log::JsonlChatLog},
    config::{Backend, ChatConfig, StartArgs},
    core::{
        chat::{ChatSession, Retrieval},
        embedder::Embedder,
        generator::Generator,
    },
    err,
    error::RagError,
    map_err,
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Everything a chat session is started from, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,

    pub generator: Arc<dyn Generator + Send + Sync>,

    /// Present when running with `--rag`.
    pub retrieval: Option<Retrieval>,

    pub log: Arc<JsonlChatLog>,

    pub state_path: PathBuf,
}

impl AppState {
    /// Load the application state using the provided arguments. Initialises tracing.
    pub async fn new(args: &StartArgs) -> Result<Self, RagError> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from(args.log()))
            .init();

        let config = ChatConfig::read(args.config_path())?;

        let generator = generator(args)?;

        let retrieval = if args.rag {
            Some(retrieval(args, &config).await?)
        } else {
            None
        };

        let log = Arc::new(JsonlChatLog::new(
            PathBuf::from(args.log_dir()).join(&config.log_file),
        ));

        let state_path = PathBuf::from(args.state_dir()).join(&config.state_file);

        Ok(Self {
            config,
            generator,
            retrieval,
            log,
            state_path,
        })
    }

    /// Create the session for a new [ChatOrchestrator][crate::core::chat::ChatOrchestrator].
    pub fn session(&self) -> ChatSession {
        ChatSession {
            generator: self.generator.clone(),
            retrieval: self.retrieval.clone(),
            log: Some(self.log.clone()),
            state_path: self.state_path.clone(),
            config: self.config.clone(),
        }
    }
}

fn generator(args: &StartArgs) -> Result<Arc<dyn Generator + Send + Sync>, RagError> {
    match args.backend {
        #[cfg(feature = "tgi")]
        Backend::Tgi => Ok(Arc::new(crate::app::llm::tgi::TgiGenerator::new(
            &args.tgi_url(),
        ))),

        #[cfg(feature = "openai")]
        Backend::Openai => Ok(Arc::new(crate::app::llm::openai::OpenAiGenerator::new(
            &args.openai_endpoint(),
            &args.open_ai_key(),
            &args.model(),
        ))),

        #[allow(unreachable_patterns)]
        backend => err!(
            InvalidArgument,
            "backend '{:?}' is not enabled in this build",
            backend
        ),
    }
}

async fn retrieval(args: &StartArgs, config: &ChatConfig) -> Result<Retrieval, RagError> {
    let embedder = embedder(args)?;

    let documents = match args.corpus_dir {
        Some(ref dir) => corpus::load_corpus(dir)?,
        None => {
            info!("No corpus directory given, using built-in documents");
            corpus::DEFAULT_DOCUMENTS
                .iter()
                .map(|d| d.to_string())
                .collect()
        }
    };

    let index = corpus::build_index(&documents, config.chunk_size, embedder.as_ref()).await?;

    Ok(Retrieval {
        index: Arc::new(index),
        embedder,
        k: config.retrieval_k,
    })
}

#[cfg(feature = "fe-local")]
fn embedder(args: &StartArgs) -> Result<Arc<dyn Embedder + Send + Sync>, RagError> {
    use crate::app::embedder::fastembed::{LocalFastEmbedder, DEFAULT_MODEL};

    let model = args.embedding_model.as_deref().unwrap_or(DEFAULT_MODEL);

    Ok(Arc::new(map_err!(LocalFastEmbedder::new(model))))
}

#[cfg(all(feature = "openai", not(feature = "fe-local")))]
fn embedder(args: &StartArgs) -> Result<Arc<dyn Embedder + Send + Sync>, RagError> {
    use crate::app::embedder::openai::{OpenAiEmbeddings, DEFAULT_MODEL};

    let model = args.embedding_model.as_deref().unwrap_or(DEFAULT_MODEL);

    Ok(Arc::new(
        OpenAiEmbeddings::new(&args.open_ai_key(), model).with_endpoint(&args.openai_endpoint()),
    ))
}
