use super::{
    embedder::Embedder,
    generator::Generator,
    log::ChatLog,
    memory::{ConversationMemory, Turn},
    prompt::{extract_reply, PromptAssembler, ASSISTANT_MARKER},
    vector::VectorIndex,
};
use crate::{
    config::{ChatConfig, SamplingParams},
    err,
    error::RagError,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Retrieval settings for the RAG variant of the chat.
#[derive(Clone)]
pub struct Retrieval {
    /// Shared, read only index of document chunks.
    pub index: Arc<VectorIndex>,

    /// The embedder the index was built with.
    pub embedder: Arc<dyn Embedder + Send + Sync>,

    /// Amount of chunks placed into the prompt.
    pub k: usize,
}

impl Retrieval {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, RagError> {
        let results = self
            .index
            .query(query, self.k, self.embedder.as_ref())
            .await?;

        debug!(
            "Retrieved {} chunk(s), distances: {:?}",
            results.len(),
            results.iter().map(|r| r.distance).collect::<Vec<_>>()
        );

        Ok(results.into_iter().map(|r| r.content).collect())
    }
}

/// Everything needed to start a chat session.
pub struct ChatSession {
    pub generator: Arc<dyn Generator + Send + Sync>,

    /// Present for retrieval augmented chats.
    pub retrieval: Option<Retrieval>,

    pub log: Option<Arc<dyn ChatLog + Send + Sync>>,

    /// Where the conversation is persisted after every turn.
    pub state_path: PathBuf,

    pub config: ChatConfig,
}

/// Drives a single conversation, one turn at a time.
///
/// Every turn reads the history window, optionally retrieves context, generates
/// a reply and records both sides of the exchange before persisting. Turns are
/// serialised by `&mut self`; share a session between tasks only behind a lock.
pub struct ChatOrchestrator {
    generator: Arc<dyn Generator + Send + Sync>,
    retrieval: Option<Retrieval>,
    log: Option<Arc<dyn ChatLog + Send + Sync>>,
    assembler: PromptAssembler,
    memory: ConversationMemory,
    state_path: PathBuf,
    window_size: usize,
    sampling: SamplingParams,
    timeout: Duration,

    /// What the front end shows. Starts empty even when memory is restored.
    transcript: Vec<Turn>,
}

impl ChatOrchestrator {
    /// Create the orchestrator and restore the conversation from the session's state path.
    /// A corrupt state file is an error so it does not get overwritten by the next turn.
    pub fn new(session: ChatSession) -> Result<Self, RagError> {
        let ChatSession {
            generator,
            retrieval,
            log,
            state_path,
            config,
        } = session;

        config.validate()?;

        if let Some(ref retrieval) = retrieval {
            if retrieval.k == 0 {
                return err!(InvalidArgument, "retrieval k must be at least 1");
            }
        }

        let mut memory = ConversationMemory::new();
        memory.load(&state_path)?;

        info!(
            "Starting {} chat with '{}', restored {} turn(s) from {}",
            if retrieval.is_some() { "RAG" } else { "basic" },
            generator.id(),
            memory.len(),
            state_path.display()
        );

        Ok(Self {
            generator,
            retrieval,
            log,
            assembler: PromptAssembler::new(config.system_prompt),
            memory,
            state_path,
            window_size: config.window_size,
            sampling: config.sampling,
            timeout: Duration::from_secs(config.generation_timeout_secs),
            transcript: vec![],
        })
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn is_rag(&self) -> bool {
        self.retrieval.is_some()
    }

    /// Answer `user_message` and record the exchange.
    ///
    /// Generation and retrieval failures do not fail the turn. They become the
    /// reply, formatted as `[ERROR] <kind>: <message>`, and are recorded like
    /// any other reply. The returned error is only ever a persistence error,
    /// in which case memory already holds the exchange.
    pub async fn respond(&mut self, user_message: &str) -> Result<String, RagError> {
        let reply = match self.generate_reply(user_message).await {
            Ok(reply) => reply,
            Err(e) => {
                e.print();
                warn!("Turn failed with {}, recording error as reply", e.kind());
                format!("[ERROR] {}: {}", e.kind(), e.error)
            }
        };

        self.memory.add_user(user_message);
        self.memory.add_assistant(&reply);

        self.transcript.push(Turn::user(user_message));
        self.transcript.push(Turn::assistant(reply.as_str()));

        let saved = self.memory.save(&self.state_path);

        self.log(user_message, &reply);

        saved?;

        Ok(reply)
    }

    /// Forget the conversation and persist the empty state right away.
    pub fn clear(&mut self) -> Result<(), RagError> {
        self.memory.clear(&self.state_path)?;
        self.transcript.clear();
        self.log("Memory cleared", "");
        info!("Conversation cleared");
        Ok(())
    }

    async fn generate_reply(&self, user_message: &str) -> Result<String, RagError> {
        let history = self
            .memory
            .window(self.window_size)
            .iter()
            .map(Turn::to_string)
            .collect::<Vec<_>>();

        let context = match self.retrieval {
            Some(ref retrieval) => Some(retrieval.retrieve(user_message).await?),
            None => None,
        };

        let prompt = self
            .assembler
            .build(&history, context.as_deref(), user_message);

        debug!("Prompt ({} chars, {} history turn(s))", prompt.len(), history.len());

        let generated = match tokio::time::timeout(
            self.timeout,
            self.generator.generate(&prompt, &self.sampling),
        )
        .await
        {
            Ok(generated) => generated?,
            Err(_) => {
                return err!(
                    GenerationTimeout,
                    "'{}' did not respond within {}s",
                    self.generator.id(),
                    self.timeout.as_secs()
                )
            }
        };

        Ok(extract_reply(&generated, ASSISTANT_MARKER).to_string())
    }

    fn log(&self, user: &str, assistant: &str) {
        let Some(ref log) = self.log else {
            return;
        };

        if let Err(e) = log.log(user, assistant) {
            warn!("Unable to write turn log: {e}");
        }
    }
}
