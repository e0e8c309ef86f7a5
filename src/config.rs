use crate::{err, error::RagError, map_err};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validify::{schema_err, schema_validation, Validate, ValidationErrors};

/// The instruction placed at the top of every prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
/// Default chunk length, in characters, used when indexing documents.
pub const DEFAULT_CHUNK_SIZE: usize = 80;
/// Default amount of turns (user and assistant counted separately) fed back as history.
pub const DEFAULT_WINDOW_SIZE: usize = 6;
/// Default amount of retrieved chunks per question.
pub const DEFAULT_RETRIEVAL_K: usize = 1;
/// Default deadline for a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
/// Default name of the conversation state file within the state directory.
pub const DEFAULT_STATE_FILE: &str = "conversation_state.json";
/// Default name of the turn log file within the log directory.
pub const DEFAULT_LOG_FILE: &str = "chat_logs.jsonl";

const DEFAULT_CONFIG_PATH: &str = "ragchat.json";
const DEFAULT_STATE_DIR: &str = "state";
const DEFAULT_LOG_DIR: &str = "logs";
#[cfg(feature = "tgi")]
const DEFAULT_TGI_URL: &str = "http://localhost:8080";

#[derive(Debug, Parser)]
#[command(name = "ragchat", version = "0.1", about = "Chat with a language model, optionally grounded in your documents", long_about = None)]
pub struct StartArgs {
    /// Path to the JSON chat configuration.
    #[arg(short, long)]
    config_path: Option<String>,

    /// RUST_LOG string to use as the env filter.
    #[arg(short, long)]
    log: Option<String>,

    /// Directory the conversation state is saved to.
    #[arg(short, long)]
    state_dir: Option<String>,

    /// Directory the turn log is appended to.
    #[arg(long)]
    log_dir: Option<String>,

    /// Generation backend to use.
    #[arg(short, long, value_enum, default_value_t = Backend::Tgi)]
    pub backend: Backend,

    /// Model name passed to the generation backend.
    #[arg(short, long)]
    model: Option<String>,

    /// Answer using documents retrieved from the corpus.
    #[arg(short, long)]
    pub rag: bool,

    /// Directory of `.jsonl` records with a `text` field. Uses the built-in
    /// documents when not set.
    #[arg(long)]
    pub corpus_dir: Option<PathBuf>,

    /// Embedding model used for retrieval.
    #[arg(short, long)]
    pub embedding_model: Option<String>,

    /// URL of the text generation server when using the `tgi` backend.
    #[cfg(feature = "tgi")]
    #[arg(short, long)]
    tgi_url: Option<String>,

    /// Endpoint of an OpenAI compatible API.
    #[cfg(feature = "openai")]
    #[arg(long)]
    openai_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Self-hosted text generation server.
    Tgi,
    /// OpenAI chat completions.
    Openai,
}

/// Implement a getter method on [StartArgs], using the `$var` environment variable as a fallback
/// and either panic or default if neither the argument nor the environment variable is set.
macro_rules! arg {
    ($id:ident, $var:literal, panic $msg:literal) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => panic!($msg),
                    },
                }
            }
        }
    };
    ($id:ident, $var:literal, default $value:expr) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => $value,
                    },
                }
            }
        }
    };
}

impl StartArgs {
    #[cfg(feature = "openai")]
    pub fn open_ai_key(&self) -> String {
        std::env::var("OPENAI_KEY").expect("Missing OPENAI_KEY in env")
    }
}

arg!(config_path,     "RAGCHAT_CONFIG",  default DEFAULT_CONFIG_PATH.to_string());
arg!(log,             "RUST_LOG",        default "info".to_string());
arg!(state_dir,       "STATE_DIR",       default DEFAULT_STATE_DIR.to_string());
arg!(log_dir,         "LOG_DIR",         default DEFAULT_LOG_DIR.to_string());
arg!(model,           "MODEL",           panic   "Model not found; Pass --model or set MODEL");

#[cfg(feature = "tgi")]
arg!(tgi_url,         "TGI_URL",         default DEFAULT_TGI_URL.to_string());

#[cfg(feature = "openai")]
arg!(openai_endpoint, "OPENAI_ENDPOINT", default ragchat_embedders::openai::DEFAULT_OPENAI_ENDPOINT.to_string());

/// Chat session settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Instruction placed at the top of every prompt.
    pub system_prompt: String,

    /// Chunk length in characters for indexed documents.
    pub chunk_size: usize,

    /// Amount of most recent turns used as history.
    pub window_size: usize,

    /// Amount of chunks retrieved per question.
    pub retrieval_k: usize,

    /// Deadline for a single generation call.
    pub generation_timeout_secs: u64,

    /// File name of the conversation state within the state directory.
    pub state_file: String,

    /// File name of the turn log within the log directory.
    pub log_file: String,

    pub sampling: SamplingParams,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            retrieval_k: DEFAULT_RETRIEVAL_K,
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            state_file: DEFAULT_STATE_FILE.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            sampling: SamplingParams::default(),
        }
    }
}

impl ChatConfig {
    /// Read the configuration at `path`. A missing file yields the defaults.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let config = map_err!(std::fs::read_to_string(path));

        let config: Self = match serde_json::from_str(&config) {
            Ok(config) => config,
            Err(e) => return err!(ParseConfig, "{}: {}", path.display(), e),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return err!(InvalidArgument, "chunk_size must be at least 1");
        }

        if self.retrieval_k == 0 {
            return err!(InvalidArgument, "retrieval_k must be at least 1");
        }

        if self.generation_timeout_secs == 0 {
            return err!(InvalidArgument, "generation_timeout_secs must be at least 1");
        }

        map_err!(self.sampling.validate());

        Ok(())
    }
}

/// Parameters forwarded to the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(Self::validate_schema)]
pub struct SamplingParams {
    /// Caps the amount of generated tokens.
    #[validate(range(min = 1.))]
    pub max_new_tokens: usize,

    /// Lower is more deterministic. Must be positive.
    pub temperature: f64,

    /// Sample only from the `top_k` most probable tokens. 0 disables.
    pub top_k: usize,

    /// Sample only from the smallest token set whose cumulative probability reaches `top_p`.
    pub top_p: f64,

    /// Penalty applied to already generated tokens. 1 means no penalty.
    #[validate(range(min = 1.))]
    pub repetition_penalty: f64,

    /// Sample from the distribution instead of decoding greedily.
    pub do_sample: bool,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 0.8,
            top_k: 25,
            top_p: 0.95,
            repetition_penalty: 1.1,
            do_sample: true,
        }
    }
}

impl SamplingParams {
    #[schema_validation]
    fn validate_schema(&self) -> Result<(), ValidationErrors> {
        if self.temperature <= 0. {
            schema_err!("temperature", "temperature must be positive");
        }
        if self.top_p <= 0. || self.top_p > 1. {
            schema_err!("top_p", "top_p must be in (0, 1]");
        }
    }
}
