use std::error::Error as _;
use thiserror::Error;
use tracing::error;
use validify::ValidationErrors;

#[derive(Debug, Error)]
pub enum RagErr {
    #[error("invalid argument; {0}")]
    InvalidArgument(String),

    #[error("embedding; {0}")]
    Embedding(String),

    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("IO; {0}")]
    IO(#[from] std::io::Error),

    #[error("corrupt state; {0}")]
    CorruptState(String),

    #[error("generation; {0}")]
    Generation(String),

    #[error("generation timed out; {0}")]
    GenerationTimeout(String),

    #[error("JSON error; {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("parse configuration; {0}")]
    ParseConfig(String),

    #[error("validation; {0}")]
    Validation(#[from] ValidationErrors),

    #[cfg(any(feature = "openai", feature = "tgi"))]
    #[error("http client; {0}")]
    Reqwest(#[from] reqwest::Error),
}

#[cfg(any(feature = "fe-local", feature = "openai"))]
impl From<ragchat_embedders::error::EmbeddingError> for RagErr {
    fn from(e: ragchat_embedders::error::EmbeddingError) -> Self {
        Self::Embedding(e.to_string())
    }
}

impl RagErr {
    /// Stable name of the error category, used when an error is shown to the user.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::Embedding(_) => "EmbeddingError",
            Self::EmptyCorpus => "EmptyCorpus",
            Self::IO(_) => "IOError",
            Self::CorruptState(_) => "CorruptState",
            Self::Generation(_) => "GenerationError",
            Self::GenerationTimeout(_) => "GenerationTimeout",
            Self::SerdeJson(_) => "SerdeJson",
            Self::ParseConfig(_) => "ParseConfig",
            Self::Validation(_) => "Validation",
            #[cfg(any(feature = "openai", feature = "tgi"))]
            Self::Reqwest(_) => "GenerationError",
        }
    }
}

#[derive(Debug, Error)]
#[error("{error}")]
pub struct RagError {
    file: &'static str,
    line: u32,
    column: u32,
    pub error: RagErr,
}

impl RagError {
    pub fn new(file: &'static str, line: u32, column: u32, error: RagErr) -> RagError {
        RagError {
            file,
            line,
            column,
            error,
        }
    }

    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }

    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }

    pub fn print(&self) {
        let location = self.location();

        error!("{location} | {self}");

        if self.error.source().is_some() {
            error!("Causes:");
        }

        let mut src = self.error.source();
        while let Some(source) = src {
            error!(" - {source}");
            src = source.source();
        }
    }
}

#[macro_export]
macro_rules! err {
    ($ty:ident $(, $l:literal $(,)? $($args:expr),* )?) => {
        Err($crate::error::RagError::new(
            file!(),
            line!(),
            column!(),
            $crate::error::RagErr::$ty $( (format!($l, $( $args, )*)) )?,
        ))
    };
}

#[macro_export]
macro_rules! map_err {
    ($ex:expr) => {
        $ex.map_err(|e| $crate::error::RagError::new(file!(), line!(), column!(), e.into()))?
    };
}
