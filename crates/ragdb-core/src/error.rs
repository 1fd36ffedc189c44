use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding provider '{provider}' failed: {message}")]
    Embedding { provider: String, message: String },

    #[error("Dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    #[error("Document produced no chunks: {0}")]
    EmptyDocument(String),

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("{stage} search failed: {source}")]
    SearchFailed {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.into(), message: message.into() }
    }

    /// Wraps a sub-search failure with the name of the side that produced it.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::SearchFailed { stage, source: Box::new(self) }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
