// ⚠️ Error taxonomy for ingestion and aggregation
//
// Validation errors are raised before any write. Producer errors come from
// upstream collaborators. Consistency errors mean two identities were seen for
// one natural key and nothing was picked.

use thiserror::Error;

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// A raw record violated an invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{context}] {field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    pub fn new(context: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

// ============================================================================
// PRODUCER ERROR
// ============================================================================

/// Upstream failed to supply a matchday batch
#[derive(Debug, Error)]
#[error("{source_name}: {message}")]
pub struct ProducerError {
    pub source_name: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProducerError {
    pub fn new(source_name: &str, message: impl Into<String>) -> Self {
        ProducerError {
            source_name: source_name.to_string(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying I/O or parse failure
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }
}

// ============================================================================
// LEAGUE ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("producer failed: {0}")]
    Producer(#[from] ProducerError),

    #[error("consistency violation for {entity} '{key}': {detail}")]
    Consistency {
        entity: &'static str,
        key: String,
        detail: String,
    },

    #[error("invalid configuration {key}='{value}': {message}")]
    Config {
        key: &'static str,
        value: String,
        message: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl LeagueError {
    pub fn is_validation(&self) -> bool {
        matches!(self, LeagueError::Validation(_))
    }

    pub fn is_producer(&self) -> bool {
        matches!(self, LeagueError::Producer(_))
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, LeagueError::Consistency { .. })
    }

    /// The validation failure, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            LeagueError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for LeagueError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        LeagueError::LockPoisoned
    }
}

pub type Result<T> = std::result::Result<T, LeagueError>;
