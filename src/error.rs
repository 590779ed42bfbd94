//! Error types for the transformation crew pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Whether a generation-service failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Throttling or quota exhaustion; retried with backoff
    Transient,
    /// Malformed request, auth failure, unexpected payload
    Permanent,
}

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Generation service error ({kind:?}): {message}")]
    Service {
        kind: ServiceErrorKind,
        message: String,
    },

    #[error("No structured document could be recovered from {agent} output")]
    RecoveryExhausted { agent: String },

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Stage '{stage}' is missing required input '{dependency}'")]
    MissingDependency {
        stage: &'static str,
        dependency: &'static str,
    },

    #[error("Pipeline exceeded its {0}s deadline")]
    DeadlineExceeded(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report store error: {0}")]
    Store(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Service {
            kind: ServiceErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Service {
            kind: ServiceErrorKind::Permanent,
            message: message.into(),
        }
    }

    /// Attach the name of the pipeline stage that produced this error
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage wrappers
    pub fn root(&self) -> &PipelineError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the caller should retry later ("service unavailable")
    /// rather than treat the failure as an internal defect.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            Self::Service {
                kind: ServiceErrorKind::Transient,
                ..
            } | Self::DeadlineExceeded(_)
        )
    }
}
