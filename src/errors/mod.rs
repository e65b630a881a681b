use thiserror::Error;

/// Typed error hierarchy for shellpilot.
///
/// Use at module boundaries (completion calls, command execution, transport sends,
/// config validation). Internal/leaf functions keep using `anyhow::Result`; the
/// `Internal` variant converts through `?`.
#[derive(Debug, Error)]
pub enum ShellpilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("command blocked by security policy")]
    PolicyRefusal { rule: String },

    #[error("command timed out after {seconds} seconds")]
    ExecutionTimeout { seconds: u64 },

    #[error("error executing command: {0}")]
    ExecutionFailure(String),

    #[error("Completion error: {message}")]
    Completion {
        message: String,
        status: Option<u16>,
        retryable: bool,
    },

    #[error("Compaction failed: {0}")]
    CompactionFailure(String),

    #[error("{transport} transport error: {message}")]
    Transport { transport: String, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ShellpilotError {
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            message: message.into(),
            status: None,
            retryable: false,
        }
    }

    pub fn transport(transport: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            transport: transport.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error is transient. Nothing is retried automatically; callers
    /// use this for log levels and operator hints.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Completion { retryable, .. } => *retryable,
            Self::ExecutionTimeout { .. } | Self::Transport { .. } | Self::Internal(_) => true,
            Self::Config(_)
            | Self::PolicyRefusal { .. }
            | Self::ExecutionFailure(_)
            | Self::CompactionFailure(_) => false,
        }
    }
}
