use thiserror::Error;

/// Top-level error type for the Parley agent core.
#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool {tool} failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no data found: {0}")]
    NotFound(String),

    #[error("session store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("classification timed out after {0}ms")]
    ClassificationTimeout(u64),

    #[error("LLM provider error ({provider}): {message}")]
    Llm { provider: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ParleyError {
    /// Short machine-readable label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ParleyError::DuplicateTool(_) => "duplicate_tool",
            ParleyError::UnknownTool(_) => "unknown_tool",
            ParleyError::InvalidArguments { .. } => "invalid_arguments",
            ParleyError::ToolExecution { .. } => "tool_execution",
            ParleyError::NotFound(_) => "not_found",
            ParleyError::StorageUnavailable(_) => "storage_unavailable",
            ParleyError::ClassificationTimeout(_) => "classification_timeout",
            ParleyError::Llm { .. } => "llm",
            ParleyError::Config(_) => "config",
            ParleyError::Other(_) => "other",
        }
    }
}

/// Errors raised by a leaf tool handler.
///
/// The registry translates these into [`ParleyError`] or, for `NotFound`,
/// into a successful "no data" outcome.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}
