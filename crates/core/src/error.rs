use thiserror::Error;

/// All errors the orchestration core can return, tagged with the stable
/// `E_*` code prefixes every caller can match on regardless of the
/// underlying cause.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("tool denied: {0}")]
    ToolDenied(String),

    #[error("module error: {0}")]
    Module(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("fanout exceeded: requested {requested}, max {max}")]
    FanoutExceeded { requested: usize, max: usize },

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// The stable `E_*` prefix for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "E_CONFIG",
            EngineError::Provider(_) => "E_PROVIDER",
            EngineError::ToolUnavailable(_) => "E_TOOL_UNAVAILABLE",
            EngineError::ToolDenied(_) => "E_TOOL_DENIED",
            EngineError::Module(_) => "E_MODULE_INVALID",
            EngineError::ResourceExhausted(_) => "E_RESOURCE_EXHAUSTED",
            EngineError::FanoutExceeded { .. } => "E_RESOURCE_FANOUT",
            EngineError::Aborted(_) => "E_ABORT",
            EngineError::Internal(_) => "E_INTERNAL",
            EngineError::Io(_) => "E_INTERNAL",
            EngineError::Json(_) => "E_INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
