use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid filter graph: {0}")]
    InvalidGraph(String),

    #[error("Failed to launch engine: {0}")]
    EngineLaunch(String),

    #[error("Engine failed{}: {message}", .code.map(|c| format!(" with rc={}", c)).unwrap_or_default())]
    EngineExecution { code: Option<i32>, message: String },

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EditError {
    /// Stable, caller-facing error code.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::InvalidParameter(_) => "INVALID_PARAMETER",
            EditError::InvalidGraph(_) => "INVALID_GRAPH",
            EditError::EngineLaunch(_) => "ENGINE_LAUNCH_ERROR",
            EditError::EngineExecution { .. } => "ENGINE_ERROR",
            EditError::Probe(_) | EditError::Json(_) => "PROBE_ERROR",
            EditError::Config(_) | EditError::Toml(_) => "CONFIG_ERROR",
            EditError::Io(_) => "IO_ERROR",
        }
    }

    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        EditError::InvalidParameter(msg.into())
    }

    pub(crate) fn invalid_graph(msg: impl Into<String>) -> Self {
        EditError::InvalidGraph(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
