/// Core Tool trait and types
///
/// A tool is one named pipeline step. It receives a [`ToolContext`] and
/// reports an integer status code: `0` is success, anything else is a
/// failure the runner stops on.
///
/// # Status Codes
///
/// | Code | Meaning |
/// |------|---------|
/// | 0 | success |
/// | 1 | execution failed |
/// | 2 | required input missing |
/// | 3 | input malformed |
/// | 4 | filesystem error |
/// | 5 | upstream (HTTP) error |
/// | 127 | tool not registered |
///
/// # Example
///
/// ```no_run
/// use companyhq_pipeline::tools::{Tool, ToolContext, StatusCode};
/// use async_trait::async_trait;
///
/// struct Noop;
///
/// #[async_trait]
/// impl Tool for Noop {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     async fn run(&self, _context: &ToolContext) -> StatusCode {
///         0
///     }
/// }
/// ```

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};

/// Integer exit status of a tool
pub type StatusCode = i32;

/// Status returned on success
pub const SUCCESS: StatusCode = 0;

/// Status returned when a tool name has no registered implementation
pub const NOT_REGISTERED: StatusCode = 127;

/// Tool error types
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Malformed input: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl ToolError {
    /// Status code reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ToolError::ExecutionFailed(_) => 1,
            ToolError::MissingInput(_) => 2,
            ToolError::InvalidData(_) => 3,
            ToolError::Io(_) => 4,
            ToolError::Upstream(_) => 5,
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::InvalidData(err.to_string())
    }
}

/// Tool result type alias
pub type ToolResult<T> = Result<T, ToolError>;

/// Tool execution context
///
/// Carries the working directory plus the `payload` and `options` of the
/// envelope that triggered the run.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub tmp_dir: PathBuf,
    pub payload: Map<String, JsonValue>,
    pub options: Map<String, JsonValue>,
}

impl ToolContext {
    pub fn new(tmp_dir: impl Into<PathBuf>) -> Self {
        ToolContext {
            tmp_dir: tmp_dir.into(),
            payload: Map::new(),
            options: Map::new(),
        }
    }

    pub fn with_envelope(
        mut self,
        payload: Map<String, JsonValue>,
        options: Map<String, JsonValue>,
    ) -> Self {
        self.payload = payload;
        self.options = options;
        self
    }

    /// Path of a file inside the working directory
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.tmp_dir.join(file_name)
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }
}

/// Core Tool trait
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name, e.g. `ingest_data`
    fn name(&self) -> &str;

    /// Runs the tool once and returns its status code
    async fn run(&self, context: &ToolContext) -> StatusCode;
}

/// Converts a fallible step body into a status code, logging failures
pub fn report(tool: &str, result: ToolResult<()>) -> StatusCode {
    match result {
        Ok(()) => {
            tracing::debug!(tool, "Tool finished");
            SUCCESS
        }
        Err(e) => {
            let code = e.status_code();
            tracing::warn!(tool, code, error = %e, "Tool failed");
            code
        }
    }
}
