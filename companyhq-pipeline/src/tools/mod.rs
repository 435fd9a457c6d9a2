/// Pipeline tools
///
/// - [`tool_trait`]: the `Tool` contract and status codes
/// - [`builtin`]: ingest, clean, analyze, report, send and health check
/// - [`registry`]: name to tool lookup

pub mod builtin;
pub mod registry;
pub mod tool_trait;

pub use builtin::{Analyze, CleanData, GenerateReport, HealthCheck, IngestData, SendPayload};
pub use registry::ToolRegistry;
pub use tool_trait::{
    report, StatusCode, Tool, ToolContext, ToolError, ToolResult, NOT_REGISTERED, SUCCESS,
};
