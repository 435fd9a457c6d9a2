/// Tool registry
///
/// Maps tool names to implementations. [`ToolRegistry::builtin`] registers
/// the standard tools; tests and embedders can replace any of them with
/// [`ToolRegistry::register`].

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::builtin::{Analyze, CleanData, GenerateReport, HealthCheck, IngestData, SendPayload};
use super::tool_trait::{Tool, ToolError};
use crate::config::PipelineConfig;

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in tool
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn builtin(config: &PipelineConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create HTTP client: {}", e)))?;

        let mut registry = Self::new();
        registry.register(Arc::new(IngestData::new(config.data_source.clone(), client.clone())));
        registry.register(Arc::new(CleanData));
        registry.register(Arc::new(Analyze));
        registry.register(Arc::new(GenerateReport));
        registry.register(Arc::new(SendPayload::new(config.delivery_url.clone(), client)));
        registry.register(Arc::new(HealthCheck::new(config.data_source.clone())));
        Ok(registry)
    }

    /// Registers a tool under its own name, replacing any previous one
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}
