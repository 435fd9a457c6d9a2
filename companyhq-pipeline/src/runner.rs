/// Pipeline runner
///
/// Runs tools in order and stops at the first non-zero status, which
/// becomes the result of the whole run.
///
/// # Example
///
/// ```no_run
/// use companyhq_pipeline::config::PipelineConfig;
/// use companyhq_pipeline::runner::PipelineRunner;
/// use companyhq_pipeline::tools::{ToolContext, ToolRegistry};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = PipelineConfig::default();
/// let registry = ToolRegistry::builtin(&config)?;
/// let runner = PipelineRunner::standard(&registry)?;
///
/// let code = runner.run(&ToolContext::new(&config.tmp_dir)).await;
/// std::process::exit(code);
/// # }
/// ```

use std::sync::Arc;
use std::time::Instant;

use crate::tools::{StatusCode, Tool, ToolContext, ToolError, ToolRegistry, SUCCESS};

/// Steps of the standard pipeline, in order
pub const STANDARD_STEPS: [&str; 5] = [
    "ingest_data",
    "clean_data",
    "analyze",
    "generate_report",
    "send_payload",
];

#[derive(Clone)]
pub struct PipelineRunner {
    steps: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("steps", &self.step_names())
            .finish()
    }
}

impl PipelineRunner {
    pub fn new(steps: Vec<Arc<dyn Tool>>) -> Self {
        Self { steps }
    }

    /// The standard ingest → clean → analyze → report → send pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if a standard step isn't registered
    pub fn standard(registry: &ToolRegistry) -> Result<Self, ToolError> {
        let steps = STANDARD_STEPS
            .iter()
            .map(|name| {
                registry
                    .get(name)
                    .ok_or_else(|| ToolError::ExecutionFailed(format!("Tool not registered: {}", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(steps))
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step in order, stopping at the first failure
    pub async fn run(&self, context: &ToolContext) -> StatusCode {
        let started = Instant::now();

        for step in &self.steps {
            let code = step.run(context).await;
            if code != SUCCESS {
                tracing::warn!(
                    step = step.name(),
                    code,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline stopped"
                );
                return code;
            }
        }

        tracing::info!(
            steps = self.steps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline completed"
        );
        SUCCESS
    }
}
