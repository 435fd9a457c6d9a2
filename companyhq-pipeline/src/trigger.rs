/// Trigger dispatcher
///
/// Routes an envelope and runs what it resolved to:
///
/// | Tool | Response key | Status on success / failure |
/// |------|--------------|-----------------------------|
/// | `health_check` | `health_exit` | 200 / 503 |
/// | `full_pipeline` | `pipeline_exit` | 200 / 500 |
/// | any other tool | `tool_exit` | 200 / 500 |
///
/// The HTTP layer and the cron binary both go through [`Dispatcher`].
///
/// Each full-pipeline run works in its own directory under `runs/`; on
/// success its artifacts replace the ones in the working directory.

use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::PipelineConfig;
use crate::router::{route, Envelope, RouteResult, FULL_PIPELINE, HEALTH_CHECK};
use crate::runner::PipelineRunner;
use crate::tools::builtin::{ANALYSIS_FILE, CLEAN_FILE, RAW_FILE, REPORT_FILE};
use crate::tools::{StatusCode, ToolContext, ToolError, ToolRegistry, NOT_REGISTERED, SUCCESS};

/// Subdirectory of the working directory holding in-flight pipeline runs
pub const RUNS_DIR: &str = "runs";

const ARTIFACTS: [&str; 4] = [RAW_FILE, CLEAN_FILE, ANALYSIS_FILE, REPORT_FILE];

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Which kind of run produced an exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Health,
    Pipeline,
    Tool,
}

impl ExitKind {
    /// Response key carrying the exit code
    pub fn key(&self) -> &'static str {
        match self {
            ExitKind::Health => "health_exit",
            ExitKind::Pipeline => "pipeline_exit",
            ExitKind::Tool => "tool_exit",
        }
    }

    fn failure_status(&self) -> u16 {
        match self {
            ExitKind::Health => 503,
            ExitKind::Pipeline | ExitKind::Tool => 500,
        }
    }
}

/// Result of one trigger
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOutcome {
    pub route: RouteResult,
    pub kind: ExitKind,
    pub code: StatusCode,
}

impl TriggerOutcome {
    pub fn succeeded(&self) -> bool {
        self.code == SUCCESS
    }

    /// HTTP status for this outcome
    pub fn http_status(&self) -> u16 {
        if self.succeeded() {
            200
        } else {
            self.kind.failure_status()
        }
    }

    /// `{"route": {...}, "<kind>_exit": code}`
    pub fn to_json(&self) -> JsonValue {
        let mut body = json!({ "route": self.route });
        body[self.kind.key()] = json!(self.code);
        body
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
    pipeline: PipelineRunner,
    tmp_dir: PathBuf,
    publish_lock: Arc<Mutex<()>>,
}

impl Dispatcher {
    /// Dispatcher over the built-in tools
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ToolError> {
        let registry = ToolRegistry::builtin(config)?;
        Self::new(registry, config.tmp_dir.clone())
    }

    /// Dispatcher over `registry`, which must hold the standard steps
    pub fn new(registry: ToolRegistry, tmp_dir: impl Into<PathBuf>) -> Result<Self, ToolError> {
        let pipeline = PipelineRunner::standard(&registry)?;
        Ok(Self {
            registry,
            pipeline,
            tmp_dir: tmp_dir.into(),
            publish_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    fn context(&self, envelope: &Envelope) -> ToolContext {
        ToolContext::new(&self.tmp_dir).with_envelope(envelope.payload.clone(), envelope.options.clone())
    }

    fn run_dir(&self) -> PathBuf {
        let name = format!(
            "{}-{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.9f"),
            std::process::id(),
            RUN_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        self.tmp_dir.join(RUNS_DIR).join(name)
    }

    /// Runs the standard pipeline in a private run directory
    ///
    /// Concurrent runs never read each other's intermediate files. A run
    /// that fails leaves the working directory untouched.
    pub async fn run_pipeline(&self, envelope: &Envelope) -> StatusCode {
        let run_dir = self.run_dir();
        let context =
            ToolContext::new(&run_dir).with_envelope(envelope.payload.clone(), envelope.options.clone());

        let mut code = self.pipeline.run(&context).await;

        if code == SUCCESS {
            if let Err(e) = self.publish(&run_dir).await {
                tracing::error!(error = %e, run_dir = %run_dir.display(), "Failed to publish pipeline artifacts");
                code = ToolError::from(e).status_code();
            }
        }

        match tokio::fs::remove_dir_all(&run_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, run_dir = %run_dir.display(), "Failed to remove run directory"),
        }

        code
    }

    /// Moves a finished run's artifacts into the working directory
    async fn publish(&self, run_dir: &Path) -> std::io::Result<()> {
        let _guard = self.publish_lock.lock().await;

        for file in ARTIFACTS {
            let from = run_dir.join(file);
            if tokio::fs::try_exists(&from).await? {
                tokio::fs::rename(&from, self.tmp_dir.join(file)).await?;
            }
        }

        Ok(())
    }

    /// Runs one registered tool by name
    pub async fn run_tool(&self, name: &str, envelope: &Envelope) -> StatusCode {
        match self.registry.get(name) {
            Some(tool) => tool.run(&self.context(envelope)).await,
            None => {
                tracing::error!(tool = name, "Tool not registered");
                NOT_REGISTERED
            }
        }
    }

    /// Runs the health check tool with an empty envelope
    pub async fn health(&self) -> StatusCode {
        self.run_tool(HEALTH_CHECK, &Envelope::default()).await
    }

    /// Routes `envelope` and runs the resolved tool or pipeline
    pub async fn dispatch(&self, envelope: Envelope) -> TriggerOutcome {
        let route = route(&envelope);

        let (kind, code) = match route.tool.as_str() {
            HEALTH_CHECK => (ExitKind::Health, self.health().await),
            FULL_PIPELINE => (ExitKind::Pipeline, self.run_pipeline(&envelope).await),
            tool => (ExitKind::Tool, self.run_tool(tool, &envelope).await),
        };

        tracing::info!(tool = %route.tool, exit = kind.key(), code, "Trigger finished");

        TriggerOutcome { route, kind, code }
    }
}
