//! # Company HQ Pipeline
//!
//! Cron entry point: routes one action, runs it, prints the JSON outcome
//! and exits with the resulting status code.
//!
//! ## Usage
//!
//! ```bash
//! companyhq-pipeline                 # full_pipeline
//! companyhq-pipeline health_check
//! companyhq-pipeline analyze
//! ```

use companyhq_pipeline::config::PipelineConfig;
use companyhq_pipeline::router::Envelope;
use companyhq_pipeline::trigger::Dispatcher;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "companyhq_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let envelope = match std::env::args().nth(1) {
        Some(action) => Envelope::for_action(action),
        None => Envelope::default(),
    };

    let config = PipelineConfig::from_env()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        tmp_dir = %config.tmp_dir.display(),
        data_source = config.data_source.kind(),
        "Company HQ pipeline starting"
    );

    let dispatcher = Dispatcher::from_config(&config)?;
    let outcome = dispatcher.dispatch(envelope).await;

    println!("{}", outcome.to_json());
    std::process::exit(outcome.code);
}
