//! # Company HQ Pipeline
//!
//! Routing and execution of the data pipeline behind the `/trigger`
//! endpoint and the cron binary.
//!
//! ## Modules
//!
//! - `tools`: the `Tool` trait, built-in tools and the registry
//! - `router`: resolves an action envelope to a tool name
//! - `runner`: fail-fast sequential execution of pipeline steps
//! - `trigger`: route-then-run dispatch with per-kind exit keys
//! - `config`: working directory and data source settings
//!
//! ## Example
//!
//! ```no_run
//! use companyhq_pipeline::config::PipelineConfig;
//! use companyhq_pipeline::router::Envelope;
//! use companyhq_pipeline::trigger::Dispatcher;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let dispatcher = Dispatcher::from_config(&PipelineConfig::from_env()?)?;
//! let outcome = dispatcher.dispatch(Envelope::for_action("health_check")).await;
//! println!("{}", outcome.to_json());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod router;
pub mod runner;
pub mod tools;
pub mod trigger;
