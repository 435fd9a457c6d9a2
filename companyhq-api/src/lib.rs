//! # Company HQ API Server Library
//!
//! HTTP surface for Company HQ: accounts and sessions, tasks, notes and
//! calendar events, the AI assistant, and the pipeline trigger.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Session resolution and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
