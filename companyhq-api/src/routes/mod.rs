/// API route handlers
///
/// - `health`: health check
/// - `trigger`: cron/webhook pipeline trigger
/// - `auth`: register, login, logout, current user
/// - `users`: user directory and AI access toggle
/// - `resources`: tasks, notes and events
/// - `ai`: AI assistant query, quota and query routing

pub mod ai;
pub mod auth;
pub mod health;
pub mod resources;
pub mod trigger;
pub mod users;
