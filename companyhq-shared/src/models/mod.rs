/// Database models for Company HQ
///
/// Each model owns the SQL for its table.
///
/// # Models
///
/// - `user`: User accounts, roles and AI access flag
/// - `session`: Server-side session records
/// - `task`: Team tasks with optional assignee
/// - `note`: Notes, optionally shared with everyone
/// - `event`: Private calendar events
/// - `ai_request`: Append-only AI request log
///
/// Tasks, notes and events implement [`crate::resource::Resource`] and are
/// normally accessed through the generic controller rather than directly.

pub mod ai_request;
pub mod event;
pub mod note;
pub mod session;
pub mod task;
pub mod user;
