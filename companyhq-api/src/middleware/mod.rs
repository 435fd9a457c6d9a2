/// Middleware for the API server
///
/// - `security`: security response headers
/// - `session`: resolves the session cookie or bearer token to a principal

pub mod security;
pub mod session;
