/// Session token and cookie utilities
///
/// Session tokens are opaque: 48 random base62 characters with no embedded
/// claims. Only the SHA-256 digest of a token is stored server-side.
///
/// # Example
///
/// ```
/// use companyhq_shared::auth::session::{
///     generate_session_token, hash_session_token, SessionCookie,
/// };
///
/// let (token, hash) = generate_session_token();
/// assert_eq!(token.len(), 48);
/// assert_eq!(hash, hash_session_token(&token));
///
/// let cookie = SessionCookie::new("hq_session", 3600, false);
/// let header = cookie.build(&token);
/// assert!(header.contains("HttpOnly"));
/// assert_eq!(cookie.extract(&header).as_deref(), Some(token.as_str()));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a session token (characters)
pub const SESSION_TOKEN_LENGTH: usize = 48;

/// Default cookie name for the session token
pub const DEFAULT_COOKIE_NAME: &str = "hq_session";

/// Generates a new session token
///
/// Returns a tuple of (plaintext_token, sha256_hash). The plaintext goes to
/// the client, the hash goes to the database.
pub fn generate_session_token() -> (String, String) {
    let token = generate_random_string(SESSION_TOKEN_LENGTH);
    let hash = hash_session_token(&token);
    (token, hash)
}

/// Generates a random base62 string
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a session token with SHA-256 (hex, 64 characters)
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Checks that a token has the shape of one we issued
///
/// Used to reject junk before touching the database.
pub fn validate_token_format(token: &str) -> bool {
    token.len() == SESSION_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Session cookie settings
///
/// The cookie is always `HttpOnly; SameSite=Lax; Path=/`. `Secure` is added
/// when serving over HTTPS in production.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub max_age_seconds: i64,
    pub secure: bool,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, max_age_seconds: i64, secure: bool) -> Self {
        Self {
            name: name.into(),
            max_age_seconds,
            secure,
        }
    }

    /// Builds the `Set-Cookie` value carrying `token`
    pub fn build(&self, token: &str) -> String {
        self.build_with_max_age(token, self.max_age_seconds)
    }

    /// Builds a `Set-Cookie` value that makes the browser drop the cookie
    pub fn clear(&self) -> String {
        self.build_with_max_age("", 0)
    }

    fn build_with_max_age(&self, value: &str, max_age: i64) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, value),
            "Path=/".to_string(),
            "HttpOnly".to_string(),
        ];

        if self.secure {
            parts.push("Secure".to_string());
        }

        parts.push("SameSite=Lax".to_string());
        parts.push(format!("Max-Age={}", max_age));

        parts.join("; ")
    }

    /// Finds this cookie's value in a `Cookie` request header
    ///
    /// Returns None when the cookie is absent or empty.
    pub fn extract(&self, cookie_header: &str) -> Option<String> {
        for cookie in cookie_header.split(';') {
            let parts: Vec<&str> = cookie.trim().splitn(2, '=').collect();
            if parts.len() == 2 && parts[0] == self.name && !parts[1].is_empty() {
                return Some(parts[1].to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_token() {
        let (token, hash) = generate_session_token();

        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);
        assert!(validate_token_format(&token));
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_session_token(&token));
    }

    #[test]
    fn test_tokens_are_unique() {
        let (a, _) = generate_session_token();
        let (b, _) = generate_session_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_token_format_rejects_junk() {
        assert!(!validate_token_format(""));
        assert!(!validate_token_format("short"));
        assert!(!validate_token_format(&"!".repeat(SESSION_TOKEN_LENGTH)));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic abc123"), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = SessionCookie::new("hq_session", 604800, false);
        let header = cookie.build("tok");

        assert!(header.starts_with("hq_session=tok"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Max-Age=604800"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn test_secure_cookie() {
        let cookie = SessionCookie::new("hq_session", 60, true);
        assert!(cookie.build("tok").contains("Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let cookie = SessionCookie::new("hq_session", 60, false);
        let header = cookie.clear();

        assert!(header.starts_with("hq_session=;"));
        assert!(header.contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_cookie() {
        let cookie = SessionCookie::new("hq_session", 60, false);

        assert_eq!(
            cookie.extract("theme=dark; hq_session=abc; lang=en").as_deref(),
            Some("abc")
        );
        assert_eq!(cookie.extract("theme=dark"), None);
        assert_eq!(cookie.extract("hq_session="), None);
        assert_eq!(cookie.extract("hq_session_old=abc"), None);
    }
}
