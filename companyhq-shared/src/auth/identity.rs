/// Session/identity store
///
/// Registers users, checks credentials, issues opaque session tokens and
/// resolves them back to a [`Principal`] on every request.
///
/// All local checks (blank fields, password length, confirmation mismatch)
/// run before anything is written.
///
/// # Example
///
/// ```no_run
/// use companyhq_shared::auth::identity::{IdentityStore, Registration};
/// use companyhq_shared::db::pool::{create_pool, DatabaseConfig};
/// use chrono::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::in_memory()).await?;
/// let identity = IdentityStore::new(pool, Duration::hours(168));
///
/// let principal = identity.register(Registration {
///     username: "ada".into(),
///     email: "ada@example.com".into(),
///     password: "secret1".into(),
///     password_confirm: None,
/// }).await?;
///
/// let session = identity.authenticate("ada", "secret1").await?;
/// let resolved = identity.resolve(&session.token).await?;
/// assert_eq!(resolved.user_id, principal.user_id);
///
/// identity.revoke(&session.token).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::password::{hash_password, validate_password_strength, verify_password, PasswordError};
use super::principal::Principal;
use super::session::{generate_session_token, hash_session_token, validate_token_format};
use crate::models::session::Session;
use crate::models::user::{CreateUser, User, UserRole};
use crate::validation::{required_text, FieldError};

/// Identity store errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Missing or malformed registration field
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Password shorter than the minimum length
    #[error("{0}")]
    WeakSecret(String),

    /// Username or email already registered
    #[error("{0}")]
    DuplicateIdentifier(String),

    /// Unknown identifier or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, unknown or expired session token
    #[error("Authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Optional confirmation, must equal `password` when present
    pub password_confirm: Option<String>,
}

/// A freshly issued session
///
/// `token` is the only copy of the plaintext credential.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub principal: Principal,
}

/// Handle to the identity tables
#[derive(Debug, Clone)]
pub struct IdentityStore {
    pool: SqlitePool,
    session_ttl: Duration,
}

impl IdentityStore {
    pub fn new(pool: SqlitePool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Registers a new user
    ///
    /// The first user ever registered becomes an admin.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank fields or a confirmation mismatch
    /// - `WeakSecret` for passwords under the minimum length
    /// - `DuplicateIdentifier` when the username or email is taken
    pub async fn register(&self, registration: Registration) -> Result<Principal, IdentityError> {
        let (username, email) = validate_registration(&registration)?;

        if User::username_exists(&self.pool, &username).await? {
            return Err(IdentityError::DuplicateIdentifier(
                "Username already exists".to_string(),
            ));
        }
        if User::email_exists(&self.pool, &email).await? {
            return Err(IdentityError::DuplicateIdentifier(
                "Email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&registration.password)?;

        let role = if User::count(&self.pool).await? == 0 {
            UserRole::Admin
        } else {
            UserRole::Member
        };

        let user = User::create(
            &self.pool,
            CreateUser {
                username,
                email,
                password_hash,
                role,
            },
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                IdentityError::DuplicateIdentifier("Username or email already exists".to_string())
            }
            other => IdentityError::Database(other),
        })?;

        info!(user_id = %user.id, role = user.role.as_str(), "User registered");

        Ok(Principal::from(user))
    }

    /// Checks credentials and issues a session
    ///
    /// `identifier` may be the username or the email address.
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<IssuedSession, IdentityError> {
        if identifier.trim().is_empty() || secret.is_empty() {
            return Err(IdentityError::InvalidCredentials);
        }

        let Some(user) = User::find_by_identifier(&self.pool, identifier).await? else {
            debug!("Login attempt for unknown identifier");
            return Err(IdentityError::InvalidCredentials);
        };

        if !verify_password(secret, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        User::update_last_login(&self.pool, user.id).await?;

        self.start_session(&user).await
    }

    /// Issues a session for an already verified user
    ///
    /// Expired sessions of every user are purged first.
    pub async fn start_session(&self, user: &User) -> Result<IssuedSession, IdentityError> {
        let now = Utc::now();
        let purged = Session::delete_expired(&self.pool, now).await?;
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }

        let (token, token_hash) = generate_session_token();
        let expires_at = now + self.session_ttl;

        Session::create(&self.pool, user.id, &token_hash, expires_at).await?;

        info!(user_id = %user.id, "Session started");

        Ok(IssuedSession {
            token,
            expires_at,
            principal: Principal::from(user),
        })
    }

    /// Issues a session for a user by id
    pub async fn start_session_for(&self, user_id: Uuid) -> Result<IssuedSession, IdentityError> {
        let user = User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(IdentityError::Unauthenticated)?;

        self.start_session(&user).await
    }

    /// Resolves a session token to its principal
    ///
    /// The principal reflects the user row as it is now, so role and AI
    /// access changes apply to existing sessions immediately.
    pub async fn resolve(&self, token: &str) -> Result<Principal, IdentityError> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolves a session token as of `now`
    pub async fn resolve_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, IdentityError> {
        if !validate_token_format(token) {
            return Err(IdentityError::Unauthenticated);
        }

        let session = Session::find_active(&self.pool, &hash_session_token(token), now)
            .await?
            .ok_or(IdentityError::Unauthenticated)?;

        let user = User::find_by_id(&self.pool, session.user_id)
            .await?
            .ok_or(IdentityError::Unauthenticated)?;

        Ok(Principal::from(user))
    }

    /// Revokes a session token
    ///
    /// Revoking an unknown token is not an error.
    pub async fn revoke(&self, token: &str) -> Result<(), IdentityError> {
        let removed = Session::delete_by_token_hash(&self.pool, &hash_session_token(token)).await?;
        debug!(removed, "Session revoked");
        Ok(())
    }
}

/// Runs the local registration checks
///
/// Returns the trimmed username and the normalized email.
fn validate_registration(registration: &Registration) -> Result<(String, String), IdentityError> {
    let mut errors = Vec::new();

    let username = required_text("username", Some(registration.username.as_str()))
        .map_err(|e| errors.push(e))
        .ok();

    if let Some(ref username) = username {
        if username.contains('@') {
            errors.push(FieldError::new("username", "username must not contain @"));
        }
    }

    let email = required_text("email", Some(registration.email.as_str()))
        .map(|email| email.to_lowercase())
        .map_err(|e| errors.push(e))
        .ok();

    if let Some(ref email) = email {
        if !email.contains('@') {
            errors.push(FieldError::new("email", "email must be a valid address"));
        }
    }

    if registration.password.is_empty() {
        errors.push(FieldError::new("password", "password is required"));
    }

    if let Some(ref confirm) = registration.password_confirm {
        if confirm != &registration.password {
            errors.push(FieldError::new("passwordConfirm", "Passwords do not match"));
        }
    }

    if !errors.is_empty() {
        return Err(IdentityError::Validation(errors));
    }

    validate_password_strength(&registration.password).map_err(IdentityError::WeakSecret)?;

    match (username, email) {
        (Some(username), Some(email)) => Ok((username, email)),
        _ => Err(IdentityError::Validation(Vec::new())),
    }
}
