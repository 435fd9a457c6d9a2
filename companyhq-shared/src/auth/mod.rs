/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and length policy
/// - [`session`]: Opaque session tokens and the session cookie
/// - [`identity`]: Register, authenticate, resolve and revoke
/// - [`principal`]: The resolved identity a request acts as
/// - [`authorization`]: Ownership-scoped access checks
///
/// # Example
///
/// ```
/// use companyhq_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod identity;
pub mod password;
pub mod principal;
pub mod session;
