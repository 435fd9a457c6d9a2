/// Ownership-scoped authorization checks
///
/// Company HQ has no fine-grained permission system. Every resource has an
/// owner, and two exceptions widen access:
///
/// | Access | Granted to |
/// |--------|------------|
/// | View   | owner, assignee (tasks), everyone when shared (notes) |
/// | Update | owner, assignee (tasks) |
/// | Delete | owner only |
///
/// Admins get no extra rights over other users' resources. Their only
/// privilege is managing other users' AI access.
///
/// # Example
///
/// ```
/// use companyhq_shared::auth::authorization::{is_permitted, Access, Ownership};
/// # use companyhq_shared::auth::principal::Principal;
/// # use companyhq_shared::models::user::UserRole;
/// # use uuid::Uuid;
/// # let principal = Principal {
/// #     user_id: Uuid::new_v4(),
/// #     username: "bob".into(),
/// #     email: "bob@example.com".into(),
/// #     role: UserRole::Member,
/// #     ai_enabled: true,
/// # };
///
/// let note = Ownership::owned_by(Uuid::new_v4()).shared(true);
/// assert!(is_permitted(&principal, &note, Access::View));
/// assert!(!is_permitted(&principal, &note, Access::Delete));
/// ```

use uuid::Uuid;

use super::principal::Principal;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Principal may not perform this access on the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Kind of access being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    View,
    Update,
    Delete,
}

/// Ownership facts about a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// Creator of the resource
    pub owner_id: Uuid,

    /// Secondary principal with view and update rights (tasks)
    pub assignee_id: Option<Uuid>,

    /// Visible to every principal (notes)
    pub shared: bool,
}

impl Ownership {
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            assignee_id: None,
            shared: false,
        }
    }

    pub fn assigned_to(mut self, assignee_id: Option<Uuid>) -> Self {
        self.assignee_id = assignee_id;
        self
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    fn is_owner(&self, principal: &Principal) -> bool {
        self.owner_id == principal.user_id
    }

    fn is_assignee(&self, principal: &Principal) -> bool {
        self.assignee_id == Some(principal.user_id)
    }
}

/// Decides whether `principal` may perform `access` on a resource
pub fn is_permitted(principal: &Principal, ownership: &Ownership, access: Access) -> bool {
    match access {
        Access::View => {
            ownership.is_owner(principal) || ownership.is_assignee(principal) || ownership.shared
        }
        Access::Update => ownership.is_owner(principal) || ownership.is_assignee(principal),
        Access::Delete => ownership.is_owner(principal),
    }
}

/// Like [`is_permitted`] but returns an error on denial
pub fn require(principal: &Principal, ownership: &Ownership, access: Access) -> Result<(), AuthzError> {
    if is_permitted(principal, ownership, access) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Requires the principal to be `target_user_id` or an admin
///
/// Used for per-user settings such as the AI access toggle.
pub fn require_self_or_admin(principal: &Principal, target_user_id: Uuid) -> Result<(), AuthzError> {
    if principal.user_id == target_user_id || principal.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}
