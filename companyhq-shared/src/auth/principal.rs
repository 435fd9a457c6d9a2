/// The authenticated identity a request acts as
///
/// A `Principal` is resolved from a session token on every request and
/// handed to the resource controller and AI gateway. It is built from the
/// stored user row, never from anything the client sends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{User, UserRole};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "id")]
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub ai_enabled: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            ai_enabled: user.ai_enabled,
        }
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}
