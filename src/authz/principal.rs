use uuid::Uuid;

use crate::models::role::Role;
use crate::models::user::User;

/// Principal represents the acting user together with their resolved roles
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal::new(user.id, user.email.clone()).with_roles(user.roles.iter().cloned())
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Principal::new(user.id, user.email).with_roles(user.roles)
    }
}
