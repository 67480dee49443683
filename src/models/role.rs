use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{Permission, PermissionGroup, PermissionSet};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    System,
    Custom,
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::System => "SYSTEM",
            RoleType::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM" => Ok(RoleType::System),
            "CUSTOM" => Ok(RoleType::Custom),
            other => Err(AppError::validation(format!("unknown role type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: Uuid,
    /// `None` for global system roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permissions: PermissionSet,
    pub role_type: RoleType,
}

impl Role {
    /// Build a role from its stored row form. The permission list is parsed
    /// here, once, and leniently.
    pub fn from_stored(
        id: Uuid,
        tenant_id: Option<String>,
        name: &str,
        description: Option<String>,
        stored_permissions: Option<&str>,
        role_type: RoleType,
    ) -> Self {
        Role {
            id,
            tenant_id,
            name: name.to_string(),
            description,
            permissions: PermissionSet::from_stored(name, stored_permissions),
            role_type,
        }
    }

    /// Define a new role. Every permission name must belong to the vocabulary.
    pub fn define<I, S>(
        tenant_id: Option<String>,
        name: &str,
        description: Option<String>,
        permission_names: I,
        role_type: RoleType,
    ) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("role name must not be empty"));
        }

        Ok(Role {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            description,
            permissions: PermissionSet::parse_strict(permission_names)?,
            role_type,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionGrant {
    pub permission: Permission,
    pub group: PermissionGroup,
}

/// A user's resolved roles and the union of their permissions.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EffectivePermissions {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub permissions: Vec<PermissionGrant>,
}

impl EffectivePermissions {
    pub fn new(user_id: Uuid, email: impl Into<String>, roles: Vec<String>, permissions: &PermissionSet) -> Self {
        Self {
            user_id,
            email: email.into(),
            roles,
            permissions: permissions
                .iter()
                .map(|permission| PermissionGrant {
                    permission,
                    group: permission.group(),
                })
                .collect(),
        }
    }
}
