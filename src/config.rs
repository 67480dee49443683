use crate::authz::roles;
use crate::errors::AppError;

/// Runtime settings for the approval service, read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Role whose holders receive approval notifications.
    pub approver_role: String,
    /// Tenant used when a request carries neither header nor subdomain.
    pub default_tenant: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            approver_role: roles::COMPANY_ADMIN.to_string(),
            default_tenant: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let approver_role = match lookup("APPROVER_ROLE") {
            Some(role) if role.trim().is_empty() => {
                return Err(AppError::configuration("APPROVER_ROLE must not be blank"));
            }
            Some(role) => role.trim().to_string(),
            None => roles::COMPANY_ADMIN.to_string(),
        };

        let default_tenant = lookup("DEFAULT_TENANT")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            approver_role,
            default_tenant,
        })
    }
}
