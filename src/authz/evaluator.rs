use super::permission::{Permission, PermissionSet};
use super::principal::Principal;

/// Policy evaluator trait for pluggable authorization logic.
///
/// Only `has_permission` and `user_permissions` are required; every derived
/// capability query is expressed through `has_permission`.
pub trait PolicyEvaluator: Send + Sync {
    /// Check if the principal holds `permission` through any of its roles.
    /// An absent principal holds nothing.
    fn has_permission(&self, principal: Option<&Principal>, permission: Permission) -> bool;

    /// The full resolved permission set of the principal.
    fn user_permissions(&self, principal: Option<&Principal>) -> PermissionSet;

    fn has_any_permission(&self, principal: Option<&Principal>, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.has_permission(principal, *p))
    }

    fn has_all_permissions(&self, principal: Option<&Principal>, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.has_permission(principal, *p))
    }

    fn is_super_admin(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::ViewAllCompanies)
    }

    fn is_company_admin(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::ViewCompanyDashboard)
    }

    fn can_manage_company_users(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::ManageCompanyUsers)
    }

    fn can_approve_quotes(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::ApproveQuotes)
    }

    fn can_approve_bookings(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::ApproveBookings)
    }

    fn can_create_quotes(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::CreateQuotes)
    }

    fn can_create_bookings(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::CreateBookings)
    }

    fn can_view_company_revenue(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::ViewCompanyRevenue)
    }

    fn can_view_all_companies(&self, principal: Option<&Principal>) -> bool {
        self.has_permission(principal, Permission::ViewAllCompanies)
    }

    /// Tenant admins manage their own settings; SYSTEM_SETTINGS covers every tenant.
    fn can_manage_settings(&self, principal: Option<&Principal>) -> bool {
        self.has_any_permission(principal, &[Permission::ManageCompanySettings, Permission::SystemSettings])
    }
}

/// Default evaluator: a permission is held iff it is in the union of the
/// principal's role permission sets. Nothing is cached between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicyEvaluator;

impl RolePolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyEvaluator for RolePolicyEvaluator {
    fn has_permission(&self, principal: Option<&Principal>, permission: Permission) -> bool {
        let Some(principal) = principal else {
            return false;
        };

        let granted = principal
            .roles
            .iter()
            .any(|role| role.permissions.contains(permission));

        tracing::debug!(
            user_id = %principal.user_id,
            permission = %permission,
            granted,
            "permission evaluated"
        );
        granted
    }

    fn user_permissions(&self, principal: Option<&Principal>) -> PermissionSet {
        let mut resolved = PermissionSet::new();
        if let Some(principal) = principal {
            for role in &principal.roles {
                resolved.extend(&role.permissions);
            }
        }
        resolved
    }
}
