//! Authorization module - permission vocabulary and evaluator
//!
//! This module implements the RBAC permission model:
//! - A closed permission vocabulary split into global, tenant-admin and staff groups
//! - Role permission lists parsed once at load into typed sets
//! - A pure evaluator answering capability queries from a principal's roles

mod evaluator;
mod permission;
mod principal;

pub use evaluator::{PolicyEvaluator, RolePolicyEvaluator};
pub use permission::{is_valid_permission, Permission, PermissionGroup, PermissionSet};
pub use principal::Principal;

/// Well-known role names
pub mod roles {
    /// Default approver role; overridden by `APPROVER_ROLE`.
    pub const COMPANY_ADMIN: &str = "COMPANY_ADMIN";
}
