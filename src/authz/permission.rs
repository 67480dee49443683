use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Atomic capability identifier. The set of variants is the full vocabulary;
/// anything outside it is not a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    // Global
    ViewAllCompanies,
    ManageAllCompanies,
    ViewAllUsers,
    ManageAllUsers,
    ViewAllRevenue,
    SystemSettings,

    // Tenant admin
    ViewCompanyDashboard,
    ManageCompanyUsers,
    ViewCompanyRevenue,
    ManageCompanySettings,
    ApproveQuotes,
    ApproveBookings,
    ViewNotifications,

    // Staff
    CreateQuotes,
    EditQuotes,
    ViewQuotes,
    CreateBookings,
    EditBookings,
    ViewBookings,
    CreateLeads,
    EditLeads,
    ViewLeads,
    CreateCustomers,
    EditCustomers,
    ViewCustomers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionGroup {
    Global,
    TenantAdmin,
    Staff,
}

impl PermissionGroup {
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            PermissionGroup::Global => &[
                ViewAllCompanies,
                ManageAllCompanies,
                ViewAllUsers,
                ManageAllUsers,
                ViewAllRevenue,
                SystemSettings,
            ],
            PermissionGroup::TenantAdmin => &[
                ViewCompanyDashboard,
                ManageCompanyUsers,
                ViewCompanyRevenue,
                ManageCompanySettings,
                ApproveQuotes,
                ApproveBookings,
                ViewNotifications,
            ],
            PermissionGroup::Staff => &[
                CreateQuotes,
                EditQuotes,
                ViewQuotes,
                CreateBookings,
                EditBookings,
                ViewBookings,
                CreateLeads,
                EditLeads,
                ViewLeads,
                CreateCustomers,
                EditCustomers,
                ViewCustomers,
            ],
        }
    }
}

impl Permission {
    pub const ALL_GROUPS: [PermissionGroup; 3] =
        [PermissionGroup::Global, PermissionGroup::TenantAdmin, PermissionGroup::Staff];

    pub fn as_str(&self) -> &'static str {
        use Permission::*;
        match self {
            ViewAllCompanies => "VIEW_ALL_COMPANIES",
            ManageAllCompanies => "MANAGE_ALL_COMPANIES",
            ViewAllUsers => "VIEW_ALL_USERS",
            ManageAllUsers => "MANAGE_ALL_USERS",
            ViewAllRevenue => "VIEW_ALL_REVENUE",
            SystemSettings => "SYSTEM_SETTINGS",
            ViewCompanyDashboard => "VIEW_COMPANY_DASHBOARD",
            ManageCompanyUsers => "MANAGE_COMPANY_USERS",
            ViewCompanyRevenue => "VIEW_COMPANY_REVENUE",
            ManageCompanySettings => "MANAGE_COMPANY_SETTINGS",
            ApproveQuotes => "APPROVE_QUOTES",
            ApproveBookings => "APPROVE_BOOKINGS",
            ViewNotifications => "VIEW_NOTIFICATIONS",
            CreateQuotes => "CREATE_QUOTES",
            EditQuotes => "EDIT_QUOTES",
            ViewQuotes => "VIEW_QUOTES",
            CreateBookings => "CREATE_BOOKINGS",
            EditBookings => "EDIT_BOOKINGS",
            ViewBookings => "VIEW_BOOKINGS",
            CreateLeads => "CREATE_LEADS",
            EditLeads => "EDIT_LEADS",
            ViewLeads => "VIEW_LEADS",
            CreateCustomers => "CREATE_CUSTOMERS",
            EditCustomers => "EDIT_CUSTOMERS",
            ViewCustomers => "VIEW_CUSTOMERS",
        }
    }

    pub fn group(&self) -> PermissionGroup {
        Self::ALL_GROUPS
            .into_iter()
            .find(|group| group.permissions().contains(self))
            .unwrap_or(PermissionGroup::Staff)
    }

    pub fn all() -> impl Iterator<Item = Permission> {
        Self::ALL_GROUPS
            .into_iter()
            .flat_map(|group| group.permissions().iter().copied())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::all()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("unknown permission: {s}")))
    }
}

/// True iff `name` belongs to one of the three permission groups.
pub fn is_valid_permission(name: &str) -> bool {
    name.parse::<Permission>().is_ok()
}

/// Typed permission set carried by a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Vec<Permission>)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON list stored on a role row.
    ///
    /// A missing, blank or malformed list yields an empty set for that role.
    /// Names outside the vocabulary are dropped one by one.
    pub fn from_stored(role_name: &str, raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Self::new(),
        };

        let names: Vec<String> = match serde_json::from_str(raw) {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(
                    role = %role_name,
                    error = %err,
                    "malformed permission list on role, treating as empty"
                );
                return Self::new();
            }
        };

        names
            .iter()
            .filter_map(|name| match name.parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(_) => {
                    tracing::warn!(role = %role_name, permission = %name, "ignoring unknown permission");
                    None
                }
            })
            .collect()
    }

    /// Strict parse used when a role is being defined: every name must be known.
    pub fn parse_strict<I, S>(names: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        let mut unknown = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            match name.parse::<Permission>() {
                Ok(permission) => {
                    set.insert(permission);
                }
                Err(_) => unknown.push(name.to_string()),
            }
        }

        if unknown.is_empty() {
            Ok(set)
        } else {
            Err(AppError::validation(format!("unknown permissions: {}", unknown.join(", "))))
        }
    }

    pub fn to_stored(&self) -> String {
        let names: Vec<&str> = self.0.iter().map(Permission::as_str).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn extend(&mut self, other: &PermissionSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
