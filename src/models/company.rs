use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyStatus {
    Active,
    Inactive,
    Suspended,
    Trial,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "ACTIVE",
            CompanyStatus::Inactive => "INACTIVE",
            CompanyStatus::Suspended => "SUSPENDED",
            CompanyStatus::Trial => "TRIAL",
        }
    }
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanyStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CompanyStatus::Active),
            "INACTIVE" => Ok(CompanyStatus::Inactive),
            "SUSPENDED" => Ok(CompanyStatus::Suspended),
            "TRIAL" => Ok(CompanyStatus::Trial),
            other => Err(AppError::validation(format!("unknown company status: {other}"))),
        }
    }
}

/// A company is a tenant: its `tenant_id` is the isolation key carried by
/// every other entity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Company {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub subdomain: Option<String>,
    pub status: CompanyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Company {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            subdomain: None,
            status: CompanyStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn accepts_requests(&self) -> bool {
        !matches!(self.status, CompanyStatus::Suspended | CompanyStatus::Inactive)
    }
}
