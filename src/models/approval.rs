use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Permission;
use crate::errors::AppError;

/// Kinds of entity that go through the approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Quote,
    Booking,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Quote => "QUOTE",
            EntityKind::Booking => "BOOKING",
        }
    }

    /// Lower-case label used in messages and action URLs.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Quote => "quote",
            EntityKind::Booking => "booking",
        }
    }

    pub fn submit_permission(&self) -> Permission {
        match self {
            EntityKind::Quote => Permission::CreateQuotes,
            EntityKind::Booking => Permission::CreateBookings,
        }
    }

    pub fn approve_permission(&self) -> Permission {
        match self {
            EntityKind::Quote => Permission::ApproveQuotes,
            EntityKind::Booking => Permission::ApproveBookings,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUOTE" => Ok(EntityKind::Quote),
            "BOOKING" => Ok(EntityKind::Booking),
            other => Err(AppError::validation(format!("unknown entity kind: {other}"))),
        }
    }
}

/// Approval metadata owned by a quote or booking.
///
/// `approved_by`/`approved_at` and `rejection_reason` are mutually exclusive;
/// the setters below are the only way they change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApprovalState {
    pub approval_required: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl ApprovalState {
    pub fn request(&mut self) {
        self.approval_required = true;
        self.approved_by = None;
        self.approved_at = None;
        self.rejection_reason = None;
    }

    pub fn approve(&mut self, approver: &str, at: DateTime<Utc>) {
        self.approved_by = Some(approver.to_string());
        self.approved_at = Some(at);
        self.rejection_reason = None;
    }

    pub fn reject(&mut self, reason: &str) {
        self.approved_by = None;
        self.approved_at = None;
        self.rejection_reason = Some(reason.to_string());
    }
}

/// Audit stamp written with every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditStamp {
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AuditStamp {
    pub fn created(by: Option<&str>, at: DateTime<Utc>) -> Self {
        AuditStamp {
            created_by: by.map(str::to_string),
            created_at: at,
            updated_by: by.map(str::to_string),
            updated_at: at,
        }
    }

    pub fn touch(&mut self, by: &str, at: DateTime<Utc>) {
        self.updated_by = Some(by.to_string());
        self.updated_at = at;
    }
}

/// An entity driven through submit / approve / reject.
///
/// Implementors decide which concrete status each step lands on; the
/// workflow only sees the transitions.
pub trait Approvable: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> &str;
    fn title(&self) -> &str;
    fn status_label(&self) -> &'static str;
    fn is_pending_approval(&self) -> bool;
    fn approval(&self) -> &ApprovalState;

    fn enter_pending(&mut self);
    fn enter_approved(&mut self, approver: &str, at: DateTime<Utc>);
    fn enter_rejected(&mut self, reason: &str);
    fn touch(&mut self, actor: &str, at: DateTime<Utc>);
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CanApproveResponse {
    pub entity_type: EntityKind,
    pub entity_id: Uuid,
    pub status: String,
    pub can_approve: bool,
}

impl CanApproveResponse {
    pub fn for_entity<E: Approvable>(entity: &E, can_approve: bool) -> Self {
        Self {
            entity_type: E::KIND,
            entity_id: entity.id(),
            status: entity.status_label().to_string(),
            can_approve,
        }
    }
}
