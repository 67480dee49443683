use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::approval::{Approvable, ApprovalState, AuditStamp, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingApproval,
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingApproval => "PENDING_APPROVAL",
            BookingStatus::Scheduled => "SCHEDULED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::NoShow => "NO_SHOW",
            BookingStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_APPROVAL" => Ok(BookingStatus::PendingApproval),
            "SCHEDULED" => Ok(BookingStatus::Scheduled),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "IN_PROGRESS" => Ok(BookingStatus::InProgress),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "NO_SHOW" => Ok(BookingStatus::NoShow),
            "REJECTED" => Ok(BookingStatus::Rejected),
            other => Err(AppError::validation(format!("unknown booking status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub tenant_id: String,
    pub company_id: Uuid,
    pub booking_number: String,
    pub title: String,
    pub description: Option<String>,
    pub quote_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub estimated_duration_minutes: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub total_amount: Option<Decimal>,
    pub status: BookingStatus,
    pub approval: ApprovalState,
    pub audit: AuditStamp,
}

impl Booking {
    pub fn scheduled(
        tenant_id: impl Into<String>,
        company_id: Uuid,
        booking_number: impl Into<String>,
        title: impl Into<String>,
        customer_id: Uuid,
        scheduled_date: DateTime<Utc>,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            company_id,
            booking_number: booking_number.into(),
            title: title.into(),
            description: None,
            quote_id: None,
            customer_id,
            scheduled_date,
            estimated_duration_minutes: None,
            total_amount: None,
            status: BookingStatus::Scheduled,
            approval: ApprovalState {
                approval_required: true,
                ..ApprovalState::default()
            },
            audit: AuditStamp::created(Some(created_by), now),
        }
    }
}

impl Approvable for Booking {
    const KIND: EntityKind = EntityKind::Booking;

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn is_pending_approval(&self) -> bool {
        self.status == BookingStatus::PendingApproval
    }

    fn approval(&self) -> &ApprovalState {
        &self.approval
    }

    fn enter_pending(&mut self) {
        self.status = BookingStatus::PendingApproval;
        self.approval.request();
    }

    // Bookings land on CONFIRMED, not an APPROVED state.
    fn enter_approved(&mut self, approver: &str, at: DateTime<Utc>) {
        self.status = BookingStatus::Confirmed;
        self.approval.approve(approver, at);
    }

    fn enter_rejected(&mut self, reason: &str) {
        self.status = BookingStatus::Rejected;
        self.approval.reject(reason);
    }

    fn touch(&mut self, actor: &str, at: DateTime<Utc>) {
        self.audit.touch(actor, at);
    }
}
