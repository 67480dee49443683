use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::approval::{AuditStamp, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    QuoteApproval,
    BookingApproval,
    LeadAssignment,
    PaymentReceived,
    SystemAlert,
    UserInvitation,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::QuoteApproval => "QUOTE_APPROVAL",
            NotificationType::BookingApproval => "BOOKING_APPROVAL",
            NotificationType::LeadAssignment => "LEAD_ASSIGNMENT",
            NotificationType::PaymentReceived => "PAYMENT_RECEIVED",
            NotificationType::SystemAlert => "SYSTEM_ALERT",
            NotificationType::UserInvitation => "USER_INVITATION",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUOTE_APPROVAL" => Ok(NotificationType::QuoteApproval),
            "BOOKING_APPROVAL" => Ok(NotificationType::BookingApproval),
            "LEAD_ASSIGNMENT" => Ok(NotificationType::LeadAssignment),
            "PAYMENT_RECEIVED" => Ok(NotificationType::PaymentReceived),
            "SYSTEM_ALERT" => Ok(NotificationType::SystemAlert),
            "USER_INVITATION" => Ok(NotificationType::UserInvitation),
            other => Err(AppError::validation(format!("unknown notification type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Read,
    Archived,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "UNREAD",
            NotificationStatus::Read => "READ",
            NotificationStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNREAD" => Ok(NotificationStatus::Unread),
            "READ" => Ok(NotificationStatus::Read),
            "ARCHIVED" => Ok(NotificationStatus::Archived),
            other => Err(AppError::validation(format!("unknown notification status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "LOW",
            NotificationPriority::Normal => "NORMAL",
            NotificationPriority::High => "HIGH",
            NotificationPriority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationPriority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(NotificationPriority::Low),
            "NORMAL" => Ok(NotificationPriority::Normal),
            "HIGH" => Ok(NotificationPriority::High),
            "URGENT" => Ok(NotificationPriority::Urgent),
            other => Err(AppError::validation(format!("unknown notification priority: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub tenant_id: String,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub read_at: Option<DateTime<Utc>>,
    pub action_required: bool,
    pub action_url: Option<String>,
    pub related_entity_type: Option<EntityKind>,
    pub related_entity_id: Option<Uuid>,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub priority: NotificationPriority,
    pub audit: AuditStamp,
}

impl Notification {
    /// Build the "approval required" notice sent when an entity is submitted.
    pub fn approval_request(
        tenant_id: impl Into<String>,
        kind: EntityKind,
        entity_id: Uuid,
        entity_title: &str,
        recipient_id: Uuid,
        sender_id: Option<Uuid>,
        sender_email: &str,
    ) -> Self {
        let notification_type = match kind {
            EntityKind::Quote => NotificationType::QuoteApproval,
            EntityKind::Booking => NotificationType::BookingApproval,
        };

        Notification {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            title: "Approval Required".to_string(),
            message: format!("A new {} '{}' requires your approval", kind.label(), entity_title),
            notification_type,
            status: NotificationStatus::Unread,
            read_at: None,
            action_required: true,
            action_url: Some(format!("/{}/{}", kind.label(), entity_id)),
            related_entity_type: Some(kind),
            related_entity_id: Some(entity_id),
            recipient_id,
            sender_id,
            priority: NotificationPriority::High,
            audit: AuditStamp::created(Some(sender_email), Utc::now()),
        }
    }

    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }

    pub fn mark_read(&mut self, by: &str, at: DateTime<Utc>) {
        self.status = NotificationStatus::Read;
        self.read_at = Some(at);
        self.audit.touch(by, at);
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    /// UNREAD, READ or ARCHIVED
    pub status: Option<String>,
}

impl NotificationQuery {
    pub fn status(&self) -> Result<Option<NotificationStatus>, AppError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<NotificationStatus>)
            .transpose()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationCount {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
