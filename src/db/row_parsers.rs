use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::approval::{ApprovalState, AuditStamp};
use crate::models::booking::Booking;
use crate::models::company::Company;
use crate::models::notification::Notification;
use crate::models::quote::{Quote, QuoteItem};
use crate::models::role::Role;
use crate::models::setting::Setting;
use crate::models::user::User;

/// Timestamps are stored as RFC3339 with a fixed precision so that text
/// ordering matches time ordering.
pub fn encode_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite CURRENT_TIMESTAMP form
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range"))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match s.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(Some(parse_datetime(trimmed)?)),
        _ => Ok(None),
    }
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, AppError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| AppError::internal(format!("missing {}: {}", name, e)))
}

fn uuid_col(row: &SqliteRow, name: &str) -> Result<Uuid, AppError> {
    let s: String = col(row, name)?;
    Uuid::parse_str(&s).map_err(|e| AppError::internal(format!("invalid uuid in {}: {}", name, e)))
}

fn opt_uuid_col(row: &SqliteRow, name: &str) -> Result<Option<Uuid>, AppError> {
    let s: Option<String> = col(row, name)?;
    s.map(|s| Uuid::parse_str(&s).map_err(|e| AppError::internal(format!("invalid uuid in {}: {}", name, e))))
        .transpose()
}

fn datetime_col(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>, AppError> {
    let s: String = col(row, name)?;
    parse_datetime(&s)
}

fn opt_datetime_col(row: &SqliteRow, name: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    parse_opt_datetime(col(row, name)?)
}

fn decimal_col(row: &SqliteRow, name: &str) -> Result<Decimal, AppError> {
    let s: String = col(row, name)?;
    Decimal::from_str(s.trim()).map_err(|e| AppError::internal(format!("invalid decimal in {}: {}", name, e)))
}

fn opt_decimal_col(row: &SqliteRow, name: &str) -> Result<Option<Decimal>, AppError> {
    let s: Option<String> = col(row, name)?;
    s.map(|s| Decimal::from_str(s.trim()).map_err(|e| AppError::internal(format!("invalid decimal in {}: {}", name, e))))
        .transpose()
}

/// Enum columns; an unrecognised value surfaces as a validation error.
fn parsed_col<T>(row: &SqliteRow, name: &str) -> Result<T, AppError>
where
    T: FromStr<Err = AppError>,
{
    let s: String = col(row, name)?;
    s.parse()
}

fn approval_from_row(row: &SqliteRow) -> Result<ApprovalState, AppError> {
    Ok(ApprovalState {
        approval_required: col(row, "approval_required")?,
        approved_by: col(row, "approved_by")?,
        approved_at: opt_datetime_col(row, "approved_at")?,
        rejection_reason: col(row, "rejection_reason")?,
    })
}

fn audit_from_row(row: &SqliteRow) -> Result<AuditStamp, AppError> {
    Ok(AuditStamp {
        created_by: col(row, "created_by")?,
        created_at: datetime_col(row, "created_at")?,
        updated_by: col(row, "updated_by")?,
        updated_at: datetime_col(row, "updated_at")?,
    })
}

pub fn company_from_row(row: &SqliteRow) -> Result<Company, AppError> {
    Ok(Company {
        id: uuid_col(row, "id")?,
        tenant_id: col(row, "tenant_id")?,
        name: col(row, "name")?,
        subdomain: col(row, "subdomain")?,
        status: parsed_col(row, "status")?,
        created_at: datetime_col(row, "created_at")?,
        updated_at: datetime_col(row, "updated_at")?,
    })
}

pub fn role_from_row(row: &SqliteRow) -> Result<Role, AppError> {
    let name: String = col(row, "name")?;
    let permissions: Option<String> = col(row, "permissions")?;
    Ok(Role::from_stored(
        uuid_col(row, "id")?,
        col(row, "tenant_id")?,
        &name,
        col(row, "description")?,
        permissions.as_deref(),
        parsed_col(row, "role_type")?,
    ))
}

/// Roles are loaded separately and attached by the caller.
pub fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    Ok(User {
        id: uuid_col(row, "id")?,
        tenant_id: col(row, "tenant_id")?,
        email: col(row, "email")?,
        first_name: col(row, "first_name")?,
        last_name: col(row, "last_name")?,
        status: parsed_col(row, "status")?,
        roles: Vec::new(),
        created_at: datetime_col(row, "created_at")?,
        updated_at: datetime_col(row, "updated_at")?,
    })
}

pub fn quote_item_from_row(row: &SqliteRow) -> Result<QuoteItem, AppError> {
    Ok(QuoteItem {
        id: uuid_col(row, "id")?,
        description: col(row, "description")?,
        quantity: decimal_col(row, "quantity")?,
        unit_price: decimal_col(row, "unit_price")?,
        total: decimal_col(row, "total")?,
        notes: col(row, "notes")?,
    })
}

pub fn quote_from_row(row: &SqliteRow, items: Vec<QuoteItem>) -> Result<Quote, AppError> {
    Ok(Quote {
        id: uuid_col(row, "id")?,
        tenant_id: col(row, "tenant_id")?,
        company_id: uuid_col(row, "company_id")?,
        quote_number: col(row, "quote_number")?,
        title: col(row, "title")?,
        description: col(row, "description")?,
        customer_id: opt_uuid_col(row, "customer_id")?,
        items,
        subtotal: decimal_col(row, "subtotal")?,
        tax_rate: decimal_col(row, "tax_rate")?,
        tax_amount: decimal_col(row, "tax_amount")?,
        discount_amount: decimal_col(row, "discount_amount")?,
        total: decimal_col(row, "total")?,
        status: parsed_col(row, "status")?,
        valid_until: opt_datetime_col(row, "valid_until")?,
        approval: approval_from_row(row)?,
        audit: audit_from_row(row)?,
    })
}

pub fn booking_from_row(row: &SqliteRow) -> Result<Booking, AppError> {
    Ok(Booking {
        id: uuid_col(row, "id")?,
        tenant_id: col(row, "tenant_id")?,
        company_id: uuid_col(row, "company_id")?,
        booking_number: col(row, "booking_number")?,
        title: col(row, "title")?,
        description: col(row, "description")?,
        quote_id: opt_uuid_col(row, "quote_id")?,
        customer_id: uuid_col(row, "customer_id")?,
        scheduled_date: datetime_col(row, "scheduled_date")?,
        estimated_duration_minutes: col(row, "estimated_duration_minutes")?,
        total_amount: opt_decimal_col(row, "total_amount")?,
        status: parsed_col(row, "status")?,
        approval: approval_from_row(row)?,
        audit: audit_from_row(row)?,
    })
}

pub fn notification_from_row(row: &SqliteRow) -> Result<Notification, AppError> {
    let related_entity_type: Option<String> = col(row, "related_entity_type")?;
    Ok(Notification {
        id: uuid_col(row, "id")?,
        tenant_id: col(row, "tenant_id")?,
        title: col(row, "title")?,
        message: col(row, "message")?,
        notification_type: parsed_col(row, "notification_type")?,
        status: parsed_col(row, "status")?,
        read_at: opt_datetime_col(row, "read_at")?,
        action_required: col(row, "action_required")?,
        action_url: col(row, "action_url")?,
        related_entity_type: related_entity_type.map(|s| s.parse()).transpose()?,
        related_entity_id: opt_uuid_col(row, "related_entity_id")?,
        recipient_id: uuid_col(row, "recipient_id")?,
        sender_id: opt_uuid_col(row, "sender_id")?,
        priority: parsed_col(row, "priority")?,
        audit: audit_from_row(row)?,
    })
}

pub fn setting_from_row(row: &SqliteRow) -> Result<Setting, AppError> {
    Ok(Setting {
        id: uuid_col(row, "id")?,
        tenant_id: col(row, "tenant_id")?,
        key: col(row, "setting_key")?,
        value: col(row, "setting_value")?,
        setting_type: parsed_col(row, "setting_type")?,
        description: col(row, "description")?,
        category: col(row, "category")?,
        editable: col(row, "editable")?,
        audit: audit_from_row(row)?,
    })
}
