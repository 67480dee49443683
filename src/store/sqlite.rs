use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use super::{NotificationInbox, SettingsRepository, TenantDirectory, TenantRepository, UserDirectory};
use crate::db::row_parsers::{
    booking_from_row, company_from_row, encode_datetime, notification_from_row, quote_from_row, quote_item_from_row,
    role_from_row, setting_from_row, user_from_row,
};
use crate::errors::{AppError, AppResult};
use crate::models::approval::{ApprovalState, AuditStamp};
use crate::models::booking::Booking;
use crate::models::company::Company;
use crate::models::notification::{Notification, NotificationStatus};
use crate::models::quote::Quote;
use crate::models::role::Role;
use crate::models::setting::Setting;
use crate::models::user::User;
use crate::tenant::TenantId;
use crate::utils::utc_now;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

const QUOTE_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "company_id",
    "quote_number",
    "title",
    "description",
    "customer_id",
    "subtotal",
    "tax_rate",
    "tax_amount",
    "discount_amount",
    "total",
    "status",
    "valid_until",
    "approval_required",
    "approved_by",
    "approved_at",
    "rejection_reason",
    "created_by",
    "created_at",
    "updated_by",
    "updated_at",
];

const BOOKING_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "company_id",
    "booking_number",
    "title",
    "description",
    "quote_id",
    "customer_id",
    "scheduled_date",
    "estimated_duration_minutes",
    "total_amount",
    "status",
    "approval_required",
    "approved_by",
    "approved_at",
    "rejection_reason",
    "created_by",
    "created_at",
    "updated_by",
    "updated_at",
];

const NOTIFICATION_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "title",
    "message",
    "notification_type",
    "status",
    "read_at",
    "action_required",
    "action_url",
    "related_entity_type",
    "related_entity_id",
    "recipient_id",
    "sender_id",
    "priority",
    "created_by",
    "created_at",
    "updated_by",
    "updated_at",
];

const SETTING_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "setting_key",
    "setting_value",
    "setting_type",
    "description",
    "category",
    "editable",
    "created_by",
    "created_at",
    "updated_by",
    "updated_at",
];

const COMPANY_COLUMNS: &[&str] = &["id", "tenant_id", "name", "subdomain", "status", "created_at", "updated_at"];

const USER_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "email",
    "first_name",
    "last_name",
    "status",
    "created_at",
    "updated_at",
];

const ROLE_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "name",
    "description",
    "permissions",
    "role_type",
    "created_at",
    "updated_at",
];

const IMMUTABLE_COLUMNS: &[&str] = &["id", "tenant_id", "created_by", "created_at"];

/// Insert-or-update keyed on `id`. The update only applies when the stored
/// row belongs to the same tenant, so a cross-tenant save affects no rows.
fn upsert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates = columns
        .iter()
        .filter(|c| !IMMUTABLE_COLUMNS.contains(c))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT(id) DO UPDATE SET {updates} WHERE {table}.tenant_id IS excluded.tenant_id",
        columns.join(", ")
    )
}

fn bind_approval<'q>(query: SqliteQuery<'q>, approval: &ApprovalState) -> SqliteQuery<'q> {
    query
        .bind(approval.approval_required)
        .bind(approval.approved_by.clone())
        .bind(approval.approved_at.as_ref().map(encode_datetime))
        .bind(approval.rejection_reason.clone())
}

fn bind_audit<'q>(query: SqliteQuery<'q>, audit: &AuditStamp) -> SqliteQuery<'q> {
    query
        .bind(audit.created_by.clone())
        .bind(encode_datetime(&audit.created_at))
        .bind(audit.updated_by.clone())
        .bind(encode_datetime(&audit.updated_at))
}

fn cross_tenant_write(kind: &str, id: Uuid) -> AppError {
    tracing::warn!(%id, "refused {} write across tenants", kind);
    AppError::not_found(format!("{} not found", kind))
}

/// SQLite-backed implementation of every store seam.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn save_company(&self, company: &Company) -> AppResult<Company> {
        let sql = upsert_sql("companies", COMPANY_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(company.id.to_string())
            .bind(&company.tenant_id)
            .bind(&company.name)
            .bind(company.subdomain.clone())
            .bind(company.status.as_str())
            .bind(encode_datetime(&company.created_at))
            .bind(encode_datetime(&company.updated_at))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(cross_tenant_write("company", company.id));
        }
        Ok(company.clone())
    }

    /// Persist the user row. Role membership is managed with `assign_role`.
    pub async fn save_user(&self, user: &User) -> AppResult<User> {
        let sql = upsert_sql("users", USER_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(user.id.to_string())
            .bind(&user.tenant_id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.status.as_str())
            .bind(encode_datetime(&user.created_at))
            .bind(encode_datetime(&user.updated_at))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(cross_tenant_write("user", user.id));
        }

        let mut saved = user.clone();
        saved.roles = self.roles_for_user(&saved).await?;
        Ok(saved)
    }

    /// Create the role, or replace the description and permissions of the
    /// existing role with the same name in the same scope.
    pub async fn save_role(&self, role: &Role) -> AppResult<Role> {
        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM roles WHERE tenant_id IS ? AND name = ?")
            .bind(role.tenant_id.clone())
            .bind(&role.name)
            .fetch_optional(&self.pool)
            .await?;

        let mut saved = role.clone();
        if let Some(id) = existing {
            saved.id = Uuid::parse_str(&id).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))?;
        }

        let now = encode_datetime(&utc_now());
        let sql = upsert_sql("roles", ROLE_COLUMNS);
        sqlx::query(&sql)
            .bind(saved.id.to_string())
            .bind(saved.tenant_id.clone())
            .bind(&saved.name)
            .bind(saved.description.clone())
            .bind(saved.permissions.to_stored())
            .bind(saved.role_type.as_str())
            .bind(now.clone())
            .bind(now)
            .execute(&self.pool)
            .await?;

        tracing::info!(role = %saved.name, permissions = saved.permissions.len(), "role saved");
        Ok(saved)
    }

    /// A tenant role shadows a global role of the same name.
    pub async fn find_role(&self, tenant: &TenantId, name: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query(
            "SELECT * FROM roles WHERE name = ? AND (tenant_id IS NULL OR tenant_id = ?) ORDER BY tenant_id IS NULL LIMIT 1",
        )
        .bind(name)
        .bind(tenant.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(role_from_row).transpose()
    }

    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id.to_string())
            .bind(role_id.to_string())
            .bind(encode_datetime(&utc_now()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn roles_for_user(&self, user: &User) -> AppResult<Vec<Role>> {
        let rows = sqlx::query(
            "SELECT r.* FROM roles r JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = ? AND (r.tenant_id IS NULL OR r.tenant_id = ?) ORDER BY r.name",
        )
        .bind(user.id.to_string())
        .bind(&user.tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(role_from_row).collect()
    }

    async fn with_roles(&self, mut user: User) -> AppResult<User> {
        user.roles = self.roles_for_user(&user).await?;
        Ok(user)
    }
}

#[async_trait]
impl TenantDirectory for SqliteStore {
    async fn find_company(&self, tenant: &TenantId) -> AppResult<Option<Company>> {
        let row = sqlx::query("SELECT * FROM companies WHERE tenant_id = ?")
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(company_from_row).transpose()
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn find_users_by_tenant_and_role(&self, tenant: &TenantId, role_name: &str) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.* FROM users u WHERE u.tenant_id = ? AND EXISTS ( \
                SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
                WHERE ur.user_id = u.id AND r.name = ? AND (r.tenant_id IS NULL OR r.tenant_id = u.tenant_id) \
             ) ORDER BY u.rowid",
        )
        .bind(tenant.as_str())
        .bind(role_name)
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(self.with_roles(user_from_row(row)?).await?);
        }
        Ok(users)
    }

    async fn find_user_by_email(&self, tenant: &TenantId, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE tenant_id = ? AND lower(email) = lower(?)")
            .bind(tenant.as_str())
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.with_roles(user_from_row(&row)?).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TenantRepository<Quote> for SqliteStore {
    async fn find_by_tenant_and_id(&self, tenant: &TenantId, id: Uuid) -> AppResult<Option<Quote>> {
        let Some(row) = sqlx::query("SELECT * FROM quotes WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let item_rows = sqlx::query("SELECT * FROM quote_items WHERE quote_id = ? ORDER BY position")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await?;
        let items = item_rows.iter().map(quote_item_from_row).collect::<AppResult<Vec<_>>>()?;

        quote_from_row(&row, items).map(Some)
    }

    /// Quote row and line items are written in one transaction.
    async fn save(&self, quote: &Quote) -> AppResult<Quote> {
        let sql = upsert_sql("quotes", QUOTE_COLUMNS);
        let mut tx = self.pool.begin().await?;

        let query = sqlx::query(&sql)
            .bind(quote.id.to_string())
            .bind(&quote.tenant_id)
            .bind(quote.company_id.to_string())
            .bind(&quote.quote_number)
            .bind(&quote.title)
            .bind(quote.description.clone())
            .bind(quote.customer_id.map(|id| id.to_string()))
            .bind(quote.subtotal.to_string())
            .bind(quote.tax_rate.to_string())
            .bind(quote.tax_amount.to_string())
            .bind(quote.discount_amount.to_string())
            .bind(quote.total.to_string())
            .bind(quote.status.as_str())
            .bind(quote.valid_until.as_ref().map(encode_datetime));
        let query = bind_audit(bind_approval(query, &quote.approval), &quote.audit);

        if query.execute(&mut *tx).await?.rows_affected() == 0 {
            return Err(cross_tenant_write("quote", quote.id));
        }

        sqlx::query("DELETE FROM quote_items WHERE quote_id = ?")
            .bind(quote.id.to_string())
            .execute(&mut *tx)
            .await?;

        for (position, item) in quote.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_items (id, quote_id, position, description, quantity, unit_price, total, notes) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(quote.id.to_string())
            .bind(position as i64)
            .bind(&item.description)
            .bind(item.quantity.to_string())
            .bind(item.unit_price.to_string())
            .bind(item.total.to_string())
            .bind(item.notes.clone())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let tenant = TenantId::new(quote.tenant_id.as_str());
        TenantRepository::<Quote>::find_by_tenant_and_id(self, &tenant, quote.id)
            .await?
            .ok_or_else(|| AppError::internal("quote missing after save"))
    }
}

#[async_trait]
impl TenantRepository<Booking> for SqliteStore {
    async fn find_by_tenant_and_id(&self, tenant: &TenantId, id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn save(&self, booking: &Booking) -> AppResult<Booking> {
        let sql = upsert_sql("bookings", BOOKING_COLUMNS);
        let query = sqlx::query(&sql)
            .bind(booking.id.to_string())
            .bind(&booking.tenant_id)
            .bind(booking.company_id.to_string())
            .bind(&booking.booking_number)
            .bind(&booking.title)
            .bind(booking.description.clone())
            .bind(booking.quote_id.map(|id| id.to_string()))
            .bind(booking.customer_id.to_string())
            .bind(encode_datetime(&booking.scheduled_date))
            .bind(booking.estimated_duration_minutes)
            .bind(booking.total_amount.map(|amount| amount.to_string()))
            .bind(booking.status.as_str());
        let query = bind_audit(bind_approval(query, &booking.approval), &booking.audit);

        if query.execute(&self.pool).await?.rows_affected() == 0 {
            return Err(cross_tenant_write("booking", booking.id));
        }

        let tenant = TenantId::new(booking.tenant_id.as_str());
        TenantRepository::<Booking>::find_by_tenant_and_id(self, &tenant, booking.id)
            .await?
            .ok_or_else(|| AppError::internal("booking missing after save"))
    }
}

#[async_trait]
impl TenantRepository<Notification> for SqliteStore {
    async fn find_by_tenant_and_id(&self, tenant: &TenantId, id: Uuid) -> AppResult<Option<Notification>> {
        let row = sqlx::query("SELECT * FROM notifications WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(notification_from_row).transpose()
    }

    async fn save(&self, notification: &Notification) -> AppResult<Notification> {
        let sql = upsert_sql("notifications", NOTIFICATION_COLUMNS);
        let query = sqlx::query(&sql)
            .bind(notification.id.to_string())
            .bind(&notification.tenant_id)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.notification_type.as_str())
            .bind(notification.status.as_str())
            .bind(notification.read_at.as_ref().map(encode_datetime))
            .bind(notification.action_required)
            .bind(notification.action_url.clone())
            .bind(notification.related_entity_type.map(|kind| kind.as_str()))
            .bind(notification.related_entity_id.map(|id| id.to_string()))
            .bind(notification.recipient_id.to_string())
            .bind(notification.sender_id.map(|id| id.to_string()))
            .bind(notification.priority.as_str());
        let query = bind_audit(query, &notification.audit);

        if query.execute(&self.pool).await?.rows_affected() == 0 {
            return Err(cross_tenant_write("notification", notification.id));
        }

        Ok(notification.clone())
    }
}

#[async_trait]
impl NotificationInbox for SqliteStore {
    async fn list_for_recipient(
        &self,
        tenant: &TenantId,
        recipient_id: Uuid,
        status: Option<NotificationStatus>,
    ) -> AppResult<Vec<Notification>> {
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE tenant_id = ? AND recipient_id = ? AND (? IS NULL OR status = ?) \
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(tenant.as_str())
        .bind(recipient_id.to_string())
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn count_for_recipient(
        &self,
        tenant: &TenantId,
        recipient_id: Uuid,
        status: Option<NotificationStatus>,
    ) -> AppResult<i64> {
        let status = status.map(|s| s.as_str());
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE tenant_id = ? AND recipient_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(tenant.as_str())
        .bind(recipient_id.to_string())
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_all_read(&self, tenant: &TenantId, recipient_id: Uuid, by: &str, at: DateTime<Utc>) -> AppResult<u64> {
        let at = encode_datetime(&at);
        let result = sqlx::query(
            "UPDATE notifications SET status = ?, read_at = ?, updated_by = ?, updated_at = ? \
             WHERE tenant_id = ? AND recipient_id = ? AND status = ?",
        )
        .bind(NotificationStatus::Read.as_str())
        .bind(at.clone())
        .bind(by)
        .bind(at)
        .bind(tenant.as_str())
        .bind(recipient_id.to_string())
        .bind(NotificationStatus::Unread.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, tenant: &TenantId, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TenantRepository<Setting> for SqliteStore {
    async fn find_by_tenant_and_id(&self, tenant: &TenantId, id: Uuid) -> AppResult<Option<Setting>> {
        let row = sqlx::query("SELECT * FROM settings WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(setting_from_row).transpose()
    }

    async fn save(&self, setting: &Setting) -> AppResult<Setting> {
        let sql = upsert_sql("settings", SETTING_COLUMNS);
        let query = sqlx::query(&sql)
            .bind(setting.id.to_string())
            .bind(&setting.tenant_id)
            .bind(&setting.key)
            .bind(setting.value.clone())
            .bind(setting.setting_type.as_str())
            .bind(setting.description.clone())
            .bind(setting.category.clone())
            .bind(setting.editable);
        let query = bind_audit(query, &setting.audit);

        if query.execute(&self.pool).await?.rows_affected() == 0 {
            return Err(cross_tenant_write("setting", setting.id));
        }

        Ok(setting.clone())
    }
}

#[async_trait]
impl SettingsRepository for SqliteStore {
    async fn list_settings(&self, tenant: &TenantId, category: Option<&str>) -> AppResult<Vec<Setting>> {
        let rows = sqlx::query(
            "SELECT * FROM settings WHERE tenant_id = ? AND (? IS NULL OR category = ?) ORDER BY setting_key",
        )
        .bind(tenant.as_str())
        .bind(category)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(setting_from_row).collect()
    }

    async fn find_setting(&self, tenant: &TenantId, key: &str) -> AppResult<Option<Setting>> {
        let row = sqlx::query("SELECT * FROM settings WHERE tenant_id = ? AND setting_key = ?")
            .bind(tenant.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(setting_from_row).transpose()
    }

    async fn count_settings(&self, tenant: &TenantId) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE tenant_id = ?")
            .bind(tenant.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_setting(&self, tenant: &TenantId, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE tenant_id = ? AND setting_key = ?")
            .bind(tenant.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
