//! Persistence seams.
//!
//! Every lookup is keyed by tenant: an entity belonging to another tenant is
//! indistinguishable from one that does not exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::company::Company;
use crate::models::notification::{Notification, NotificationStatus};
use crate::models::setting::{bool_or, int_or, Setting};
use crate::models::user::User;
use crate::tenant::TenantId;

mod sqlite;

pub use sqlite::SqliteStore;

/// Tenant-scoped load and save for one entity type.
#[async_trait]
pub trait TenantRepository<E>: Send + Sync
where
    E: Send + Sync + 'static,
{
    async fn find_by_tenant_and_id(&self, tenant: &TenantId, id: Uuid) -> AppResult<Option<E>>;

    /// Insert or update; returns the entity as persisted.
    async fn save(&self, entity: &E) -> AppResult<E>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users of `tenant` holding a role named `role_name`, oldest first.
    async fn find_users_by_tenant_and_role(&self, tenant: &TenantId, role_name: &str) -> AppResult<Vec<User>>;

    async fn find_user_by_email(&self, tenant: &TenantId, email: &str) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_company(&self, tenant: &TenantId) -> AppResult<Option<Company>>;
}

/// Recipient-side notification queries.
#[async_trait]
pub trait NotificationInbox: Send + Sync {
    async fn list_for_recipient(
        &self,
        tenant: &TenantId,
        recipient_id: Uuid,
        status: Option<NotificationStatus>,
    ) -> AppResult<Vec<Notification>>;

    async fn count_for_recipient(
        &self,
        tenant: &TenantId,
        recipient_id: Uuid,
        status: Option<NotificationStatus>,
    ) -> AppResult<i64>;

    /// Marks every unread notification of the recipient as read; returns how many changed.
    async fn mark_all_read(&self, tenant: &TenantId, recipient_id: Uuid, by: &str, at: DateTime<Utc>) -> AppResult<u64>;

    async fn delete_notification(&self, tenant: &TenantId, id: Uuid) -> AppResult<bool>;
}

/// Per-tenant settings keyed by name. Writes go through `TenantRepository<Setting>`.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// All settings of the tenant, optionally limited to one category, ordered by key.
    async fn list_settings(&self, tenant: &TenantId, category: Option<&str>) -> AppResult<Vec<Setting>>;

    async fn find_setting(&self, tenant: &TenantId, key: &str) -> AppResult<Option<Setting>>;

    async fn count_settings(&self, tenant: &TenantId) -> AppResult<i64>;

    async fn delete_setting(&self, tenant: &TenantId, key: &str) -> AppResult<bool>;

    async fn setting_value(&self, tenant: &TenantId, key: &str) -> AppResult<Option<String>> {
        Ok(self.find_setting(tenant, key).await?.and_then(|s| s.value))
    }

    async fn setting_bool(&self, tenant: &TenantId, key: &str, default: bool) -> AppResult<bool> {
        let value = self.setting_value(tenant, key).await?;
        Ok(bool_or(value.as_deref(), default))
    }

    async fn setting_int(&self, tenant: &TenantId, key: &str, default: i64) -> AppResult<i64> {
        let value = self.setting_value(tenant, key).await?;
        Ok(int_or(value.as_deref(), default))
    }
}
