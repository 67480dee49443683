//! Approval notifications and the recipient-side inbox operations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::authz::Principal;
use crate::errors::{AppError, AppResult};
use crate::models::approval::EntityKind;
use crate::models::notification::Notification;
use crate::models::user::User;
use crate::store::{NotificationInbox, TenantRepository};
use crate::tenant::TenantId;
use crate::utils::utc_now;

/// Delivers "approval required" notices.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Returns `Ok(None)` when there is nobody to notify.
    async fn notify_approval_request(
        &self,
        recipient: Option<&User>,
        sender: &Principal,
        kind: EntityKind,
        entity_id: Uuid,
        entity_title: &str,
    ) -> AppResult<Option<Notification>>;
}

/// Dispatcher that records notifications in the store; delivery is the
/// recipient reading their inbox.
pub struct StoreDispatcher<S> {
    store: S,
}

impl<S> StoreDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> NotificationDispatcher for StoreDispatcher<S>
where
    S: TenantRepository<Notification>,
{
    async fn notify_approval_request(
        &self,
        recipient: Option<&User>,
        sender: &Principal,
        kind: EntityKind,
        entity_id: Uuid,
        entity_title: &str,
    ) -> AppResult<Option<Notification>> {
        let Some(recipient) = recipient else {
            tracing::warn!(entity = %kind, %entity_id, "no approver to notify");
            return Ok(None);
        };

        let notification = Notification::approval_request(
            recipient.tenant_id.as_str(),
            kind,
            entity_id,
            entity_title,
            recipient.id,
            Some(sender.user_id),
            &sender.email,
        );
        let saved = self.store.save(&notification).await?;

        tracing::info!(
            notification_id = %saved.id,
            recipient = %recipient.email,
            entity = %kind,
            %entity_id,
            "approval notification created"
        );
        Ok(Some(saved))
    }
}

/// Load a notification owned by `recipient`; anyone else's is not found.
pub async fn find_owned<S>(store: &S, tenant: &TenantId, recipient: &Principal, id: Uuid) -> AppResult<Notification>
where
    S: TenantRepository<Notification>,
{
    store
        .find_by_tenant_and_id(tenant, id)
        .await?
        .filter(|n| n.recipient_id == recipient.user_id)
        .ok_or_else(|| AppError::not_found("notification not found"))
}

pub async fn mark_read<S>(store: &S, tenant: &TenantId, recipient: &Principal, id: Uuid) -> AppResult<Notification>
where
    S: TenantRepository<Notification>,
{
    let mut notification = find_owned(store, tenant, recipient, id).await?;
    if !notification.is_unread() {
        return Ok(notification);
    }
    notification.mark_read(&recipient.email, utc_now());
    store.save(&notification).await
}

pub async fn mark_all_read<S>(store: &S, tenant: &TenantId, recipient: &Principal) -> AppResult<u64>
where
    S: NotificationInbox,
{
    let changed = store
        .mark_all_read(tenant, recipient.user_id, &recipient.email, utc_now())
        .await?;
    tracing::debug!(recipient = %recipient.email, changed, "notifications marked read");
    Ok(changed)
}

pub async fn delete<S>(store: &S, tenant: &TenantId, recipient: &Principal, id: Uuid) -> AppResult<()>
where
    S: TenantRepository<Notification> + NotificationInbox,
{
    find_owned(store, tenant, recipient, id).await?;
    if !store.delete_notification(tenant, id).await? {
        return Err(AppError::not_found("notification not found"));
    }
    Ok(())
}
