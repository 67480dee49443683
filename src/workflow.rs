//! Submit / approve / reject for quotes and bookings.
//!
//! Every operation loads the entity by tenant and id, checks state and
//! permission, applies the transition together with the audit stamp and
//! saves once. Submission additionally notifies the tenant's approver.

use uuid::Uuid;

use crate::authz::{PolicyEvaluator, Principal, RolePolicyEvaluator};
use crate::errors::{AppError, AppResult};
use crate::models::approval::Approvable;
use crate::models::booking::Booking;
use crate::models::quote::Quote;
use crate::notify::NotificationDispatcher;
use crate::store::{TenantRepository, UserDirectory};
use crate::tenant::TenantId;
use crate::utils::{non_blank, utc_now};

pub struct ApprovalWorkflow<S, D, P = RolePolicyEvaluator> {
    store: S,
    dispatcher: D,
    policy: P,
    approver_role: String,
}

impl<S, D> ApprovalWorkflow<S, D, RolePolicyEvaluator> {
    pub fn new(store: S, dispatcher: D, approver_role: impl Into<String>) -> Self {
        Self::with_policy(store, dispatcher, RolePolicyEvaluator::new(), approver_role)
    }
}

impl<S, D, P> ApprovalWorkflow<S, D, P> {
    pub fn with_policy(store: S, dispatcher: D, policy: P, approver_role: impl Into<String>) -> Self {
        Self {
            store,
            dispatcher,
            policy,
            approver_role: approver_role.into(),
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<S, D, P> ApprovalWorkflow<S, D, P>
where
    S: TenantRepository<Quote> + TenantRepository<Booking> + UserDirectory,
    D: NotificationDispatcher,
    P: PolicyEvaluator,
{
    pub async fn submit_quote(&self, tenant: &TenantId, quote_id: Uuid, actor: &Principal) -> AppResult<Quote> {
        self.submit::<Quote>(tenant, quote_id, actor).await
    }

    pub async fn approve_quote(&self, tenant: &TenantId, quote_id: Uuid, actor: &Principal) -> AppResult<Quote> {
        self.approve::<Quote>(tenant, quote_id, actor).await
    }

    pub async fn reject_quote(
        &self,
        tenant: &TenantId,
        quote_id: Uuid,
        reason: &str,
        actor: &Principal,
    ) -> AppResult<Quote> {
        self.reject::<Quote>(tenant, quote_id, reason, actor).await
    }

    pub async fn submit_booking(&self, tenant: &TenantId, booking_id: Uuid, actor: &Principal) -> AppResult<Booking> {
        self.submit::<Booking>(tenant, booking_id, actor).await
    }

    pub async fn approve_booking(&self, tenant: &TenantId, booking_id: Uuid, actor: &Principal) -> AppResult<Booking> {
        self.approve::<Booking>(tenant, booking_id, actor).await
    }

    pub async fn reject_booking(
        &self,
        tenant: &TenantId,
        booking_id: Uuid,
        reason: &str,
        actor: &Principal,
    ) -> AppResult<Booking> {
        self.reject::<Booking>(tenant, booking_id, reason, actor).await
    }

    pub fn can_approve_quote(&self, quote: &Quote, actor: &Principal) -> bool {
        self.can_approve(quote, actor)
    }

    pub fn can_approve_booking(&self, booking: &Booking, actor: &Principal) -> bool {
        self.can_approve(booking, actor)
    }

    /// True exactly when `approve` would pass its state and permission checks.
    pub fn can_approve<E: Approvable>(&self, entity: &E, actor: &Principal) -> bool {
        self.check_decision(entity, actor).is_ok()
    }

    pub async fn find_quote(&self, tenant: &TenantId, quote_id: Uuid) -> AppResult<Quote> {
        self.load::<Quote>(tenant, quote_id).await
    }

    pub async fn find_booking(&self, tenant: &TenantId, booking_id: Uuid) -> AppResult<Booking> {
        self.load::<Booking>(tenant, booking_id).await
    }

    async fn load<E>(&self, tenant: &TenantId, id: Uuid) -> AppResult<E>
    where
        E: Approvable,
        S: TenantRepository<E>,
    {
        TenantRepository::<E>::find_by_tenant_and_id(&self.store, tenant, id)
            .await?
            .filter(|entity| tenant.matches(entity.tenant_id()))
            .ok_or_else(|| AppError::not_found(format!("{} not found", E::KIND.label())))
    }

    async fn persist<E>(&self, entity: &E) -> AppResult<E>
    where
        E: Approvable,
        S: TenantRepository<E>,
    {
        TenantRepository::<E>::save(&self.store, entity).await
    }

    fn check_decision<E: Approvable>(&self, entity: &E, actor: &Principal) -> AppResult<()> {
        if !entity.is_pending_approval() {
            return Err(AppError::invalid_state(format!(
                "{} is not pending approval (status {})",
                E::KIND.label(),
                entity.status_label()
            )));
        }
        if !self.policy.has_permission(Some(actor), E::KIND.approve_permission()) {
            return Err(AppError::forbidden(format!("not allowed to decide on this {}", E::KIND.label())));
        }
        Ok(())
    }

    async fn submit<E>(&self, tenant: &TenantId, id: Uuid, actor: &Principal) -> AppResult<E>
    where
        E: Approvable,
        S: TenantRepository<E>,
    {
        let mut entity = self.load::<E>(tenant, id).await?;

        if !self.policy.has_permission(Some(actor), E::KIND.submit_permission()) {
            return Err(AppError::forbidden(format!("not allowed to submit this {}", E::KIND.label())));
        }

        entity.enter_pending();
        entity.touch(&actor.email, utc_now());
        let saved = self.persist(&entity).await?;

        tracing::info!(
            entity = %E::KIND,
            id = %saved.id(),
            tenant = %tenant,
            actor = %actor.email,
            "submitted for approval"
        );

        self.notify_approver(tenant, actor, &saved).await;
        Ok(saved)
    }

    async fn approve<E>(&self, tenant: &TenantId, id: Uuid, actor: &Principal) -> AppResult<E>
    where
        E: Approvable,
        S: TenantRepository<E>,
    {
        let mut entity = self.load::<E>(tenant, id).await?;
        self.check_decision(&entity, actor)?;

        let now = utc_now();
        entity.enter_approved(&actor.email, now);
        entity.touch(&actor.email, now);
        let saved = self.persist(&entity).await?;

        tracing::info!(
            entity = %E::KIND,
            id = %saved.id(),
            status = saved.status_label(),
            approver = %actor.email,
            "approved"
        );
        Ok(saved)
    }

    async fn reject<E>(&self, tenant: &TenantId, id: Uuid, reason: &str, actor: &Principal) -> AppResult<E>
    where
        E: Approvable,
        S: TenantRepository<E>,
    {
        let mut entity = self.load::<E>(tenant, id).await?;
        self.check_decision(&entity, actor)?;

        let reason = non_blank(reason).ok_or_else(|| AppError::validation("rejection reason must not be empty"))?;

        entity.enter_rejected(reason);
        entity.touch(&actor.email, utc_now());
        let saved = self.persist(&entity).await?;

        tracing::info!(
            entity = %E::KIND,
            id = %saved.id(),
            approver = %actor.email,
            reason,
            "rejected"
        );
        Ok(saved)
    }

    /// Best effort: the submission is already persisted, so failures here
    /// are logged and swallowed.
    async fn notify_approver<E: Approvable>(&self, tenant: &TenantId, actor: &Principal, entity: &E) {
        let approvers = match self.store.find_users_by_tenant_and_role(tenant, &self.approver_role).await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!(error = %err, tenant = %tenant, "approver lookup failed");
                return;
            }
        };

        let recipient = approvers.first();
        if let Err(err) = self
            .dispatcher
            .notify_approval_request(recipient, actor, E::KIND, entity.id(), entity.title())
            .await
        {
            tracing::error!(
                error = %err,
                entity = %E::KIND,
                id = %entity.id(),
                "failed to record approval notification"
            );
        }
    }
}
