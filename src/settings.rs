//! Per-tenant settings: reads are open to any member of the tenant, writes
//! need `MANAGE_COMPANY_SETTINGS` or `SYSTEM_SETTINGS`.

use crate::authz::{PolicyEvaluator, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::setting::{default_settings, CreateSettingRequest, Setting};
use crate::store::{SettingsRepository, TenantRepository};
use crate::tenant::TenantId;
use crate::utils::utc_now;

pub fn ensure_can_manage<P: PolicyEvaluator>(policy: &P, actor: &Principal) -> AppResult<()> {
    if policy.can_manage_settings(Some(actor)) {
        Ok(())
    } else {
        Err(AppError::forbidden("not allowed to manage settings"))
    }
}

pub async fn find<S>(store: &S, tenant: &TenantId, key: &str) -> AppResult<Setting>
where
    S: SettingsRepository,
{
    store
        .find_setting(tenant, key)
        .await?
        .ok_or_else(|| AppError::not_found(format!("setting {key} not found")))
}

fn ensure_editable(setting: &Setting) -> AppResult<()> {
    if setting.editable {
        Ok(())
    } else {
        Err(AppError::invalid_state(format!("setting {} is not editable", setting.key)))
    }
}

pub async fn create<S, P>(
    store: &S,
    policy: &P,
    tenant: &TenantId,
    actor: &Principal,
    request: CreateSettingRequest,
) -> AppResult<Setting>
where
    S: SettingsRepository + TenantRepository<Setting>,
    P: PolicyEvaluator,
{
    ensure_can_manage(policy, actor)?;
    let setting = request.into_setting(tenant.as_str(), &actor.email, utc_now())?;

    if store.find_setting(tenant, &setting.key).await?.is_some() {
        return Err(AppError::validation(format!("setting {} already exists", setting.key)));
    }

    let saved = store.save(&setting).await?;
    tracing::info!(tenant = %tenant, key = %saved.key, actor = %actor.email, "setting created");
    Ok(saved)
}

pub async fn update_value<S, P>(
    store: &S,
    policy: &P,
    tenant: &TenantId,
    actor: &Principal,
    key: &str,
    value: Option<String>,
) -> AppResult<Setting>
where
    S: SettingsRepository + TenantRepository<Setting>,
    P: PolicyEvaluator,
{
    ensure_can_manage(policy, actor)?;
    let mut setting = find(store, tenant, key).await?;
    ensure_editable(&setting)?;

    setting.set_value(value, &actor.email, utc_now());
    let saved = store.save(&setting).await?;
    tracing::info!(tenant = %tenant, key, actor = %actor.email, "setting updated");
    Ok(saved)
}

pub async fn delete<S, P>(store: &S, policy: &P, tenant: &TenantId, actor: &Principal, key: &str) -> AppResult<()>
where
    S: SettingsRepository,
    P: PolicyEvaluator,
{
    ensure_can_manage(policy, actor)?;
    let setting = find(store, tenant, key).await?;
    ensure_editable(&setting)?;

    if !store.delete_setting(tenant, key).await? {
        return Err(AppError::not_found(format!("setting {key} not found")));
    }
    tracing::info!(tenant = %tenant, key, actor = %actor.email, "setting deleted");
    Ok(())
}

/// Seed the default settings when the tenant has none; returns how many were created.
pub async fn seed_defaults<S>(store: &S, tenant: &TenantId, by: &str) -> AppResult<usize>
where
    S: SettingsRepository + TenantRepository<Setting>,
{
    if store.count_settings(tenant).await? > 0 {
        tracing::debug!(tenant = %tenant, "settings already present, defaults skipped");
        return Ok(0);
    }

    let defaults = default_settings(tenant.as_str(), by, utc_now());
    for setting in &defaults {
        store.save(setting).await?;
    }
    tracing::info!(tenant = %tenant, created = defaults.len(), "default settings created");
    Ok(defaults.len())
}

pub async fn initialize_defaults<S, P>(store: &S, policy: &P, tenant: &TenantId, actor: &Principal) -> AppResult<usize>
where
    S: SettingsRepository + TenantRepository<Setting>,
    P: PolicyEvaluator,
{
    ensure_can_manage(policy, actor)?;
    seed_defaults(store, tenant, &actor.email).await
}
