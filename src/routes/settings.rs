use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::actor::Actor;
use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::setting::{
    bool_or, BooleanSettingValue, CreateSettingRequest, InitializedSettings, IntegerSettingValue, Setting,
    SettingDefaultQuery, SettingValue, SettingsQuery, UpdateSettingRequest,
};
use crate::settings;
use crate::store::SettingsRepository;
use crate::utils::non_blank;

#[utoipa::path(
    get,
    path = "/settings",
    tag = "Settings",
    params(SettingsQuery),
    responses((status = 200, description = "Tenant settings ordered by key", body = [Setting]))
)]
pub async fn list_settings(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<SettingsQuery>,
) -> AppResult<Json<Vec<Setting>>> {
    let category = query.category.as_deref().and_then(non_blank);
    let settings = state.store.list_settings(&actor.tenant.tenant_id, category).await?;
    Ok(Json(settings))
}

#[utoipa::path(
    get,
    path = "/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting", body = Setting),
        (status = 404, description = "No such key in tenant")
    )
)]
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    actor: Actor,
) -> AppResult<Json<Setting>> {
    let setting = settings::find(&state.store, &actor.tenant.tenant_id, &key).await?;
    Ok(Json(setting))
}

#[utoipa::path(
    post,
    path = "/settings",
    tag = "Settings",
    request_body = CreateSettingRequest,
    responses(
        (status = 201, description = "Setting created", body = Setting),
        (status = 400, description = "Blank or duplicate key"),
        (status = 403, description = "Missing MANAGE_COMPANY_SETTINGS")
    )
)]
pub async fn create_setting(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateSettingRequest>,
) -> AppResult<(StatusCode, Json<Setting>)> {
    let setting = settings::create(
        &state.store,
        state.workflow.policy(),
        &actor.tenant.tenant_id,
        &actor.principal,
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(setting)))
}

#[utoipa::path(
    put,
    path = "/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpdateSettingRequest,
    responses(
        (status = 200, description = "Setting updated", body = Setting),
        (status = 400, description = "Setting is not editable"),
        (status = 403, description = "Missing MANAGE_COMPANY_SETTINGS"),
        (status = 404, description = "No such key in tenant")
    )
)]
pub async fn update_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    actor: Actor,
    Json(request): Json<UpdateSettingRequest>,
) -> AppResult<Json<Setting>> {
    let setting = settings::update_value(
        &state.store,
        state.workflow.policy(),
        &actor.tenant.tenant_id,
        &actor.principal,
        &key,
        request.value,
    )
    .await?;
    Ok(Json(setting))
}

#[utoipa::path(
    delete,
    path = "/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 204, description = "Setting deleted"),
        (status = 400, description = "Setting is not editable"),
        (status = 403, description = "Missing MANAGE_COMPANY_SETTINGS"),
        (status = 404, description = "No such key in tenant")
    )
)]
pub async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    actor: Actor,
) -> AppResult<StatusCode> {
    settings::delete(
        &state.store,
        state.workflow.policy(),
        &actor.tenant.tenant_id,
        &actor.principal,
        &key,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/settings/initialize",
    tag = "Settings",
    responses(
        (status = 200, description = "Defaults seeded if the tenant had none", body = InitializedSettings),
        (status = 403, description = "Missing MANAGE_COMPANY_SETTINGS")
    )
)]
pub async fn initialize_settings(State(state): State<AppState>, actor: Actor) -> AppResult<Json<InitializedSettings>> {
    let created = settings::initialize_defaults(
        &state.store,
        state.workflow.policy(),
        &actor.tenant.tenant_id,
        &actor.principal,
    )
    .await?;
    Ok(Json(InitializedSettings { created }))
}

#[utoipa::path(
    get,
    path = "/settings/value/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key"), SettingDefaultQuery),
    responses((status = 200, description = "Stored value or the default", body = SettingValue))
)]
pub async fn setting_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    actor: Actor,
    Query(query): Query<SettingDefaultQuery>,
) -> AppResult<Json<SettingValue>> {
    let value = state
        .store
        .setting_value(&actor.tenant.tenant_id, &key)
        .await?
        .or(query.default);
    Ok(Json(SettingValue { key, value }))
}

#[utoipa::path(
    get,
    path = "/settings/boolean/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key"), SettingDefaultQuery),
    responses((status = 200, description = "Value read as a boolean", body = BooleanSettingValue))
)]
pub async fn boolean_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    actor: Actor,
    Query(query): Query<SettingDefaultQuery>,
) -> AppResult<Json<BooleanSettingValue>> {
    let default = bool_or(query.default.as_deref(), false);
    let value = state.store.setting_bool(&actor.tenant.tenant_id, &key, default).await?;
    Ok(Json(BooleanSettingValue { key, value }))
}

#[utoipa::path(
    get,
    path = "/settings/integer/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key"), SettingDefaultQuery),
    responses(
        (status = 200, description = "Value read as an integer", body = IntegerSettingValue),
        (status = 400, description = "Default is not an integer")
    )
)]
pub async fn integer_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    actor: Actor,
    Query(query): Query<SettingDefaultQuery>,
) -> AppResult<Json<IntegerSettingValue>> {
    let default = match query.default.as_deref().and_then(non_blank) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::validation(format!("default must be an integer, got {raw}")))?,
        None => 0,
    };
    let value = state.store.setting_int(&actor.tenant.tenant_id, &key, default).await?;
    Ok(Json(IntegerSettingValue { key, value }))
}
