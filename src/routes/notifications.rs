use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::actor::Actor;
use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::notification::{
    MarkAllReadResponse, Notification, NotificationCount, NotificationQuery, NotificationStatus,
};
use crate::notify;
use crate::store::NotificationInbox;

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Actor's notifications, newest first", body = [Notification]),
        (status = 400, description = "Unknown status filter")
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let status = query.status()?;
    let notifications = state
        .store
        .list_for_recipient(&actor.tenant.tenant_id, actor.user.id, status)
        .await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    get,
    path = "/notifications/unread",
    tag = "Notifications",
    responses((status = 200, description = "Unread notifications", body = [Notification]))
)]
pub async fn list_unread(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .store
        .list_for_recipient(&actor.tenant.tenant_id, actor.user.id, Some(NotificationStatus::Unread))
        .await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    get,
    path = "/notifications/count",
    tag = "Notifications",
    responses((status = 200, description = "Unread count", body = NotificationCount))
)]
pub async fn count_unread(State(state): State<AppState>, actor: Actor) -> AppResult<Json<NotificationCount>> {
    let count = state
        .store
        .count_for_recipient(&actor.tenant.tenant_id, actor.user.id, Some(NotificationStatus::Unread))
        .await?;
    Ok(Json(NotificationCount { count }))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Not found for this recipient")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<Notification>> {
    let notification = notify::mark_read(&state.store, &actor.tenant.tenant_id, &actor.principal, id).await?;
    Ok(Json(notification))
}

#[utoipa::path(
    put,
    path = "/notifications/read-all",
    tag = "Notifications",
    responses((status = 200, description = "Unread notifications marked read", body = MarkAllReadResponse))
)]
pub async fn mark_all_read(State(state): State<AppState>, actor: Actor) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = notify::mark_all_read(&state.store, &actor.tenant.tenant_id, &actor.principal).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Not found for this recipient")
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<StatusCode> {
    notify::delete(&state.store, &actor.tenant.tenant_id, &actor.principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
