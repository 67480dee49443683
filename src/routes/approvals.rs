use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::actor::Actor;
use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::approval::{CanApproveResponse, RejectRequest};
use crate::models::booking::Booking;
use crate::models::quote::Quote;

#[utoipa::path(
    post,
    path = "/approvals/quotes/{id}/submit",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Quote id")),
    responses(
        (status = 200, description = "Quote pending approval", body = Quote),
        (status = 403, description = "Missing CREATE_QUOTES"),
        (status = 404, description = "Quote not found in tenant")
    )
)]
pub async fn submit_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<Quote>> {
    let quote = state
        .workflow
        .submit_quote(&actor.tenant.tenant_id, id, &actor.principal)
        .await?;
    Ok(Json(quote))
}

#[utoipa::path(
    post,
    path = "/approvals/quotes/{id}/approve",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Quote id")),
    responses(
        (status = 200, description = "Quote approved", body = Quote),
        (status = 400, description = "Quote is not pending approval"),
        (status = 403, description = "Missing APPROVE_QUOTES"),
        (status = 404, description = "Quote not found in tenant")
    )
)]
pub async fn approve_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<Quote>> {
    let quote = state
        .workflow
        .approve_quote(&actor.tenant.tenant_id, id, &actor.principal)
        .await?;
    Ok(Json(quote))
}

#[utoipa::path(
    post,
    path = "/approvals/quotes/{id}/reject",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Quote rejected", body = Quote),
        (status = 400, description = "Not pending approval or blank reason"),
        (status = 403, description = "Missing APPROVE_QUOTES"),
        (status = 404, description = "Quote not found in tenant")
    )
)]
pub async fn reject_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<Quote>> {
    let quote = state
        .workflow
        .reject_quote(&actor.tenant.tenant_id, id, &payload.reason, &actor.principal)
        .await?;
    Ok(Json(quote))
}

#[utoipa::path(
    get,
    path = "/approvals/quotes/{id}/can-approve",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Quote id")),
    responses((status = 200, description = "Whether the actor may decide now", body = CanApproveResponse))
)]
pub async fn can_approve_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<CanApproveResponse>> {
    let quote = state.workflow.find_quote(&actor.tenant.tenant_id, id).await?;
    let allowed = state.workflow.can_approve_quote(&quote, &actor.principal);
    Ok(Json(CanApproveResponse::for_entity(&quote, allowed)))
}

#[utoipa::path(
    post,
    path = "/approvals/bookings/{id}/submit",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking pending approval", body = Booking),
        (status = 403, description = "Missing CREATE_BOOKINGS"),
        (status = 404, description = "Booking not found in tenant")
    )
)]
pub async fn submit_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<Booking>> {
    let booking = state
        .workflow
        .submit_booking(&actor.tenant.tenant_id, id, &actor.principal)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/approvals/bookings/{id}/approve",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking confirmed", body = Booking),
        (status = 400, description = "Booking is not pending approval"),
        (status = 403, description = "Missing APPROVE_BOOKINGS"),
        (status = 404, description = "Booking not found in tenant")
    )
)]
pub async fn approve_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<Booking>> {
    let booking = state
        .workflow
        .approve_booking(&actor.tenant.tenant_id, id, &actor.principal)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/approvals/bookings/{id}/reject",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Booking rejected", body = Booking),
        (status = 400, description = "Not pending approval or blank reason"),
        (status = 403, description = "Missing APPROVE_BOOKINGS"),
        (status = 404, description = "Booking not found in tenant")
    )
)]
pub async fn reject_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<Booking>> {
    let booking = state
        .workflow
        .reject_booking(&actor.tenant.tenant_id, id, &payload.reason, &actor.principal)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    get,
    path = "/approvals/bookings/{id}/can-approve",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses((status = 200, description = "Whether the actor may decide now", body = CanApproveResponse))
)]
pub async fn can_approve_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<CanApproveResponse>> {
    let booking = state.workflow.find_booking(&actor.tenant.tenant_id, id).await?;
    let allowed = state.workflow.can_approve_booking(&booking, &actor.principal);
    Ok(Json(CanApproveResponse::for_entity(&booking, allowed)))
}
