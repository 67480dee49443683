use axum::extract::State;
use axum::Json;

use crate::actor::Actor;
use crate::app::AppState;
use crate::authz::PolicyEvaluator;
use crate::models::role::EffectivePermissions;

#[utoipa::path(
    get,
    path = "/users/me/permissions",
    tag = "Users",
    responses(
        (status = 200, description = "Actor's roles and effective permissions", body = EffectivePermissions),
        (status = 401, description = "Unknown or missing user")
    )
)]
pub async fn my_permissions(State(state): State<AppState>, actor: Actor) -> Json<EffectivePermissions> {
    let permissions = state.workflow.policy().user_permissions(Some(&actor.principal));
    Json(EffectivePermissions::new(
        actor.user.id,
        actor.user.email.clone(),
        actor.principal.role_names(),
        &permissions,
    ))
}
