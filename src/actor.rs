use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppError;
use crate::models::user::User;
use crate::store::UserDirectory;
use crate::tenant::TenantContext;

pub const USER_HEADER: &str = "x-user-email";

/// The user acting on a request, resolved inside the request's tenant.
///
/// Identity is asserted by the fronting gateway through `X-User-Email`;
/// this service does not authenticate.
#[derive(Debug, Clone)]
pub struct Actor {
    pub tenant: TenantContext,
    pub user: User,
    pub principal: Principal,
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let tenant = TenantContext::from_request_parts(parts, state).await?;

        let email = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::unauthorized("X-User-Email header missing"))?;

        let user = state
            .store
            .find_user_by_email(&tenant.tenant_id, email)
            .await?
            .ok_or_else(|| AppError::unauthorized("unknown user"))?;

        if !user.is_active() {
            tracing::warn!(user = %user.email, status = %user.status, "inactive user rejected");
            return Err(AppError::forbidden("user account is not active"));
        }

        let principal = Principal::from(&user);
        Ok(Actor { tenant, user, principal })
    }
}
