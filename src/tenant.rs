//! Request-scoped tenant resolution.
//!
//! The tenant is resolved once per request by the `TenantContext` extractor
//! and then passed by value through every store and workflow call.

use std::fmt;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppError;
use crate::store::TenantDirectory;

pub const TENANT_HEADER: &str = "x-tenant-id";

const RESERVED_SUBDOMAINS: [&str; 2] = ["www", "api"];

/// Tenant identifier, the isolation key on every stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self(tenant.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Context carried with every tenant-scoped operation of one request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub company_id: Uuid,
}

/// Resolve the tenant from the `X-Tenant-ID` header, then from the first
/// label of the host, then from the configured fallback.
pub fn resolve_tenant(headers: &HeaderMap, fallback: Option<&str>) -> Option<TenantId> {
    let from_header = headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(tenant) = from_header {
        return Some(TenantId::new(tenant));
    }

    let host = headers.get(HOST).and_then(|v| v.to_str().ok());
    if let Some(tenant) = host.and_then(subdomain_of) {
        return Some(TenantId::new(tenant));
    }

    fallback
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(TenantId::new)
}

fn subdomain_of(host: &str) -> Option<&str> {
    let host = host.split(':').next().unwrap_or(host);
    let (label, _) = host.split_once('.')?;
    if label.is_empty() || RESERVED_SUBDOMAINS.contains(&label) {
        return None;
    }
    Some(label)
}

#[async_trait]
impl FromRequestParts<AppState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let tenant_id = resolve_tenant(&parts.headers, state.config.default_tenant.as_deref())
            .ok_or_else(|| AppError::validation("tenant could not be resolved from request"))?;

        let company = state
            .store
            .find_company(&tenant_id)
            .await?
            .filter(|company| company.accepts_requests())
            .ok_or_else(|| AppError::not_found("tenant not found"))?;

        tracing::debug!(tenant = %tenant_id, "tenant resolved");

        Ok(TenantContext {
            tenant_id,
            company_id: company.id,
        })
    }
}
