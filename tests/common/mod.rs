#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;
use uuid::Uuid;

use opsdesk::models::booking::Booking;
use opsdesk::models::company::Company;
use opsdesk::models::quote::{Quote, QuoteItem};
use opsdesk::models::role::{Role, RoleType};
use opsdesk::models::user::User;
use opsdesk::notify::StoreDispatcher;
use opsdesk::store::{SqliteStore, TenantRepository};
use opsdesk::workflow::ApprovalWorkflow;

pub type TestWorkflow = ApprovalWorkflow<SqliteStore, StoreDispatcher<SqliteStore>>;

/// A migrated temp-file database. Keep the value alive for the test's duration.
pub struct TestDb {
    _dir: TempDir,
    pub pool: SqlitePool,
    pub store: SqliteStore,
}

impl TestDb {
    pub fn workflow(&self) -> TestWorkflow {
        self.workflow_with_approver("COMPANY_ADMIN")
    }

    pub fn workflow_with_approver(&self, role: &str) -> TestWorkflow {
        ApprovalWorkflow::new(self.store.clone(), StoreDispatcher::new(self.store.clone()), role)
    }
}

pub async fn setup() -> Result<TestDb> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    let store = SqliteStore::new(pool.clone());
    Ok(TestDb { _dir: dir, pool, store })
}

pub async fn seed_company(store: &SqliteStore, tenant: &str) -> Result<Company> {
    Ok(store.save_company(&Company::new(tenant, format!("{tenant} Ltd"))).await?)
}

pub async fn seed_role(store: &SqliteStore, tenant: Option<&str>, name: &str, permissions: &[&str]) -> Result<Role> {
    let role_type = if tenant.is_none() { RoleType::System } else { RoleType::Custom };
    let role = Role::define(tenant.map(str::to_string), name, None, permissions, role_type)?;
    Ok(store.save_role(&role).await?)
}

/// Global COMPANY_ADMIN and STAFF roles with their usual permissions.
pub async fn seed_standard_roles(store: &SqliteStore) -> Result<(Role, Role)> {
    let admin = seed_role(
        store,
        None,
        "COMPANY_ADMIN",
        &[
            "VIEW_COMPANY_DASHBOARD",
            "MANAGE_COMPANY_USERS",
            "MANAGE_COMPANY_SETTINGS",
            "APPROVE_QUOTES",
            "APPROVE_BOOKINGS",
            "VIEW_NOTIFICATIONS",
            "CREATE_QUOTES",
            "CREATE_BOOKINGS",
            "VIEW_QUOTES",
            "VIEW_BOOKINGS",
        ],
    )
    .await?;
    let staff = seed_role(
        store,
        None,
        "STAFF",
        &["CREATE_QUOTES", "VIEW_QUOTES", "CREATE_BOOKINGS", "VIEW_BOOKINGS"],
    )
    .await?;
    Ok((admin, staff))
}

pub async fn seed_user(store: &SqliteStore, tenant: &str, email: &str, roles: &[&Role]) -> Result<User> {
    let user = store.save_user(&User::new(tenant, email, "Test", "User")).await?;
    for role in roles {
        store.assign_role(user.id, role.id).await?;
    }
    Ok(store.save_user(&user).await?)
}

/// Two items (2 x 50.00, 1 x 25.00), 8% tax, 5.00 discount.
pub async fn seed_quote(store: &SqliteStore, company: &Company, created_by: &str) -> Result<Quote> {
    let mut quote = Quote::draft(company.tenant_id.as_str(), company.id, "Q-1001", "Kitchen refit", created_by);
    quote.set_items(vec![
        QuoteItem::new("Labour", Decimal::new(2, 0), Decimal::new(5000, 2)),
        QuoteItem::new("Materials", Decimal::ONE, Decimal::new(2500, 2)),
    ]);
    quote.set_pricing(Decimal::new(8, 2), Decimal::new(500, 2))?;
    Ok(store.save(&quote).await?)
}

pub async fn seed_booking(store: &SqliteStore, company: &Company, created_by: &str) -> Result<Booking> {
    let booking = Booking::scheduled(
        company.tenant_id.as_str(),
        company.id,
        "B-2001",
        "Boiler service",
        Uuid::new_v4(),
        Utc::now() + Duration::days(3),
        created_by,
    );
    Ok(store.save(&booking).await?)
}

/// Send one request as `user` of `tenant`; returns the status and the JSON body (or null).
pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    tenant: &str,
    user: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-tenant-id", tenant)
        .header("x-user-email", user);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let resp = app.clone().oneshot(builder.body(body)?).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}
