use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::errors::AppError;
use crate::notify::StoreDispatcher;
use crate::routes::{approvals, health, notifications, settings, users};
use crate::store::SqliteStore;
use crate::workflow::ApprovalWorkflow;

pub type Workflow = ApprovalWorkflow<SqliteStore, StoreDispatcher<SqliteStore>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub store: SqliteStore,
    pub workflow: Arc<Workflow>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: ServiceConfig) -> Self {
        let store = SqliteStore::new(pool.clone());
        let workflow = ApprovalWorkflow::new(
            store.clone(),
            StoreDispatcher::new(store.clone()),
            config.approver_role.clone(),
        );
        Self {
            pool,
            store,
            workflow: Arc::new(workflow),
            config: Arc::new(config),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = ServiceConfig::from_env()?;
    Ok(router(AppState::new(pool, config)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let approval_routes = Router::new()
        .route("/quotes/:id/submit", post(approvals::submit_quote))
        .route("/quotes/:id/approve", post(approvals::approve_quote))
        .route("/quotes/:id/reject", post(approvals::reject_quote))
        .route("/quotes/:id/can-approve", get(approvals::can_approve_quote))
        .route("/bookings/:id/submit", post(approvals::submit_booking))
        .route("/bookings/:id/approve", post(approvals::approve_booking))
        .route("/bookings/:id/reject", post(approvals::reject_booking))
        .route("/bookings/:id/can-approve", get(approvals::can_approve_booking));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/unread", get(notifications::list_unread))
        .route("/count", get(notifications::count_unread))
        .route("/read-all", put(notifications::mark_all_read))
        .route("/:id/read", put(notifications::mark_read))
        .route("/:id", delete(notifications::delete_notification));

    let settings_routes = Router::new()
        .route("/", get(settings::list_settings).post(settings::create_setting))
        .route("/initialize", post(settings::initialize_settings))
        .route("/value/:key", get(settings::setting_value))
        .route("/boolean/:key", get(settings::boolean_setting))
        .route("/integer/:key", get(settings::integer_setting))
        .route(
            "/:key",
            get(settings::get_setting)
                .put(settings::update_setting)
                .delete(settings::delete_setting),
        );

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/approvals", approval_routes)
        .nest("/notifications", notification_routes)
        .nest("/settings", settings_routes)
        .route("/users/me/permissions", get(users::my_permissions))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
