use std::sync::Arc;

use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::authz;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::approvals::submit_quote,
		routes::approvals::approve_quote,
		routes::approvals::reject_quote,
		routes::approvals::can_approve_quote,
		routes::approvals::submit_booking,
		routes::approvals::approve_booking,
		routes::approvals::reject_booking,
		routes::approvals::can_approve_booking,
		routes::notifications::list_notifications,
		routes::notifications::list_unread,
		routes::notifications::count_unread,
		routes::notifications::mark_read,
		routes::notifications::mark_all_read,
		routes::notifications::delete_notification,
		routes::settings::list_settings,
		routes::settings::get_setting,
		routes::settings::create_setting,
		routes::settings::update_setting,
		routes::settings::delete_setting,
		routes::settings::initialize_settings,
		routes::settings::setting_value,
		routes::settings::boolean_setting,
		routes::settings::integer_setting,
		routes::users::my_permissions
	),
	components(
		schemas(
			authz::Permission,
			authz::PermissionGroup,
			authz::PermissionSet,
			models::approval::EntityKind,
			models::approval::ApprovalState,
			models::approval::AuditStamp,
			models::approval::RejectRequest,
			models::approval::CanApproveResponse,
			models::quote::Quote,
			models::quote::QuoteItem,
			models::quote::QuoteStatus,
			models::booking::Booking,
			models::booking::BookingStatus,
			models::notification::Notification,
			models::notification::NotificationType,
			models::notification::NotificationStatus,
			models::notification::NotificationPriority,
			models::notification::NotificationCount,
			models::notification::MarkAllReadResponse,
			models::setting::Setting,
			models::setting::SettingType,
			models::setting::CreateSettingRequest,
			models::setting::UpdateSettingRequest,
			models::setting::SettingValue,
			models::setting::BooleanSettingValue,
			models::setting::IntegerSettingValue,
			models::setting::InitializedSettings,
			models::role::EffectivePermissions,
			models::role::PermissionGrant,
			routes::health::HealthResponse
		)
	),
	modifiers(&RequestHeaders),
	tags(
		(name = "Health", description = "Liveness and database status"),
		(name = "Approvals", description = "Quote and booking approval workflow"),
		(name = "Notifications", description = "Recipient notification inbox"),
		(name = "Settings", description = "Per-tenant settings"),
		(name = "Users", description = "Acting user information")
	)
)]
pub struct ApiDoc;

/// Tenant and acting user travel as request headers.
struct RequestHeaders;

impl Modify for RequestHeaders {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		if let Some(components) = openapi.components.as_mut() {
			components.add_security_scheme(
				"userEmail",
				SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-User-Email"))),
			);
			components.add_security_scheme(
				"tenantId",
				SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Tenant-ID"))),
			);
		}
	}
}

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = ApiDoc::openapi();
	doc.servers = Some(vec![Server::new(format!("http://localhost:{}", port))]);
	Ok(doc)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc = Arc::new(doc);
	let json_route = get(move || {
		let doc = Arc::clone(&doc);
		async move { Json((*doc).clone()) }
	});

	Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config))
}
