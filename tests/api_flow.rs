mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::util::ServiceExt; // for `oneshot`

use opsdesk::app::{router, AppState};
use opsdesk::authz::{PolicyEvaluator, Principal};
use opsdesk::config::ServiceConfig;
use opsdesk::models::company::CompanyStatus;

use common::{call, seed_booking, seed_company, seed_quote, seed_standard_roles, seed_user, setup};

#[tokio::test]
async fn quote_approval_over_http() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, "staff@acme.test").await?;
    let app = router(AppState::new(db.pool.clone(), ServiceConfig::default()));

    let (status, body) = call(&app, "POST", &format!("/approvals/quotes/{}/submit", quote.id), "acme", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");
    assert_eq!(body["status"], "PENDING_APPROVAL");

    let (status, body) = call(&app, "GET", &format!("/approvals/quotes/{}/can-approve", quote.id), "acme", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_approve"], false);

    let (status, body) = call(&app, "POST", &format!("/approvals/quotes/{}/approve", quote.id), "acme", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = call(&app, "GET", "/notifications/count", "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = call(&app, "GET", &format!("/approvals/quotes/{}/can-approve", quote.id), "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_approve"], true);
    assert_eq!(body["entity_type"], "QUOTE");

    let (status, body) = call(&app, "POST", &format!("/approvals/quotes/{}/approve", quote.id), "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK, "approve failed: {body}");
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["approval"]["approved_by"], "admin@acme.test");
    assert_eq!(body["total"], "130.00");

    let (status, body) = call(&app, "POST", &format!("/approvals/quotes/{}/approve", quote.id), "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_state");
    Ok(())
}

#[tokio::test]
async fn booking_rejection_over_http() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let booking = seed_booking(&db.store, &company, "staff@acme.test").await?;
    let app = router(AppState::new(db.pool.clone(), ServiceConfig::default()));

    let (status, _) = call(&app, "POST", &format!("/approvals/bookings/{}/submit", booking.id), "acme", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/approvals/bookings/{}/reject", booking.id);
    let (status, body) = call(&app, "POST", &uri, "acme", "admin@acme.test", Some(json!({ "reason": "" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = call(&app, "POST", &uri, "acme", "admin@acme.test", Some(json!({ "reason": "Fully booked" }))).await?;
    assert_eq!(status, StatusCode::OK, "reject failed: {body}");
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["approval"]["rejection_reason"], "Fully booked");
    Ok(())
}

#[tokio::test]
async fn notification_inbox_over_http() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, "staff@acme.test").await?;
    let app = router(AppState::new(db.pool.clone(), ServiceConfig::default()));

    call(&app, "POST", &format!("/approvals/quotes/{}/submit", quote.id), "acme", "staff@acme.test", None).await?;

    let (status, body) = call(&app, "GET", "/notifications/unread", "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);
    let id = body[0]["id"].as_str().expect("notification id").to_string();
    assert_eq!(body[0]["notification_type"], "QUOTE_APPROVAL");

    let (status, _) = call(&app, "GET", "/notifications?status=bogus", "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The submitter cannot touch the approver's notification.
    let (status, _) = call(&app, "PUT", &format!("/notifications/{id}/read"), "acme", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "PUT", &format!("/notifications/{id}/read"), "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "READ");

    let (_, body) = call(&app, "GET", "/notifications?status=READ", "acme", "admin@acme.test", None).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = call(&app, "PUT", "/notifications/read-all", "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);

    let (status, _) = call(&app, "DELETE", &format!("/notifications/{id}"), "acme", "admin@acme.test", None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call(&app, "GET", "/notifications", "acme", "admin@acme.test", None).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn effective_permissions_for_actor() -> Result<()> {
    let db = setup().await?;
    seed_company(&db.store, "acme").await?;
    let (_, staff_role) = seed_standard_roles(&db.store).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let state = AppState::new(db.pool.clone(), ServiceConfig::default());
    let expected = state.workflow.policy().user_permissions(Some(&Principal::from(&staff)));
    let app = router(state);

    let (status, body) = call(&app, "GET", "/users/me/permissions", "acme", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"], json!(["STAFF"]));

    let names: Vec<&str> = body["permissions"]
        .as_array()
        .expect("permissions array")
        .iter()
        .filter_map(|p| p["permission"].as_str())
        .collect();
    assert_eq!(names.len(), 4);
    assert_eq!(names.len(), expected.len());
    assert!(expected.iter().all(|p| names.contains(&p.as_str())));
    assert!(names.contains(&"CREATE_QUOTES"));
    assert!(!names.contains(&"APPROVE_QUOTES"));
    assert!(body["permissions"].as_array().unwrap().iter().all(|p| p["group"] == "STAFF"));
    Ok(())
}

#[tokio::test]
async fn request_context_is_enforced() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let mut suspended = seed_company(&db.store, "dormant").await?;
    suspended.status = CompanyStatus::Suspended;
    db.store.save_company(&suspended).await?;
    let (_, staff_role) = seed_standard_roles(&db.store).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let mut inactive = seed_user(&db.store, "acme", "gone@acme.test", &[&staff_role]).await?;
    inactive.status = opsdesk::models::user::UserStatus::Suspended;
    db.store.save_user(&inactive).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let app = router(AppState::new(db.pool.clone(), ServiceConfig::default()));
    let uri = format!("/approvals/quotes/{}/submit", quote.id);

    let (status, _) = call(&app, "POST", &uri, "acme", "nobody@acme.test", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "POST", &uri, "acme", "gone@acme.test", None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "POST", &uri, "dormant", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", &uri, "unknown", "staff@acme.test", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No tenant header and no usable host: unresolvable.
    let req = Request::builder()
        .method("POST")
        .uri(&uri)
        .header("x-user-email", "staff@acme.test")
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Subdomain resolution.
    let req = Request::builder()
        .method("POST")
        .uri(&uri)
        .header("host", "acme.opsdesk.test")
        .header("x-user-email", "staff@acme.test")
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}
