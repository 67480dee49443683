mod common;

use anyhow::Result;
use rust_decimal::Decimal;
use uuid::Uuid;

use opsdesk::authz::Principal;
use opsdesk::errors::AppError;
use opsdesk::models::booking::{Booking, BookingStatus};
use opsdesk::models::notification::{NotificationPriority, NotificationStatus, NotificationType};
use opsdesk::models::quote::{Quote, QuoteStatus};
use opsdesk::store::{NotificationInbox, TenantRepository};
use opsdesk::tenant::TenantId;

use common::{seed_booking, seed_company, seed_quote, seed_role, seed_standard_roles, seed_user, setup};

async fn notification_count(pool: &sqlx::SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications")
        .fetch_one(pool)
        .await?)
}

#[tokio::test]
async fn quote_totals_survive_persistence() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let quote = seed_quote(&db.store, &company, "staff@acme.test").await?;

    assert_eq!(quote.items.len(), 2);
    assert_eq!(quote.subtotal, Decimal::new(12500, 2));
    assert_eq!(quote.tax_amount, Decimal::new(1000, 2));
    assert_eq!(quote.total, Decimal::new(13000, 2));
    assert_eq!(quote.status, QuoteStatus::Draft);
    assert_eq!(quote.items[0].description, "Labour");
    Ok(())
}

#[tokio::test]
async fn submit_moves_quote_to_pending_and_notifies_admin() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");

    let submitted = db.workflow().submit_quote(&tenant, quote.id, &Principal::from(&staff)).await?;

    assert_eq!(submitted.status, QuoteStatus::PendingApproval);
    assert!(submitted.approval.approval_required);
    assert!(submitted.approval.approved_by.is_none());
    assert!(submitted.approval.rejection_reason.is_none());
    assert_eq!(submitted.audit.updated_by.as_deref(), Some("staff@acme.test"));

    let inbox = db.store.list_for_recipient(&tenant, admin.id, None).await?;
    assert_eq!(inbox.len(), 1);
    let notice = &inbox[0];
    assert_eq!(notice.notification_type, NotificationType::QuoteApproval);
    assert_eq!(notice.status, NotificationStatus::Unread);
    assert_eq!(notice.priority, NotificationPriority::High);
    assert_eq!(notice.message, "A new quote 'Kitchen refit' requires your approval");
    assert_eq!(notice.action_url, Some(format!("/quote/{}", quote.id)));
    assert_eq!(notice.related_entity_id, Some(quote.id));
    assert_eq!(notice.sender_id, Some(staff.id));
    Ok(())
}

#[tokio::test]
async fn notification_goes_to_first_approver_only() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let first = seed_user(&db.store, "acme", "first@acme.test", &[&admin_role]).await?;
    let second = seed_user(&db.store, "acme", "second@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");

    db.workflow().submit_quote(&tenant, quote.id, &Principal::from(&staff)).await?;

    assert_eq!(db.store.count_for_recipient(&tenant, first.id, None).await?, 1);
    assert_eq!(db.store.count_for_recipient(&tenant, second.id, None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn submit_without_approver_still_succeeds() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (_, staff_role) = seed_standard_roles(&db.store).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;

    let submitted = db
        .workflow()
        .submit_quote(&TenantId::new("acme"), quote.id, &Principal::from(&staff))
        .await?;

    assert_eq!(submitted.status, QuoteStatus::PendingApproval);
    assert_eq!(notification_count(&db.pool).await?, 0);
    Ok(())
}

#[tokio::test]
async fn submit_requires_create_permission() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let viewer_role = seed_role(&db.store, Some("acme"), "VIEWER", &["VIEW_QUOTES"]).await?;
    let viewer = seed_user(&db.store, "acme", "viewer@acme.test", &[&viewer_role]).await?;
    let quote = seed_quote(&db.store, &company, "someone@acme.test").await?;
    let tenant = TenantId::new("acme");

    let err = db
        .workflow()
        .submit_quote(&tenant, quote.id, &Principal::from(&viewer))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    let stored = TenantRepository::<Quote>::find_by_tenant_and_id(&db.store, &tenant, quote.id)
        .await?
        .unwrap();
    assert_eq!(stored.status, QuoteStatus::Draft);
    assert_eq!(notification_count(&db.pool).await?, 0);
    Ok(())
}

#[tokio::test]
async fn approve_records_approver_and_time() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();

    workflow.submit_quote(&tenant, quote.id, &Principal::from(&staff)).await?;
    let approved = workflow.approve_quote(&tenant, quote.id, &Principal::from(&admin)).await?;

    assert_eq!(approved.status, QuoteStatus::Approved);
    assert_eq!(approved.approval.approved_by.as_deref(), Some("admin@acme.test"));
    assert!(approved.approval.approved_at.is_some());
    assert!(approved.approval.rejection_reason.is_none());
    assert_eq!(approved.audit.updated_by.as_deref(), Some("admin@acme.test"));
    Ok(())
}

#[tokio::test]
async fn approve_checks_state_before_permission() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (_, staff_role) = seed_standard_roles(&db.store).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;

    // Draft quote, actor lacks APPROVE_QUOTES: the state error wins.
    let err = db
        .workflow()
        .approve_quote(&TenantId::new("acme"), quote.id, &Principal::from(&staff))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn approve_without_permission_leaves_entity_pending() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (_, staff_role) = seed_standard_roles(&db.store).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();
    let principal = Principal::from(&staff);

    workflow.submit_quote(&tenant, quote.id, &principal).await?;
    let err = workflow.approve_quote(&tenant, quote.id, &principal).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    let stored = workflow.find_quote(&tenant, quote.id).await?;
    assert_eq!(stored.status, QuoteStatus::PendingApproval);
    assert!(stored.approval.approved_by.is_none());
    Ok(())
}

#[tokio::test]
async fn reject_stores_reason_and_blocks_later_approval() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();
    let approver = Principal::from(&admin);

    workflow.submit_quote(&tenant, quote.id, &Principal::from(&staff)).await?;

    let err = workflow.reject_quote(&tenant, quote.id, "   ", &approver).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let rejected = workflow.reject_quote(&tenant, quote.id, "Too expensive", &approver).await?;
    assert_eq!(rejected.status, QuoteStatus::Rejected);
    assert_eq!(rejected.approval.rejection_reason.as_deref(), Some("Too expensive"));
    assert!(rejected.approval.approved_by.is_none());
    assert!(rejected.approval.approved_at.is_none());

    let err = workflow.approve_quote(&tenant, quote.id, &approver).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn resubmission_clears_previous_decision() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();

    workflow.submit_quote(&tenant, quote.id, &Principal::from(&staff)).await?;
    workflow
        .reject_quote(&tenant, quote.id, "Missing VAT number", &Principal::from(&admin))
        .await?;
    let resubmitted = workflow.submit_quote(&tenant, quote.id, &Principal::from(&staff)).await?;

    assert_eq!(resubmitted.status, QuoteStatus::PendingApproval);
    assert!(resubmitted.approval.rejection_reason.is_none());
    assert_eq!(db.store.count_for_recipient(&tenant, admin.id, None).await?, 2);
    Ok(())
}

#[tokio::test]
async fn booking_approval_lands_on_confirmed() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let booking = seed_booking(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();

    let submitted = workflow.submit_booking(&tenant, booking.id, &Principal::from(&staff)).await?;
    assert_eq!(submitted.status, BookingStatus::PendingApproval);

    let inbox = db.store.list_for_recipient(&tenant, admin.id, None).await?;
    assert_eq!(inbox[0].notification_type, NotificationType::BookingApproval);
    assert_eq!(inbox[0].message, "A new booking 'Boiler service' requires your approval");

    let confirmed = workflow.approve_booking(&tenant, booking.id, &Principal::from(&admin)).await?;
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.approval.approved_by.as_deref(), Some("admin@acme.test"));
    Ok(())
}

#[tokio::test]
async fn booking_rejection_records_reason() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let booking = seed_booking(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();

    workflow.submit_booking(&tenant, booking.id, &Principal::from(&staff)).await?;
    let rejected = workflow
        .reject_booking(&tenant, booking.id, "No engineer available", &Principal::from(&admin))
        .await?;

    assert_eq!(rejected.status, BookingStatus::Rejected);
    let stored = TenantRepository::<Booking>::find_by_tenant_and_id(&db.store, &tenant, booking.id)
        .await?
        .unwrap();
    assert_eq!(stored.approval.rejection_reason.as_deref(), Some("No engineer available"));
    Ok(())
}

#[tokio::test]
async fn can_approve_agrees_with_approve() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let admin = Principal::from(&seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?);
    let staff = Principal::from(&seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?);
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();

    let draft = workflow.find_quote(&tenant, quote.id).await?;
    assert!(!workflow.can_approve_quote(&draft, &admin));
    assert!(!workflow.can_approve_quote(&draft, &staff));

    let pending = workflow.submit_quote(&tenant, quote.id, &staff).await?;
    assert!(workflow.can_approve_quote(&pending, &admin));
    assert!(!workflow.can_approve_quote(&pending, &staff));
    assert!(workflow.approve_quote(&tenant, quote.id, &staff).await.is_err());
    assert!(workflow.approve_quote(&tenant, quote.id, &admin).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn unknown_id_is_not_found() -> Result<()> {
    let db = setup().await?;
    seed_company(&db.store, "acme").await?;
    let (admin_role, _) = seed_standard_roles(&db.store).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;

    let err = db
        .workflow()
        .approve_booking(&TenantId::new("acme"), Uuid::new_v4(), &Principal::from(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn approver_role_is_configurable() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let manager_role = seed_role(&db.store, Some("acme"), "MANAGER", &["APPROVE_QUOTES"]).await?;
    let admin = seed_user(&db.store, "acme", "admin@acme.test", &[&admin_role]).await?;
    let manager = seed_user(&db.store, "acme", "manager@acme.test", &[&manager_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");

    db.workflow_with_approver("MANAGER")
        .submit_quote(&tenant, quote.id, &Principal::from(&staff))
        .await?;

    assert_eq!(db.store.count_for_recipient(&tenant, manager.id, None).await?, 1);
    assert_eq!(db.store.count_for_recipient(&tenant, admin.id, None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_approvals_are_last_write_wins() -> Result<()> {
    let db = setup().await?;
    let company = seed_company(&db.store, "acme").await?;
    let (admin_role, staff_role) = seed_standard_roles(&db.store).await?;
    let first = seed_user(&db.store, "acme", "first@acme.test", &[&admin_role]).await?;
    let second = seed_user(&db.store, "acme", "second@acme.test", &[&admin_role]).await?;
    let staff = seed_user(&db.store, "acme", "staff@acme.test", &[&staff_role]).await?;
    let quote = seed_quote(&db.store, &company, &staff.email).await?;
    let tenant = TenantId::new("acme");
    let workflow = db.workflow();

    let pending = workflow.submit_quote(&tenant, quote.id, &Principal::from(&staff)).await?;

    let (first_principal, second_principal) = (Principal::from(&first), Principal::from(&second));
    let (a, b) = tokio::join!(
        workflow.approve_quote(&tenant, quote.id, &first_principal),
        workflow.approve_quote(&tenant, quote.id, &second_principal),
    );

    // No conflict detection: both calls that saw the pending quote succeed. A call
    // scheduled after the other's save sees APPROVED and gets the ordinary state error.
    let mut approvers = Vec::new();
    for result in [a, b] {
        match result {
            Ok(approved) => {
                assert_eq!(approved.status, QuoteStatus::Approved);
                approvers.extend(approved.approval.approved_by);
            }
            Err(err) => assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}"),
        }
    }
    assert!(!approvers.is_empty());

    // The last save wins whole: approver and audit stamp come from the same writer.
    let stored = workflow.find_quote(&tenant, quote.id).await?;
    let approver = stored.approval.approved_by.clone().expect("approved_by set");
    assert!(approvers.contains(&approver), "unexpected approver {approver}");
    assert!(approver == first.email || approver == second.email);

    // A stale copy saved afterwards is not rejected either; it simply overwrites.
    db.store.save(&pending).await?;
    let overwritten = workflow.find_quote(&tenant, quote.id).await?;
    assert_eq!(overwritten.status, QuoteStatus::PendingApproval);
    assert!(overwritten.approval.approved_by.is_none());
    assert_eq!(stored.audit.updated_by.as_deref(), Some(approver.as_str()));
    assert!(stored.approval.approved_at.is_some());
    Ok(())
}
