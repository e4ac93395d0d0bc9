//! Webhook signature verification, payload parsing and reconciler state
//! transitions.

mod common;

use common::*;
use serde_json::json;

use tillpoint::config::StripeSettings;
use tillpoint::handlers::webhooks::reconciler::{
    apply_checkout_completed, apply_invoice_paid, apply_invoice_payment_failed,
    apply_subscription_changed, BillingEvent, SubscriptionState,
};
use tillpoint::handlers::webhooks::stripe::parse_event;
use tillpoint::payments::{InvoiceSubscriptionRef, StripeClient, StripeWebhookEvent};

// ============ Signature verification ============

fn create_test_client() -> StripeClient {
    StripeClient::new(&StripeSettings {
        secret_key: "sk_test_xxx".to_string(),
        webhook_secret: "whsec_test123secret456".to_string(),
        price_monthly: "price_monthly_test".to_string(),
        price_yearly: "price_yearly_test".to_string(),
    })
}

fn current_timestamp() -> String {
    now().to_string()
}

fn compute_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[test]
fn test_valid_signature_accepted() {
    let client = create_test_client();
    let payload = b"{\"type\":\"invoice.paid\"}";
    let timestamp = current_timestamp();
    let signature = compute_signature(payload, "whsec_test123secret456", &timestamp);
    let header = format!("t={},v1={}", timestamp, signature);

    assert!(client.verify_webhook_signature(payload, &header).unwrap());
}

#[test]
fn test_wrong_secret_rejected() {
    let client = create_test_client();
    let payload = b"{\"type\":\"invoice.paid\"}";
    let timestamp = current_timestamp();
    let signature = compute_signature(payload, "wrong_secret", &timestamp);
    let header = format!("t={},v1={}", timestamp, signature);

    assert!(!client.verify_webhook_signature(payload, &header).unwrap());
}

#[test]
fn test_modified_payload_rejected() {
    // The signature covers the raw bytes; any mutation must fail.
    let client = create_test_client();
    let original = b"{\"type\":\"invoice.paid\"}";
    let modified = b"{\"type\":\"invoice.paid\",\"amount\":0}";
    let timestamp = current_timestamp();
    let signature = compute_signature(original, "whsec_test123secret456", &timestamp);
    let header = format!("t={},v1={}", timestamp, signature);

    assert!(!client.verify_webhook_signature(modified, &header).unwrap());
}

#[test]
fn test_old_timestamp_rejected() {
    let client = create_test_client();
    let payload = b"{}";
    let timestamp = (now() - 600).to_string();
    let signature = compute_signature(payload, "whsec_test123secret456", &timestamp);
    let header = format!("t={},v1={}", timestamp, signature);

    assert!(!client.verify_webhook_signature(payload, &header).unwrap());
}

#[test]
fn test_malformed_signature_header_errors() {
    let client = create_test_client();
    assert!(client.verify_webhook_signature(b"{}", "garbage").is_err());
    assert!(client.verify_webhook_signature(b"{}", "t=123").is_err());
    assert!(client.verify_webhook_signature(b"{}", "v1=abc").is_err());
    assert!(client.verify_webhook_signature(b"{}", "").is_err());
}

// ============ Payload parsing ============

fn event(event_type: &str, object: serde_json::Value) -> StripeWebhookEvent {
    serde_json::from_value(json!({ "type": event_type, "data": { "object": object } })).unwrap()
}

#[test]
fn test_parse_checkout_completed() {
    let e = event(
        "checkout.session.completed",
        json!({
            "id": "cs_1",
            "payment_status": "paid",
            "client_reference_id": "tp_usr_a1b2c3d4e5f6789012345678901234ab",
            "customer": "cus_1",
            "subscription": "sub_1",
        }),
    );

    match parse_event(&e).unwrap() {
        BillingEvent::CheckoutCompleted {
            user_id,
            customer_id,
            subscription_id,
        } => {
            assert_eq!(user_id, "tp_usr_a1b2c3d4e5f6789012345678901234ab");
            assert_eq!(customer_id, "cus_1");
            assert_eq!(subscription_id, "sub_1");
        }
        other => panic!("Expected CheckoutCompleted, got {:?}", other),
    }
}

#[test]
fn test_parse_checkout_missing_fields_is_dropped() {
    // Malformed events are acknowledged, not retried.
    let e = event(
        "checkout.session.completed",
        json!({ "id": "cs_1", "payment_status": "paid", "customer": "cus_1" }),
    );
    assert!(matches!(parse_event(&e).unwrap(), BillingEvent::Ignored(_)));
}

#[test]
fn test_parse_unpaid_checkout_is_ignored() {
    let e = event(
        "checkout.session.completed",
        json!({
            "id": "cs_1",
            "payment_status": "unpaid",
            "client_reference_id": "u",
            "customer": "c",
            "subscription": "s",
        }),
    );
    assert!(matches!(parse_event(&e).unwrap(), BillingEvent::Ignored(_)));
}

#[test]
fn test_parse_invoice_top_level_subscription_shape() {
    let e = event(
        "invoice.paid",
        json!({ "id": "in_1", "customer": "cus_1", "subscription": "sub_1" }),
    );

    match parse_event(&e).unwrap() {
        BillingEvent::InvoicePaid {
            subscription_ref,
            customer_id,
        } => {
            assert_eq!(
                subscription_ref,
                InvoiceSubscriptionRef::Direct("sub_1".into())
            );
            assert_eq!(customer_id, "cus_1");
        }
        other => panic!("Expected InvoicePaid, got {:?}", other),
    }
}

#[test]
fn test_parse_invoice_nested_subscription_shape() {
    let e = event(
        "invoice.paid",
        json!({
            "id": "in_1",
            "customer": "cus_1",
            "parent": { "subscription_details": { "subscription": "sub_2" } },
        }),
    );

    match parse_event(&e).unwrap() {
        BillingEvent::InvoicePaid { subscription_ref, .. } => {
            assert_eq!(
                subscription_ref,
                InvoiceSubscriptionRef::Nested("sub_2".into())
            );
        }
        other => panic!("Expected InvoicePaid, got {:?}", other),
    }
}

#[test]
fn test_parse_invoice_without_subscription_is_dropped() {
    let e = event("invoice.paid", json!({ "id": "in_1", "customer": "cus_1" }));
    assert!(matches!(parse_event(&e).unwrap(), BillingEvent::Ignored(_)));
}

#[test]
fn test_parse_payment_failed() {
    let e = event(
        "invoice.payment_failed",
        json!({ "id": "in_1", "customer": "cus_1", "subscription": "sub_1" }),
    );
    assert!(matches!(
        parse_event(&e).unwrap(),
        BillingEvent::InvoicePaymentFailed { .. }
    ));
}

#[test]
fn test_parse_subscription_deleted_forces_canceled() {
    let e = event(
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "status": "active", "current_period_end": 1700000000 }),
    );

    match parse_event(&e).unwrap() {
        BillingEvent::SubscriptionChanged { status, period_end, .. } => {
            assert_eq!(status, "canceled");
            assert_eq!(period_end, Some(1700000000));
        }
        other => panic!("Expected SubscriptionChanged, got {:?}", other),
    }
}

#[test]
fn test_parse_unrecognized_event_is_ignored() {
    let e = event("customer.created", json!({ "id": "cus_1" }));
    assert!(matches!(parse_event(&e).unwrap(), BillingEvent::Ignored(_)));
}

// ============ Reconciler transitions ============

fn trialing_state(end: Option<i64>) -> SubscriptionState {
    SubscriptionState {
        status: "TRIALING".to_string(),
        plan: Some(SubscriptionPlan::Monthly),
        period_end: end,
    }
}

#[test]
fn test_checkout_creates_active_tenant_with_owner() {
    let mut conn = setup_test_db();
    let user = create_test_user(&conn, "buyer@example.com");
    let end = future_timestamp(14);

    apply_checkout_completed(&mut conn, &user.id, "cus_1", "sub_1", &trialing_state(Some(end)))
        .unwrap();

    let memberships = queries::list_memberships_with_tenant(&conn, &user.id).unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].role, TenantRole::Owner);

    let tenant = queries::get_tenant_by_id(&conn, &memberships[0].tenant_id)
        .unwrap()
        .unwrap();
    assert_eq!(tenant.status, TenantStatus::Active);
    assert_eq!(tenant.subscription_status, "TRIALING");
    assert_eq!(tenant.subscription_plan, Some(SubscriptionPlan::Monthly));
    assert_eq!(tenant.subscription_end_date, Some(end));
    assert_eq!(tenant.billing_customer_id.as_deref(), Some("cus_1"));
    assert_eq!(tenant.billing_subscription_id.as_deref(), Some("sub_1"));

    // The purchaser's billing-customer link is stored too.
    let user = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();
    assert_eq!(user.billing_customer_id.as_deref(), Some("cus_1"));
}

#[test]
fn test_checkout_redelivery_creates_no_duplicate_tenant() {
    let mut conn = setup_test_db();
    let user = create_test_user(&conn, "buyer@example.com");
    let state = trialing_state(None);

    apply_checkout_completed(&mut conn, &user.id, "cus_1", "sub_1", &state).unwrap();
    apply_checkout_completed(&mut conn, &user.id, "cus_1", "sub_1", &state).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let memberships = queries::list_memberships_with_tenant(&conn, &user.id).unwrap();
    assert_eq!(memberships.len(), 1);
}

#[test]
fn test_checkout_for_unknown_user_is_dropped() {
    let mut conn = setup_test_db();
    let ack = apply_checkout_completed(
        &mut conn,
        "tp_usr_ffffffffffffffffffffffffffffffff",
        "cus_1",
        "sub_1",
        &trialing_state(None),
    )
    .unwrap();
    assert_eq!(ack, "Unknown user");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_invoice_paid_is_idempotent() {
    let mut conn = setup_test_db();
    let user = create_test_user(&conn, "buyer@example.com");
    provision_test_tenant(&mut conn, &user, "sub_1", "cus_1", "TRIALING", None);

    let end = future_timestamp(30);
    let state = SubscriptionState {
        status: "ACTIVE".to_string(),
        plan: Some(SubscriptionPlan::Monthly),
        period_end: Some(end),
    };

    apply_invoice_paid(&conn, "cus_1", &state).unwrap();
    let first = queries::list_tenants(&conn).unwrap().remove(0);

    apply_invoice_paid(&conn, "cus_1", &state).unwrap();
    let second = queries::list_tenants(&conn).unwrap().remove(0);

    assert_eq!(first.status, TenantStatus::Active);
    assert_eq!(first.subscription_status, "ACTIVE");
    assert_eq!(first.subscription_end_date, Some(end));
    assert_eq!(second.status, first.status);
    assert_eq!(second.subscription_status, first.subscription_status);
    assert_eq!(second.subscription_end_date, first.subscription_end_date);
}

#[test]
fn test_invoice_paid_tolerates_missing_tenant() {
    // Race with checkout-completed still in flight: log and drop.
    let conn = setup_test_db();
    let ack = apply_invoice_paid(&conn, "cus_unknown", &trialing_state(None)).unwrap();
    assert_eq!(ack, "Tenant not found");
}

#[test]
fn test_payment_failure_marks_past_due_without_touching_plan() {
    let mut conn = setup_test_db();
    let user = create_test_user(&conn, "buyer@example.com");
    let tenant = provision_test_tenant(&mut conn, &user, "sub_1", "cus_1", "ACTIVE", None);
    assert_eq!(tenant.subscription_plan, Some(SubscriptionPlan::Monthly));

    apply_invoice_payment_failed(&conn, "sub_1").unwrap();

    let tenant = queries::get_tenant_by_id(&conn, &tenant.id).unwrap().unwrap();
    assert_eq!(tenant.subscription_status, "PAST_DUE");
    assert_eq!(tenant.status, TenantStatus::Inactive);
    assert_eq!(tenant.subscription_plan, Some(SubscriptionPlan::Monthly));
}

#[test]
fn test_payment_failure_is_idempotent() {
    let mut conn = setup_test_db();
    let user = create_test_user(&conn, "buyer@example.com");
    let tenant = provision_test_tenant(&mut conn, &user, "sub_1", "cus_1", "ACTIVE", None);

    apply_invoice_payment_failed(&conn, "sub_1").unwrap();
    apply_invoice_payment_failed(&conn, "sub_1").unwrap();

    let tenant = queries::get_tenant_by_id(&conn, &tenant.id).unwrap().unwrap();
    assert_eq!(tenant.subscription_status, "PAST_DUE");
    assert_eq!(tenant.status, TenantStatus::Inactive);
}

#[test]
fn test_subscription_deleted_deactivates_tenant() {
    let mut conn = setup_test_db();
    let user = create_test_user(&conn, "buyer@example.com");
    let tenant = provision_test_tenant(&mut conn, &user, "sub_1", "cus_1", "ACTIVE", None);

    apply_subscription_changed(&conn, "sub_1", "canceled", None).unwrap();

    let tenant = queries::get_tenant_by_id(&conn, &tenant.id).unwrap().unwrap();
    assert_eq!(tenant.subscription_status, "CANCELED");
    assert_eq!(tenant.status, TenantStatus::Inactive);
}

#[test]
fn test_subscription_updated_reactivates_tenant() {
    let mut conn = setup_test_db();
    let user = create_test_user(&conn, "buyer@example.com");
    let tenant = provision_test_tenant(&mut conn, &user, "sub_1", "cus_1", "PAST_DUE", None);
    assert_eq!(tenant.status, TenantStatus::Inactive);

    let end = future_timestamp(30);
    apply_subscription_changed(&conn, "sub_1", "active", Some(end)).unwrap();

    let tenant = queries::get_tenant_by_id(&conn, &tenant.id).unwrap().unwrap();
    assert_eq!(tenant.subscription_status, "ACTIVE");
    assert_eq!(tenant.status, TenantStatus::Active);
    assert_eq!(tenant.subscription_end_date, Some(end));
}

#[test]
fn test_subscription_change_for_unknown_subscription_is_dropped() {
    let conn = setup_test_db();
    let ack = apply_subscription_changed(&conn, "sub_unknown", "active", None).unwrap();
    assert_eq!(ack, "Tenant not found");
}
