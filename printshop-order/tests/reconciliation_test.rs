mod common;

use common::{address, design, paid_order, Cdn, Harness, MockFulfillment, MockNotifier};
use printshop_core::fulfillment::{FulfillmentOrder, PrintFileType, StitchColor};
use printshop_core::ProviderError;
use printshop_order::{
    ArtifactRejection, CancellationOutcome, DesignSnapshot, GatewayError, ItemRejection, OrderItem, OrderStatus,
    PaymentError, ReconcileError, ReconcileFailure, ReconcileOutcome, CANCELLATION_REASON,
};
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_paid_order_is_submitted() {
    let h = Harness::new();
    h.repo.insert(paid_order(100, "ORD-100")).await;

    let outcome = h.reconciler.reconcile(100).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Submitted { fulfillment_order_id: "FUL-1".into(), skipped: vec![] }
    );

    let order = h.stored(100).await;
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.fulfillment_order_id.as_deref(), Some("FUL-1"));
    assert_eq!(order.reconcile_attempts, 1);

    let submission = h.fulfillment.last_submission();
    assert_eq!(submission.external_id, "ORD-100");
    assert_eq!(submission.recipient, address(Some("ada@example.com")));
    assert_eq!(submission.retail_costs.subtotal, dec!(24.00));
    assert_eq!(submission.retail_costs.total, dec!(31.99));
    assert_eq!(submission.retail_costs.currency, "USD");

    let item = &submission.items[0];
    assert_eq!(item.variant_id, "4011");
    assert_eq!(item.files[0].url, "https://cdn.example.com/designs/7/front.png");
    assert_eq!(item.files[0].file_type, PrintFileType::Default);
    assert_eq!(item.options.size, "M");
    assert_eq!(item.options.stitch_color, StitchColor::White);
}

/// Order #100: one black 4012 tee in M printed from `d/1/front.png`
fn black_tee_order() -> printshop_order::Order {
    let mut order = paid_order(100, "ORD-100");
    order.items = vec![OrderItem::new(1000, 100, "4012", "M", "Black", 1, dec!(24.00))
        .with_design(design(1, Some("d/1/front.png")))];
    order
}

#[tokio::test]
async fn test_black_tee_on_available_variant_goes_to_processing() {
    let mut catalog = MockFulfillment::new();
    catalog.set_variant("4012", false, true);
    let h = Harness::with_catalog(catalog);
    h.fulfillment.push_create_result(Ok(FulfillmentOrder { id: "FUL-1".into(), status: "pending".into() }));
    h.repo.insert(black_tee_order()).await;

    let outcome = h.reconciler.reconcile(100).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Submitted { fulfillment_order_id: "FUL-1".into(), skipped: vec![] }
    );

    let order = h.stored(100).await;
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.fulfillment_order_id.as_deref(), Some("FUL-1"));

    let item = &h.fulfillment.last_submission().items[0];
    assert_eq!(item.variant_id, "4012");
    assert_eq!(item.files[0].url, "https://cdn.example.com/d/1/front.png");
    assert_eq!(item.options.size, "M");
    assert_eq!(item.options.color, "Black");
    assert_eq!(item.options.stitch_color, StitchColor::Black);
}

#[tokio::test]
async fn test_black_tee_on_discontinued_variant_parks_order() {
    let h = Harness::new();
    h.repo.insert(black_tee_order()).await;

    let outcome = h.reconciler.reconcile(100).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Failed { failure: ReconcileFailure::NoValidItems, .. }));
    assert_eq!(h.fulfillment.creates(), 0);

    let order = h.stored(100).await;
    assert_eq!(order.status, OrderStatus::Error);
    assert!(order.notes.unwrap_or_default().contains("No valid items"));
}

#[tokio::test]
async fn test_dispatch_happens_at_most_once() {
    let h = Harness::new();
    h.repo.insert(paid_order(100, "ORD-100")).await;

    h.reconciler.reconcile(100).await.unwrap();
    let second = h.reconciler.reconcile(100).await;

    assert!(matches!(
        second,
        Err(ReconcileError::InvalidState { status: OrderStatus::Processing, .. })
    ));
    assert_eq!(h.fulfillment.creates(), 1);
}

#[tokio::test]
async fn test_recorded_fulfillment_id_is_queried_not_resubmitted() {
    let h = Harness::new();
    let mut order = paid_order(102, "ORD-102");
    order.fulfillment_order_id = Some("FUL-9".into());
    h.repo.insert(order).await;
    *h.fulfillment.remote_status.lock().unwrap() = "fulfilled".into();

    let outcome = h.reconciler.reconcile(102).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::AlreadyReconciled {
            fulfillment_order_id: "FUL-9".into(),
            provider_status: Some("fulfilled".into()),
        }
    );
    assert_eq!(h.fulfillment.creates(), 0);
    assert_eq!(h.fulfillment.status_calls.load(Ordering::SeqCst), 1);

    let stored = h.stored(102).await;
    assert_eq!(stored.status, OrderStatus::Shipped);
    assert!(stored.check_invariants().is_ok());
}

#[tokio::test]
async fn test_discontinued_variant_leaves_no_valid_items() {
    let h = Harness::new();
    let mut order = paid_order(103, "ORD-103");
    order.items[0].variant_id = "4012".into();
    h.repo.insert(order).await;

    let outcome = h.reconciler.reconcile(103).await.unwrap();
    match outcome {
        ReconcileOutcome::Failed { failure, skipped } => {
            assert_eq!(failure, ReconcileFailure::NoValidItems);
            assert_eq!(skipped.len(), 1);
            assert_eq!(
                skipped[0].rejection,
                ItemRejection::VariantInvalid {
                    variant_id: "4012".into(),
                    reason: "variant discontinued".into()
                }
            );
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let stored = h.stored(103).await;
    assert_eq!(stored.status, OrderStatus::Error);
    assert!(stored.notes.unwrap_or_default().contains("No valid items"));
    assert_eq!(h.fulfillment.creates(), 0);
}

#[tokio::test]
async fn test_order_without_design_artifact_is_parked() {
    let h = Harness::new();
    let mut order = paid_order(104, "ORD-104");
    order.items[0].design = Some(design(7, None));
    h.repo.insert(order).await;

    let outcome = h.reconciler.reconcile(104).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Failed { failure: ReconcileFailure::NoArtifact, .. }));
    assert_eq!(h.stored(104).await.status, OrderStatus::Error);
    assert_eq!(h.fulfillment.creates(), 0);
}

#[tokio::test]
async fn test_invalid_items_are_skipped_and_the_rest_submitted() {
    let h = Harness::new();
    let mut order = paid_order(105, "ORD-105");
    order.add_item(OrderItem::new(2, 105, "", "L", "Black", 1, dec!(20)));
    order.add_item(
        OrderItem::new(3, 105, "4017", "", "Black", 1, dec!(20))
            .with_design(design(8, Some("designs/8/front.png"))),
    );
    order.add_item(
        OrderItem::new(4, 105, "4017", "XL", "", 2, dec!(20)).with_snapshot(DesignSnapshot {
            print_file_url: Some("https://cdn.example.com/designs/9/back-print.png".into()),
            ..Default::default()
        }),
    );
    h.repo.insert(order).await;

    let outcome = h.reconciler.reconcile(105).await.unwrap();
    let ReconcileOutcome::Submitted { skipped, .. } = outcome else {
        panic!("expected submission");
    };
    let rejections: Vec<_> = skipped.iter().map(|s| (s.item_id, s.rejection.clone())).collect();
    assert_eq!(rejections, vec![(2, ItemRejection::MissingVariant), (3, ItemRejection::MissingSize)]);

    let submission = h.fulfillment.last_submission();
    assert_eq!(submission.items.len(), 2);
    let snapshot_item = &submission.items[1];
    assert_eq!(snapshot_item.options.color, "Default");
    assert_eq!(snapshot_item.options.stitch_color, StitchColor::Black);
    assert_eq!(snapshot_item.files[0].file_type, PrintFileType::Back);

    let notes = h.stored(105).await.notes.unwrap_or_default();
    assert!(notes.contains("Item 2 skipped: missing variant id"));
}

#[tokio::test]
async fn test_localhost_artifact_is_rejected() {
    let h = Harness::with(MockNotifier::default(), Cdn("http://localhost:8000/storage"));
    h.repo.insert(paid_order(106, "ORD-106")).await;

    let outcome = h.reconciler.reconcile(106).await.unwrap();
    match outcome {
        ReconcileOutcome::Failed { failure, skipped } => {
            assert_eq!(failure, ReconcileFailure::NoValidItems);
            assert!(matches!(
                skipped[0].rejection,
                ItemRejection::Artifact(ArtifactRejection::PrivateHost(_))
            ));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(h.fulfillment.creates(), 0);
}

#[tokio::test]
async fn test_retry_after_transient_failure_dispatches_once() {
    let h = Harness::new();
    h.repo.insert(paid_order(107, "ORD-107")).await;
    h.fulfillment
        .push_create_result(Err(ProviderError::Api { status: 503, message: "busy".into() }));

    let first = h.reconciler.reconcile(107).await.unwrap();
    let ReconcileOutcome::Failed { failure: ReconcileFailure::Gateway(e), .. } = first else {
        panic!("expected gateway failure");
    };
    assert!(e.is_transient());

    let parked = h.stored(107).await;
    assert_eq!(parked.status, OrderStatus::Error);
    assert!(parked.fulfillment_order_id.is_none());
    assert_eq!(h.payments.refund_count(), 0);

    h.fulfillment
        .push_create_result(Ok(FulfillmentOrder { id: "FUL-2".into(), status: "draft".into() }));
    let second = h.reconciler.reconcile(107).await.unwrap();
    assert!(matches!(second, ReconcileOutcome::Submitted { ref fulfillment_order_id, .. } if fulfillment_order_id == "FUL-2"));

    let retried = h.stored(107).await;
    assert_eq!(retried.status, OrderStatus::Processing);
    assert_eq!(retried.reconcile_attempts, 2);
    assert_eq!(h.fulfillment.creates(), 2);

    assert!(h.reconciler.reconcile(107).await.is_err());
    assert_eq!(h.fulfillment.creates(), 2);
}

#[tokio::test]
async fn test_malformed_create_response_parks_order() {
    let h = Harness::new();
    h.repo.insert(paid_order(108, "ORD-108")).await;
    h.fulfillment
        .push_create_result(Ok(FulfillmentOrder { id: "".into(), status: "draft".into() }));

    let outcome = h.reconciler.reconcile(108).await.unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Failed { failure: ReconcileFailure::Gateway(GatewayError::Malformed(_)), .. }
    ));
    assert_eq!(h.stored(108).await.status, OrderStatus::Error);
}

#[tokio::test]
async fn test_reconcile_rejects_unknown_and_pending_orders() {
    let h = Harness::new();
    let mut pending = paid_order(109, "ORD-109");
    pending.status = OrderStatus::Pending;
    h.repo.insert(pending).await;

    assert!(matches!(h.reconciler.reconcile(404).await, Err(ReconcileError::NotFound(404))));
    assert!(matches!(
        h.reconciler.reconcile(109).await,
        Err(ReconcileError::InvalidState { status: OrderStatus::Pending, .. })
    ));
}

#[tokio::test]
async fn test_cancel_and_refund_via_session() {
    let h = Harness::new();
    let mut order = paid_order(101, "ORD-101");
    order.status = OrderStatus::Error;
    order.payment_session_id = Some("sess_1".into());
    h.repo.insert(order).await;

    let outcome = h.reconciler.cancel_and_refund(101).await.unwrap();
    assert_eq!(outcome, CancellationOutcome::Refunded { refund_id: Some("re_1".into()), notified: true });

    let stored = h.stored(101).await;
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert_eq!(stored.cancellation_reason.as_deref(), Some(CANCELLATION_REASON));
    assert!(stored.cancelled_at.is_some());

    assert_eq!(*h.payments.refunds.lock().unwrap(), vec![("pi_1".to_string(), Some(3199))]);
    assert_eq!(h.notifier.sent_count(), 1);
    let notice = h.notifier.sent.lock().unwrap()[0].clone();
    assert_eq!(notice.recipient_email, "ada@example.com");
    assert_eq!(notice.refunded_amount, dec!(31.99));
}

#[tokio::test]
async fn test_second_refund_is_rejected() {
    let h = Harness::new();
    let mut order = paid_order(110, "ORD-110");
    order.status = OrderStatus::Error;
    order.payment_intent_id = Some("pi_7".into());
    h.repo.insert(order).await;

    h.reconciler.cancel_and_refund(110).await.unwrap();
    let second = h.reconciler.cancel_and_refund(110).await;

    assert!(matches!(
        second,
        Err(ReconcileError::InvalidState { status: OrderStatus::Cancelled, .. })
    ));
    assert_eq!(h.payments.refund_count(), 1);
    assert_eq!(h.notifier.sent_count(), 1);
}

#[tokio::test]
async fn test_cancel_requires_payment_reference() {
    let h = Harness::new();
    let mut order = paid_order(111, "ORD-111");
    order.status = OrderStatus::Error;
    h.repo.insert(order).await;

    let result = h.reconciler.cancel_and_refund(111).await;
    assert!(matches!(
        result,
        Err(ReconcileError::Payment(PaymentError::MissingPaymentReference { .. }))
    ));
    assert_eq!(h.stored(111).await.status, OrderStatus::Error);
    assert_eq!(h.payments.session_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_rejects_dispatched_order() {
    let h = Harness::new();
    let mut order = paid_order(112, "ORD-112");
    order.fulfillment_order_id = Some("FUL-3".into());
    order.payment_intent_id = Some("pi_3".into());
    h.repo.insert(order).await;

    assert!(matches!(
        h.reconciler.cancel_and_refund(112).await,
        Err(ReconcileError::InvalidState { .. })
    ));
    assert_eq!(h.payments.refund_count(), 0);
}

#[tokio::test]
async fn test_refund_failure_keeps_order_in_error() {
    let h = Harness::new();
    let mut order = paid_order(113, "ORD-113");
    order.payment_intent_id = Some("pi_4".into());
    h.repo.insert(order).await;
    *h.payments.refund_error.lock().unwrap() =
        Some(ProviderError::Api { status: 400, message: "charge already refunded".into() });

    let outcome = h.reconciler.cancel_and_refund(113).await.unwrap();
    assert!(matches!(outcome, CancellationOutcome::RefundFailed { .. }));

    let stored = h.stored(113).await;
    assert_eq!(stored.status, OrderStatus::Error);
    assert!(stored.notes.unwrap_or_default().contains("charge already refunded"));
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn test_notification_failure_is_not_fatal() {
    let h = Harness::with(MockNotifier { fail: true, ..Default::default() }, Cdn("https://cdn.example.com"));
    let mut order = paid_order(114, "ORD-114");
    order.payment_intent_id = Some("pi_5".into());
    h.repo.insert(order).await;

    let outcome = h.reconciler.cancel_and_refund(114).await.unwrap();
    assert!(matches!(outcome, CancellationOutcome::Refunded { notified: false, .. }));
    assert_eq!(h.stored(114).await.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_missing_email_skips_notification() {
    let h = Harness::new();
    let mut order = paid_order(115, "ORD-115");
    order.payment_intent_id = Some("pi_6".into());
    order.shipping_address.email = None;
    h.repo.insert(order).await;

    let outcome = h.reconciler.cancel_and_refund(115).await.unwrap();
    assert!(matches!(outcome, CancellationOutcome::Refunded { notified: false, .. }));
    assert_eq!(h.notifier.sent_count(), 0);
}
