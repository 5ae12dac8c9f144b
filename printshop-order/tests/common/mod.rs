#![allow(dead_code)]

use async_trait::async_trait;
use printshop_catalog::VariantValidator;
use printshop_core::fulfillment::{
    CatalogVariant, FulfillmentOrder, FulfillmentSubmission, ShippingRate, ShippingRateRequest,
};
use printshop_core::payment::{
    CheckoutSession, CheckoutSessionRequest, PaymentIntent, PaymentIntentRequest, Refund, RefundStatus,
};
use printshop_core::{
    CancellationNotice, FulfillmentProvider, Notifier, ObjectStorage, PaymentProvider, ProviderError, ProviderResult,
    ShippingAddress,
};
use printshop_order::{
    ArtifactResolver, Design, FulfillmentGateway, InMemoryOrderRepository, Order, OrderItem, OrderReconciler,
    OrderStatus, PaymentGateway,
};
use printshop_shared::Masked;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct MockFulfillment {
    pub variants: HashMap<String, CatalogVariant>,
    pub create_results: Mutex<VecDeque<ProviderResult<FulfillmentOrder>>>,
    pub submissions: Mutex<Vec<FulfillmentSubmission>>,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub remote_status: Mutex<String>,
}

impl MockFulfillment {
    pub fn new() -> Self {
        let mut variants = HashMap::new();
        for (id, discontinued, enabled) in [("4011", false, true), ("4017", false, true), ("4012", true, true), ("4099", false, false)] {
            variants.insert(
                id.to_string(),
                CatalogVariant { id: id.to_string(), name: format!("Tee {}", id), discontinued, enabled },
            );
        }
        Self {
            variants,
            create_results: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            remote_status: Mutex::new("pending".to_string()),
        }
    }

    /// Replace the catalog entry for `id`
    pub fn set_variant(&mut self, id: &str, discontinued: bool, enabled: bool) {
        self.variants.insert(
            id.to_string(),
            CatalogVariant { id: id.to_string(), name: format!("Tee {}", id), discontinued, enabled },
        );
    }

    /// Queue the answer for the next create_order; defaults to FUL-1
    pub fn push_create_result(&self, result: ProviderResult<FulfillmentOrder>) {
        self.create_results.lock().unwrap().push_back(result);
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn last_submission(&self) -> FulfillmentSubmission {
        self.submissions.lock().unwrap().last().cloned().expect("no submission recorded")
    }
}

#[async_trait]
impl FulfillmentProvider for MockFulfillment {
    async fn get_variant(&self, variant_id: &str) -> ProviderResult<Option<CatalogVariant>> {
        Ok(self.variants.get(variant_id).cloned())
    }

    async fn create_order(&self, submission: &FulfillmentSubmission) -> ProviderResult<FulfillmentOrder> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push(submission.clone());
        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FulfillmentOrder { id: "FUL-1".into(), status: "draft".into() }))
    }

    async fn get_order(&self, fulfillment_order_id: &str) -> ProviderResult<FulfillmentOrder> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FulfillmentOrder {
            id: fulfillment_order_id.to_string(),
            status: self.remote_status.lock().unwrap().clone(),
        })
    }

    async fn shipping_rates(&self, request: &ShippingRateRequest) -> ProviderResult<Vec<ShippingRate>> {
        Ok(vec![ShippingRate {
            id: "STANDARD".into(),
            name: "Flat Rate".into(),
            rate: dec!(4.99) * rust_decimal::Decimal::from(request.items.len() as i64),
            currency: request.currency.clone(),
            min_delivery_days: Some(3),
            max_delivery_days: Some(7),
        }])
    }
}

pub struct MockPayments {
    pub sessions: HashMap<String, String>,
    pub refunds: Mutex<Vec<(String, Option<i64>)>>,
    pub refund_error: Mutex<Option<ProviderError>>,
    pub session_lookups: AtomicUsize,
}

impl MockPayments {
    pub fn new() -> Self {
        let mut sessions = HashMap::new();
        sessions.insert("sess_1".to_string(), "pi_1".to_string());
        Self {
            sessions,
            refunds: Mutex::new(Vec::new()),
            refund_error: Mutex::new(None),
            session_lookups: AtomicUsize::new(0),
        }
    }

    pub fn refund_count(&self) -> usize {
        self.refunds.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentProvider for MockPayments {
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> ProviderResult<PaymentIntent> {
        Err(ProviderError::Api { status: 400, message: format!("unexpected intent for {}", request.order_number) })
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> ProviderResult<PaymentIntent> {
        Err(ProviderError::NotFound(intent_id.to_string()))
    }

    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> ProviderResult<CheckoutSession> {
        Err(ProviderError::Api { status: 400, message: format!("unexpected session for {}", request.order_number) })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> ProviderResult<CheckoutSession> {
        self.session_lookups.fetch_add(1, Ordering::SeqCst);
        let intent = self
            .sessions
            .get(session_id)
            .ok_or_else(|| ProviderError::NotFound(session_id.to_string()))?;
        Ok(CheckoutSession {
            id: session_id.to_string(),
            url: None,
            payment_intent: Some(intent.clone()),
            payment_status: Some("paid".into()),
        })
    }

    async fn create_refund(&self, intent_id: &str, amount: Option<i64>) -> ProviderResult<Refund> {
        if let Some(e) = self.refund_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.refunds.lock().unwrap().push((intent_id.to_string(), amount));
        Ok(Refund {
            id: format!("re_{}", self.refund_count()),
            payment_intent: Some(intent_id.to_string()),
            amount: amount.unwrap_or_default(),
            currency: "usd".into(),
            status: RefundStatus::Succeeded,
        })
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<CancellationNotice>>,
    pub fail: bool,
}

impl MockNotifier {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_cancellation(&self, notice: &CancellationNotice) -> ProviderResult<()> {
        self.sent.lock().unwrap().push(notice.clone());
        if self.fail {
            return Err(ProviderError::Transport("mail relay unreachable".into()));
        }
        Ok(())
    }
}

/// Storage serving from a fixed base URL
pub struct Cdn(pub &'static str);

impl ObjectStorage for Cdn {
    fn public_url(&self, path: &str) -> Option<String> {
        Some(format!("{}/{}", self.0.trim_end_matches('/'), path.trim_start_matches('/')))
    }
}

pub struct Harness {
    pub repo: Arc<InMemoryOrderRepository>,
    pub fulfillment: Arc<MockFulfillment>,
    pub payments: Arc<MockPayments>,
    pub notifier: Arc<MockNotifier>,
    pub reconciler: OrderReconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MockNotifier::default(), Cdn("https://cdn.example.com"))
    }

    pub fn with(notifier: MockNotifier, storage: Cdn) -> Self {
        Self::build(MockFulfillment::new(), notifier, storage)
    }

    pub fn with_catalog(fulfillment: MockFulfillment) -> Self {
        Self::build(fulfillment, MockNotifier::default(), Cdn("https://cdn.example.com"))
    }

    fn build(fulfillment: MockFulfillment, notifier: MockNotifier, storage: Cdn) -> Self {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let fulfillment = Arc::new(fulfillment);
        let payments = Arc::new(MockPayments::new());
        let notifier = Arc::new(notifier);
        let timeout = Duration::from_millis(500);

        let validator = VariantValidator::new(fulfillment.clone(), timeout);
        let reconciler = OrderReconciler::new(
            repo.clone(),
            Arc::new(FulfillmentGateway::new(fulfillment.clone(), validator, timeout)),
            Arc::new(PaymentGateway::new(payments.clone(), timeout)),
            notifier.clone(),
            ArtifactResolver::new(Arc::new(storage)),
        );
        Self { repo, fulfillment, payments, notifier, reconciler }
    }

    pub async fn stored(&self, id: i64) -> Order {
        use printshop_order::OrderRepository;
        self.repo.get_order(id).await.unwrap().expect("order stored")
    }
}

pub fn design(id: i64, front: Option<&str>) -> Design {
    Design {
        id,
        user_id: 1,
        name: format!("Design {}", id),
        canvas_state: serde_json::json!({"objects": []}),
        front_image_path: front.map(String::from),
        back_image_path: None,
    }
}

pub fn address(email: Option<&str>) -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".into(),
        address1: "1 Analytical Way".into(),
        city: "London".into(),
        zip: "N1 9GU".into(),
        country_code: "GB".into(),
        email: email.map(Masked::from),
        ..Default::default()
    }
}

/// A paid order with one printable item on variant `4011`
pub fn paid_order(id: i64, order_number: &str) -> Order {
    let mut order = Order::new(id, order_number, "USD");
    order.shipping_address = address(Some("ada@example.com"));
    order.add_item(
        OrderItem::new(id * 10, id, "4011", "M", "White", 1, dec!(24.00))
            .with_design(design(7, Some("designs/7/front.png"))),
    );
    order.shipping = dec!(4.99);
    order.tax = dec!(3.00);
    order.total = order.subtotal + order.shipping + order.tax;
    order.status = OrderStatus::Paid;
    order
}
