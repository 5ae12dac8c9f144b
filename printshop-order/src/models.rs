use chrono::{DateTime, Utc};
use printshop_core::ShippingAddress;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Error,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Error => "error",
        }
    }

    /// States a reconciliation attempt may start from
    pub fn is_reconcilable(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Error)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "error" => Ok(OrderStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One checkout attempt and everything needed to fulfil or refund it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: Option<i64>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub payment_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub fulfillment_order_id: Option<String>,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    /// Append-only audit trail of reconciliation and refund attempts
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub reconcile_attempts: i32,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(id: i64, order_number: impl Into<String>, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            order_number: order_number.into(),
            user_id: None,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total: Decimal::ZERO,
            currency: currency.into(),
            payment_session_id: None,
            payment_intent_id: None,
            fulfillment_order_id: None,
            status: OrderStatus::Pending,
            shipping_address: ShippingAddress::default(),
            notes: None,
            cancellation_reason: None,
            reconcile_attempts: 0,
            paid_at: None,
            shipped_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }

    /// Add an item and fold its price into subtotal/total
    pub fn add_item(&mut self, item: OrderItem) {
        self.subtotal += item.total_price;
        self.total = self.subtotal + self.tax + self.shipping;
        self.items.push(item);
        self.updated_at = Utc::now();
    }

    /// Append a timestamped line to the notes trail
    pub fn append_note(&mut self, message: impl AsRef<str>) {
        let line = format!("[{}] {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"), message.as_ref());
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line,
        });
        self.updated_at = Utc::now();
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.shipping_address
            .email
            .as_ref()
            .map(|email| email.expose().as_str())
            .filter(|email| !email.trim().is_empty())
    }
}

/// Snapshot of the design state at order time.
///
/// Fulfillment uses this record, so later edits to the Design do not change
/// what gets printed for an existing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DesignSnapshot {
    pub front_image_path: Option<String>,
    pub back_image_path: Option<String>,
    pub print_file_url: Option<String>,
    pub product_name: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

/// User-owned artwork; only the raster export paths matter here
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Design {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub canvas_state: serde_json::Value,
    pub front_image_path: Option<String>,
    pub back_image_path: Option<String>,
}

impl Design {
    pub fn has_front_artifact(&self) -> bool {
        non_empty(self.front_image_path.as_deref()).is_some()
    }
}

/// A line of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub design_id: Option<i64>,
    /// Loaded alongside the item; not owned by it
    pub design: Option<Design>,
    /// Fulfillment provider variant id, kept opaque
    pub variant_id: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub design_data: DesignSnapshot,
}

impl OrderItem {
    pub fn new(
        id: i64,
        order_id: i64,
        variant_id: impl Into<String>,
        size: impl Into<String>,
        color: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id,
            order_id,
            design_id: None,
            design: None,
            variant_id: variant_id.into(),
            size: size.into(),
            color: color.into(),
            quantity,
            unit_price,
            total_price: unit_price * Decimal::from(quantity),
            design_data: DesignSnapshot::default(),
        }
    }

    pub fn with_design(mut self, design: Design) -> Self {
        self.design_id = Some(design.id);
        self.design = Some(design);
        self
    }

    pub fn with_snapshot(mut self, snapshot: DesignSnapshot) -> Self {
        self.design_data = snapshot;
        self
    }

    pub fn has_design_front_artifact(&self) -> bool {
        self.design.as_ref().is_some_and(Design::has_front_artifact)
    }
}

/// Trimmed value, or `None` for missing/blank strings
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
