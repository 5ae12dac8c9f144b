use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printshop_core::ShippingAddress;
use printshop_order::{
    Design, DesignSnapshot, Order, OrderItem, OrderRepository, OrderStatus, StoreError, RETRYABLE_STATUSES,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItem>>, StoreError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(ITEMS_SQL)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            items.entry(row.order_id).or_default().push(row.into());
        }
        Ok(items)
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut items = self.load_items(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }
}

const ORDER_COLUMNS: &str = r#"
    id, order_number, user_id, subtotal, tax, shipping, total, currency,
    payment_session_id, payment_intent_id, fulfillment_order_id, status,
    shipping_address, notes, cancellation_reason, reconcile_attempts,
    paid_at, shipped_at, cancelled_at, created_at, updated_at
"#;

const ITEMS_SQL: &str = r#"
    SELECT i.id, i.order_id, i.design_id, i.variant_id, i.size, i.color, i.quantity,
           i.unit_price, i.total_price, i.design_data,
           d.user_id AS design_user_id, d.name AS design_name, d.canvas_state AS design_canvas_state,
           d.front_image_path AS design_front_image_path, d.back_image_path AS design_back_image_path
    FROM order_items i
    LEFT JOIN designs d ON d.id = i.design_id
    WHERE i.order_id = ANY($1)
    ORDER BY i.order_id, i.id
"#;

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    user_id: Option<i64>,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    currency: String,
    payment_session_id: Option<String>,
    payment_intent_id: Option<String>,
    fulfillment_order_id: Option<String>,
    status: String,
    shipping_address: Json<ShippingAddress>,
    notes: Option<String>,
    cancellation_reason: Option<String>,
    reconcile_attempts: i32,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
            currency: self.currency,
            payment_session_id: self.payment_session_id,
            payment_intent_id: self.payment_intent_id,
            fulfillment_order_id: self.fulfillment_order_id,
            status: self.status.parse::<OrderStatus>()?,
            shipping_address: self.shipping_address.0,
            notes: self.notes,
            cancellation_reason: self.cancellation_reason,
            reconcile_attempts: self.reconcile_attempts,
            paid_at: self.paid_at,
            shipped_at: self.shipped_at,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    design_id: Option<i64>,
    variant_id: String,
    size: String,
    color: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    design_data: Json<DesignSnapshot>,
    design_user_id: Option<i64>,
    design_name: Option<String>,
    design_canvas_state: Option<serde_json::Value>,
    design_front_image_path: Option<String>,
    design_back_image_path: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        // A dangling design_id (LEFT JOIN miss) leaves the design unloaded
        let design = match (row.design_id, row.design_user_id) {
            (Some(id), Some(user_id)) => Some(Design {
                id,
                user_id,
                name: row.design_name.unwrap_or_default(),
                canvas_state: row.design_canvas_state.unwrap_or_default(),
                front_image_path: row.design_front_image_path,
                back_image_path: row.design_back_image_path,
            }),
            _ => None,
        };

        OrderItem {
            id: row.id,
            order_id: row.order_id,
            design_id: row.design_id,
            design,
            variant_id: row.variant_id,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            design_data: row.design_data.0,
        }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn get_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = self.load_items(&[row.id]).await?;
        let items = items.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_order(items)?))
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $2,
                payment_session_id = $3,
                payment_intent_id = $4,
                fulfillment_order_id = $5,
                notes = $6,
                cancellation_reason = $7,
                reconcile_attempts = $8,
                paid_at = $9,
                shipped_at = $10,
                cancelled_at = $11,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(&order.payment_session_id)
        .bind(&order.payment_intent_id)
        .bind(&order.fulfillment_order_id)
        .bind(&order.notes)
        .bind(&order.cancellation_reason)
        .bind(order.reconcile_attempts)
        .bind(order.paid_at)
        .bind(order.shipped_at)
        .bind(order.cancelled_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("Order {} does not exist", order.id).into());
        }
        Ok(())
    }

    async fn list_orders_by_status(&self, statuses: &[OrderStatus], limit: i64) -> Result<Vec<Order>, StoreError> {
        let statuses: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();
        let sql = format!(
            "SELECT {} FROM orders WHERE status = ANY($1) ORDER BY created_at, id LIMIT $2",
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(&statuses)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(rows).await
    }

    async fn list_retry_candidates(&self, max_attempts: i32, limit: i64) -> Result<Vec<Order>, StoreError> {
        let statuses: Vec<&str> = RETRYABLE_STATUSES.iter().map(OrderStatus::as_str).collect();
        let sql = format!(
            r#"SELECT {} FROM orders
               WHERE status = ANY($1) AND fulfillment_order_id IS NULL AND reconcile_attempts < $2
               ORDER BY created_at, id LIMIT $3"#,
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(&statuses)
            .bind(max_attempts)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(rows).await
    }
}
