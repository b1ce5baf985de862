// src/db/orders.rs

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::{Order, OrderItem, ShippingAddress};

const ORDER_COLUMNS: &str = "id, user_id, customer_name, customer_email, customer_phone, items, shipping_address, \
     subtotal, shipping_fee, total, currency, payment_method, payment_status, status, tracking_id, \
     gateway_order_id, gateway_payment_id, paid_at, delivered_at, created_at, updated_at";

pub struct NewOrder<'a> {
    pub user_id: Option<i32>,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub customer_phone: Option<&'a str>,
    pub items: &'a [OrderItem],
    pub shipping_address: &'a ShippingAddress,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub currency: &'a str,
    pub payment_method: &'a str,
    pub payment_status: &'a str,
}

pub async fn create_order(conn: impl PgExecutor<'_>, order: &NewOrder<'_>) -> Result<Order, sqlx::Error> {
    let sql = format!(
        r#"INSERT INTO orders
               (user_id, customer_name, customer_email, customer_phone, items, shipping_address,
                subtotal, shipping_fee, total, currency, payment_method, payment_status)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
           RETURNING {ORDER_COLUMNS}"#
    );
    sqlx::query_as::<_, Order>(&sql)
        .bind(order.user_id)
        .bind(order.customer_name)
        .bind(order.customer_email)
        .bind(order.customer_phone)
        .bind(Json(order.items))
        .bind(Json(order.shipping_address))
        .bind(order.subtotal)
        .bind(order.shipping_fee)
        .bind(order.subtotal + order.shipping_fee)
        .bind(order.currency)
        .bind(order.payment_method)
        .bind(order.payment_status)
        .fetch_one(conn)
        .await
}

pub async fn set_gateway_order(
    conn: impl PgExecutor<'_>,
    order_id: i32,
    gateway_order_id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE orders SET gateway_order_id = $2, updated_at = NOW()
           WHERE id = $1
           RETURNING {ORDER_COLUMNS}"#
    );
    sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await
}

pub async fn list_orders(pool: &PgPool) -> Result<Vec<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
    sqlx::query_as::<_, Order>(&sql).fetch_all(pool).await
}

pub async fn get_order(pool: &PgPool, order_id: i32) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_gateway_order(pool: &PgPool, gateway_order_id: &str) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_order_id = $1");
    sqlx::query_as::<_, Order>(&sql)
        .bind(gateway_order_id)
        .fetch_optional(pool)
        .await
}

/// Applies whichever fields are present. Setting payment status to `paid`
/// stamps `paid_at` once; the first move to `delivered` stamps
/// `delivered_at` once.
pub async fn update_order(
    pool: &PgPool,
    order_id: i32,
    payment_status: Option<&str>,
    status: Option<&str>,
    tracking_id: Option<&str>,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE orders
           SET payment_status = COALESCE($2, payment_status),
               status = COALESCE($3, status),
               tracking_id = COALESCE($4, tracking_id),
               paid_at = CASE WHEN $2 = 'paid' THEN COALESCE(paid_at, NOW()) ELSE paid_at END,
               delivered_at = CASE WHEN $3 = 'delivered' THEN COALESCE(delivered_at, NOW()) ELSE delivered_at END,
               updated_at = NOW()
           WHERE id = $1
           RETURNING {ORDER_COLUMNS}"#
    );
    sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .bind(payment_status)
        .bind(status)
        .bind(tracking_id)
        .fetch_optional(pool)
        .await
}

/// Returns the order only if this call moved it to `paid`.
pub async fn mark_paid(pool: &PgPool, order_id: i32, gateway_payment_id: Option<&str>) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE orders
           SET payment_status = 'paid', gateway_payment_id = COALESCE($2, gateway_payment_id),
               paid_at = NOW(), updated_at = NOW()
           WHERE id = $1 AND payment_status <> 'paid'
           RETURNING {ORDER_COLUMNS}"#
    );
    sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .bind(gateway_payment_id)
        .fetch_optional(pool)
        .await
}

pub async fn mark_failed(pool: &PgPool, order_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = 'failed', updated_at = NOW() WHERE id = $1 AND payment_status = 'pending'",
    )
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
