// src/api/orders.rs

use std::collections::HashMap;

use actix_web::{get, patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::api::gateway_client::CreateOrderRequest;
use crate::db::orders::NewOrder;
use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderItem, Product, ProductVariant, ShippingAddress};
use crate::status::{normalize, Badge, FulfilmentStatus, OrderPaymentStatus, PaymentMethod, PaymentState, TransactionKind};
use crate::{db, mail, templating, AppState};

pub const MAX_LINE_QUANTITY: i32 = 100;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: i32,
    pub variant_id: Option<i32>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub user_id: Option<i32>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub items: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub state: Option<PaymentState>,
    pub payment_status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub payment_status: Option<String>,
    pub status: Option<String>,
    pub tracking_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub payment_state: PaymentState,
    pub badge: Badge,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        let payment_state = normalize(TransactionKind::Shop, &order.payment_status, Some(&order.status));
        Self {
            order,
            payment_state,
            badge: payment_state.badge(),
        }
    }
}

/// Prices each line from the catalog rows it refers to.
///
/// Returns the snapshot items, the subtotal and the shared currency.
pub fn price_lines(
    lines: &[OrderLine],
    catalog: &HashMap<i32, (Product, Vec<ProductVariant>)>,
) -> Result<(Vec<OrderItem>, i64, String), String> {
    if lines.is_empty() {
        return Err("order has no items".into());
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut subtotal = 0i64;
    let mut currency: Option<&str> = None;

    for line in lines {
        if line.quantity < 1 || line.quantity > MAX_LINE_QUANTITY {
            return Err(format!("quantity for product {} must be 1..={MAX_LINE_QUANTITY}", line.product_id));
        }
        let (product, variants) = catalog
            .get(&line.product_id)
            .filter(|(p, _)| p.is_active)
            .ok_or_else(|| format!("product {} is not available", line.product_id))?;

        match currency {
            None => currency = Some(&product.currency),
            Some(c) if c != product.currency => return Err("all items must share one currency".into()),
            Some(_) => {}
        }

        let variant = match line.variant_id {
            Some(vid) => Some(
                variants
                    .iter()
                    .find(|v| v.id == vid)
                    .ok_or_else(|| format!("variant {vid} does not belong to product {}", product.id))?,
            ),
            None => None,
        };

        let unit_price = variant.map(|v| v.effective_price(product)).unwrap_or(product.base_price);
        let image = variant
            .and_then(|v| v.images.first())
            .or_else(|| variants.first().and_then(|v| v.images.first()))
            .cloned();
        let line_total = unit_price * i64::from(line.quantity);
        subtotal += line_total;

        items.push(OrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            variant_id: variant.map(|v| v.id),
            variant_name: variant.map(|v| v.name.clone()),
            image,
            unit_price,
            quantity: line.quantity,
            line_total,
        });
    }

    Ok((items, subtotal, currency.unwrap_or("INR").to_string()))
}

pub fn items_summary(items: &[OrderItem]) -> String {
    items
        .iter()
        .map(|i| match &i.variant_name {
            Some(v) => format!("{} x {} ({})", i.quantity, i.product_name, v),
            None => format!("{} x {}", i.quantity, i.product_name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "shop",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed; online orders carry a gateway order"),
        (status = 400, description = "Invalid items or customer details")
    )
)]
#[post("/orders")]
pub async fn create_order(state: web::Data<AppState>, body: web::Json<PlaceOrderRequest>) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let customer_name = req.customer_name.trim();
    let customer_email = req.customer_email.trim();
    if customer_name.is_empty() {
        return Err(AppError::bad_request("customer_name is required"));
    }
    if !customer_email.contains('@') {
        return Err(AppError::bad_request("customer_email is invalid"));
    }

    let mut catalog = HashMap::new();
    for line in &req.items {
        if catalog.contains_key(&line.product_id) {
            continue;
        }
        if let Some(product) = db::catalog::get_product(&state.pool, line.product_id).await? {
            let variants = db::catalog::list_variants(&state.pool, product.id).await?;
            catalog.insert(product.id, (product, variants));
        }
    }

    let (items, subtotal, currency) = price_lines(&req.items, &catalog).map_err(AppError::BadRequest)?;
    let payment_status = match req.payment_method {
        PaymentMethod::Cod => OrderPaymentStatus::Cod,
        PaymentMethod::Online => OrderPaymentStatus::Pending,
    };

    // the row only survives if the gateway order is created too
    let mut tx = state.pool.begin().await?;
    let mut order = db::orders::create_order(
        &mut *tx,
        &NewOrder {
            user_id: req.user_id,
            customer_name,
            customer_email,
            customer_phone: req.customer_phone.as_deref(),
            items: &items,
            shipping_address: &req.shipping_address,
            subtotal,
            shipping_fee: 0,
            currency: &currency,
            payment_method: req.payment_method.as_str(),
            payment_status: payment_status.as_str(),
        },
    )
    .await?;

    let mut gateway_order = None;
    if req.payment_method == PaymentMethod::Online {
        let mut notes = HashMap::new();
        notes.insert("kind".to_string(), "shop".to_string());
        notes.insert("order_id".to_string(), order.id.to_string());

        let created = state
            .gateway
            .create_order(CreateOrderRequest {
                amount: order.total,
                currency: order.currency.clone(),
                receipt: format!("order-{}", order.id),
                notes,
            })
            .await
            .inspect_err(|e| log::error!("gateway order for shop order {} failed: {e}", order.id))?;

        order = db::orders::set_gateway_order(&mut *tx, order.id, &created.id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("order {}", order.id)))?;
        gateway_order = Some(created);
    }
    tx.commit().await?;

    log::info!(
        "order placed id={} method={} total={}",
        order.id,
        order.payment_method,
        order.total
    );
    mail::notify(
        &state.pool,
        state.mailer.as_ref(),
        templating::ORDER_CONFIRMATION,
        &order.customer_email,
        mail::vars([
            ("customerName", order.customer_name.clone()),
            ("orderId", order.id.to_string()),
            ("itemsSummary", items_summary(&items)),
            ("total", mail::format_amount(order.total, &order.currency)),
            ("paymentMethod", order.payment_method.clone()),
        ]),
    )
    .await;

    Ok(HttpResponse::Created().json(json!({
        "order": OrderView::from(order),
        "gateway_order": gateway_order,
        "key_id": state.gateway.key_id(),
    })))
}

#[get("/orders")]
pub async fn admin_list_orders(state: web::Data<AppState>, query: web::Query<OrderListQuery>) -> AppResult<HttpResponse> {
    let payment_status = query
        .payment_status
        .as_deref()
        .map(str::parse::<OrderPaymentStatus>)
        .transpose()?;

    let orders: Vec<OrderView> = db::orders::list_orders(&state.pool)
        .await?
        .into_iter()
        .filter(|o| payment_status.map_or(true, |p| o.payment_status == p.as_str()))
        .map(OrderView::from)
        .filter(|v| query.state.map_or(true, |s| v.payment_state == s))
        .collect();

    Ok(HttpResponse::Ok().json(orders))
}

#[get("/orders/{id}")]
pub async fn admin_get_order(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let order = db::orders::get_order(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("order {id}")))?;
    Ok(HttpResponse::Ok().json(OrderView::from(order)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}",
    tag = "admin",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated order"),
        (status = 400, description = "Unknown status or shipping without tracking id"),
        (status = 404, description = "No such order")
    )
)]
#[patch("/orders/{id}")]
pub async fn update_order(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UpdateOrderRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let payment_status = body
        .payment_status
        .as_deref()
        .map(str::parse::<OrderPaymentStatus>)
        .transpose()?;
    let status = body.status.as_deref().map(str::parse::<FulfilmentStatus>).transpose()?;
    let tracking_id = body.tracking_id.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let current = db::orders::get_order(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("order {id}")))?;

    let shipping_now = status == Some(FulfilmentStatus::Shipped) && current.status != FulfilmentStatus::Shipped.as_str();
    if shipping_now && tracking_id.is_none() && current.tracking_id.is_none() {
        return Err(AppError::bad_request("tracking_id is required to mark an order shipped"));
    }

    let order = db::orders::update_order(
        &state.pool,
        id,
        payment_status.map(OrderPaymentStatus::as_str),
        status.map(FulfilmentStatus::as_str),
        tracking_id,
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("order {id}")))?;

    log::info!(
        "order updated id={} payment_status={} status={}",
        order.id,
        order.payment_status,
        order.status
    );

    if shipping_now {
        mail::notify(
            &state.pool,
            state.mailer.as_ref(),
            templating::ORDER_SHIPPED,
            &order.customer_email,
            mail::vars([
                ("customerName", order.customer_name.clone()),
                ("orderId", order.id.to_string()),
                ("trackingId", order.tracking_id.clone().unwrap_or_default()),
            ]),
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(OrderView::from(order)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::fixtures::at;

    fn product(id: i32, base_price: i64) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: None,
            base_price,
            currency: "INR".into(),
            category_id: None,
            is_active: true,
            created_at: at(2024, 6, 1, 0),
            updated_at: at(2024, 6, 1, 0),
        }
    }

    fn variant(id: i32, product_id: i32, price: Option<i64>) -> ProductVariant {
        ProductVariant {
            id,
            product_id,
            name: format!("Variant {id}"),
            price,
            images: vec![format!("https://cdn.example.com/{id}.png")],
            position: 0,
        }
    }

    fn catalog() -> HashMap<i32, (Product, Vec<ProductVariant>)> {
        HashMap::from([
            (1, (product(1, 29_900), vec![variant(10, 1, None), variant(11, 1, Some(34_900))])),
            (2, (product(2, 9_900), vec![])),
        ])
    }

    fn line(product_id: i32, variant_id: Option<i32>, quantity: i32) -> OrderLine {
        OrderLine {
            product_id,
            variant_id,
            quantity,
        }
    }

    #[test]
    fn prices_come_from_variants_then_base() {
        let (items, subtotal, currency) =
            price_lines(&[line(1, Some(11), 2), line(1, Some(10), 1), line(2, None, 3)], &catalog()).unwrap();

        assert_eq!(items[0].unit_price, 34_900);
        assert_eq!(items[0].line_total, 69_800);
        assert_eq!(items[1].unit_price, 29_900);
        assert_eq!(items[2].unit_price, 9_900);
        assert_eq!(subtotal, 69_800 + 29_900 + 29_700);
        assert_eq!(currency, "INR");
        assert_eq!(items[0].image.as_deref(), Some("https://cdn.example.com/11.png"));
    }

    #[test]
    fn rejects_foreign_variant_and_bad_quantity() {
        assert!(price_lines(&[line(2, Some(10), 1)], &catalog()).is_err());
        assert!(price_lines(&[line(1, None, 0)], &catalog()).is_err());
        assert!(price_lines(&[line(99, None, 1)], &catalog()).is_err());
        assert!(price_lines(&[], &catalog()).is_err());
    }

    #[test]
    fn inactive_products_cannot_be_ordered() {
        let mut c = catalog();
        if let Some((p, _)) = c.get_mut(&2) {
            p.is_active = false;
        }
        assert_eq!(
            price_lines(&[line(2, None, 1)], &c).unwrap_err(),
            "product 2 is not available"
        );
    }

    #[test]
    fn summary_lists_quantities() {
        let (items, _, _) = price_lines(&[line(1, Some(10), 2), line(2, None, 1)], &catalog()).unwrap();
        assert_eq!(items_summary(&items), "2 x Product 1 (Variant 10), 1 x Product 2");
    }
}
