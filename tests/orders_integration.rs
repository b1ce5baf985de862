use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use music_academy::api;
use music_academy::templating;

mod support;

fn keychain() -> Value {
    json!({
        "name": "Tanpura Keychain",
        "base_price": 29900,
        "currency": "inr",
        "variants": [
            { "name": "Gold", "images": ["https://cdn.example.com/k-gold.png"] },
            { "name": "Silver", "price": 24900 }
        ]
    })
}

fn address() -> Value {
    json!({
        "line1": "12 MG Road",
        "city": "Pune",
        "state": "MH",
        "postal_code": "411001",
        "country": "IN"
    })
}

#[actix_web::test]
async fn cod_order_ships_with_tracking_and_notifies() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let pool = &test_db.pool;
    support::seed_templates(pool).await;

    let (state, mailer) = support::build_state(pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::post().uri("/api/admin/products").set_json(keychain()).to_request();
    let product: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(product["slug"], json!("tanpura-keychain"));
    assert_eq!(product["currency"], json!("INR"));
    let product_id = product["id"].as_i64().expect("product id");
    let silver_id = product["variants"][1]["id"].as_i64().expect("variant id");

    let req = TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer_name": "Ravi",
            "customer_email": "ravi@example.com",
            "items": [
                { "product_id": product_id, "quantity": 2 },
                { "product_id": product_id, "variant_id": silver_id, "quantity": 1 }
            ],
            "shipping_address": address(),
            "payment_method": "cod"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = test::read_body_json(resp).await;
    let order = &placed["order"];
    assert_eq!(order["subtotal"], json!(2 * 29900 + 24900));
    assert_eq!(order["total"], order["subtotal"]);
    assert_eq!(order["payment_status"], json!("cod"));
    assert_eq!(order["payment_state"], json!("pending"));
    assert!(placed["gateway_order"].is_null());
    let order_id = order["id"].as_i64().expect("order id");

    let req = TestRequest::patch()
        .uri(&format!("/api/admin/orders/{order_id}"))
        .set_json(json!({ "status": "shipped" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::patch()
        .uri(&format!("/api/admin/orders/{order_id}"))
        .set_json(json!({ "status": "shipped", "tracking_id": "DL42IN" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::patch()
        .uri(&format!("/api/admin/orders/{order_id}"))
        .set_json(json!({ "status": "delivered" }))
        .to_request();
    let delivered: Value = test::call_and_read_body_json(&app, req).await;
    // cash on delivery counts as paid once delivered
    assert_eq!(delivered["payment_state"], json!("paid"));

    let sent = mailer.sent();
    let subjects: Vec<&str> = sent.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(subjects.len(), 2, "confirmation and shipped emails: {subjects:?}");
    assert!(sent.iter().all(|m| m.to == "ravi@example.com"));
    let shipped = sent.last().expect("shipped email");
    assert!(shipped.body_html.contains("DL42IN"));
    assert!(!shipped.body_html.contains("{{"));

    let template = templating::default_templates()
        .into_iter()
        .find(|t| t.name == templating::ORDER_SHIPPED)
        .expect("shipped template");
    assert_eq!(
        shipped.subject,
        template.subject.replace("{{orderId}}", &order_id.to_string())
    );
}

#[actix_web::test]
async fn unknown_status_is_rejected() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let (state, _mailer) = support::build_state(test_db.pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::patch()
        .uri("/api/admin/orders/1")
        .set_json(json!({ "status": "teleported" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn inactive_product_cannot_be_ordered() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let (state, _mailer) = support::build_state(test_db.pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let mut input = keychain();
    input["is_active"] = json!(false);
    let req = TestRequest::post().uri("/api/admin/products").set_json(input).to_request();
    let product: Value = test::call_and_read_body_json(&app, req).await;

    let req = TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer_name": "Ravi",
            "customer_email": "ravi@example.com",
            "items": [{ "product_id": product["id"], "quantity": 1 }],
            "shipping_address": address(),
            "payment_method": "cod"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::get().uri("/api/products").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed, json!([]));
}

#[actix_web::test]
async fn product_delete_reports_success_then_not_found() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let (state, _mailer) = support::build_state(test_db.pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::post().uri("/api/admin/products").set_json(keychain()).to_request();
    let product: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/api/admin/products/{}", product["id"]);

    let req = TestRequest::delete().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "success": true }));

    let req = TestRequest::delete().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn product_without_variants_is_rejected() {
    let (state, _mailer) = support::build_state(support::lazy_pool());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::post()
        .uri("/api/admin/products")
        .set_json(json!({ "name": "Bare", "base_price": 100 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn cod_settlement_date_survives_later_edits() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let pool = &test_db.pool;
    let (state, _mailer) = support::build_state(pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::post().uri("/api/admin/products").set_json(keychain()).to_request();
    let product: Value = test::call_and_read_body_json(&app, req).await;

    let req = TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer_name": "Ravi",
            "customer_email": "ravi@example.com",
            "items": [{ "product_id": product["id"], "quantity": 1 }],
            "shipping_address": address(),
            "payment_method": "cod"
        }))
        .to_request();
    let placed: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = placed["order"]["id"].as_i64().expect("order id");
    let uri = format!("/api/admin/orders/{order_id}");

    let req = TestRequest::patch()
        .uri(&uri)
        .set_json(json!({ "status": "delivered", "tracking_id": "T1" }))
        .to_request();
    let delivered: Value = test::call_and_read_body_json(&app, req).await;
    assert!(!delivered["delivered_at"].is_null());

    sqlx::query(
        "UPDATE orders SET delivered_at = '2024-03-05T10:00:00Z', updated_at = '2024-03-05T10:00:00Z' WHERE id = $1",
    )
    .bind(order_id as i32)
    .execute(pool)
    .await
    .expect("backdate delivery");

    let revenue_uri = "/api/admin/revenue?days=7&end=2024-03-07";
    let req = TestRequest::get().uri(revenue_uri).to_request();
    let before: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(before["total"], json!(29900));

    let req = TestRequest::patch()
        .uri(&uri)
        .set_json(json!({ "tracking_id": "T1-fixed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // marking it delivered again keeps the first delivery date
    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "delivered" })).to_request();
    let again: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(again["delivered_at"], json!("2024-03-05T10:00:00Z"));

    let req = TestRequest::get().uri(revenue_uri).to_request();
    let after: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(after["total"], json!(29900));
}
