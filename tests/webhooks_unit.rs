use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use serde_json::json;

use music_academy::api;
use music_academy::api::gateway_client::sign_hmac_sha256_hex;
use music_academy::api::webhooks::{parse_event, EventOutcome, GatewayWebhook, SIGNATURE_HEADER};

mod support;

#[::core::prelude::v1::test]
fn normalize_captured_payment() {
    let raw = json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_29QQoUBi66xm2f",
                    "order_id": "order_9A33XWu170gUtm",
                    "amount": 249900,
                    "currency": "INR",
                    "status": "captured"
                }
            }
        }
    });
    let webhook: GatewayWebhook = serde_json::from_value(raw).expect("webhook");

    let event = parse_event(&webhook);
    assert_eq!(event.outcome, EventOutcome::Paid);
    assert_eq!(event.gateway_order_id.as_deref(), Some("order_9A33XWu170gUtm"));
    assert_eq!(event.gateway_payment_id.as_deref(), Some("pay_29QQoUBi66xm2f"));
}

#[::core::prelude::v1::test]
fn empty_ids_are_treated_as_missing() {
    let raw = json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": { "id": "", "order_id": "" } } }
    });
    let webhook: GatewayWebhook = serde_json::from_value(raw).expect("webhook");

    let event = parse_event(&webhook);
    assert_eq!(event.outcome, EventOutcome::Failed);
    assert_eq!(event.gateway_order_id, None);
    assert_eq!(event.gateway_payment_id, None);
}

#[actix_web::test]
async fn webhook_without_signature_is_unauthorized() {
    let (state, _mailer) = support::build_state(support::lazy_pool());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::post()
        .uri("/webhook/payments")
        .set_payload(r#"{"event":"payment.captured"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn webhook_with_wrong_signature_is_unauthorized() {
    let (state, _mailer) = support::build_state(support::lazy_pool());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let body = r#"{"event":"payment.captured"}"#;
    let req = TestRequest::post()
        .uri("/webhook/payments")
        .insert_header((SIGNATURE_HEADER, sign_hmac_sha256_hex("some-other-secret", body.as_bytes())))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn signed_but_malformed_body_is_bad_request() {
    let (state, _mailer) = support::build_state(support::lazy_pool());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let body = "not json";
    let req = TestRequest::post()
        .uri("/webhook/payments")
        .insert_header((SIGNATURE_HEADER, sign_hmac_sha256_hex(support::WEBHOOK_SECRET, body.as_bytes())))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn signed_event_without_order_is_ignored() {
    let (state, _mailer) = support::build_state(support::lazy_pool());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let body = r#"{"event":"refund.processed","payload":{}}"#;
    let req = TestRequest::post()
        .uri("/webhook/payments")
        .insert_header((SIGNATURE_HEADER, sign_hmac_sha256_hex(support::WEBHOOK_SECRET, body.as_bytes())))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let value: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(value["ignored"], json!(true));
}

#[actix_web::test]
async fn verify_with_bad_signature_is_rejected_before_lookup() {
    let (state, _mailer) = support::build_state(support::lazy_pool());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::post()
        .uri("/api/payments/verify")
        .set_json(json!({
            "kind": "custom_song",
            "record_id": 1,
            "gateway_order_id": "order_1",
            "gateway_payment_id": "pay_1",
            "signature": "deadbeef"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
