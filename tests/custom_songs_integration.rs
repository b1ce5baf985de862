use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use music_academy::api;
use music_academy::db;
use music_academy::db::custom_songs::NewCustomSong;
use music_academy::models::CustomSongOrder;

mod support;

async fn insert_song(pool: &sqlx::PgPool, customer_name: &str, price: i64) -> CustomSongOrder {
    db::custom_songs::create_song(
        pool,
        &NewCustomSong {
            user_id: None,
            customer_name,
            customer_email: "meera@example.com",
            occasion: "Birthday",
            recipient_name: "Arjun",
            details: None,
            price,
            currency: "INR",
        },
    )
    .await
    .expect("insert song")
}

#[actix_web::test]
async fn approval_flips_the_badge() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let song = insert_song(&test_db.pool, "Meera", 149_900).await;
    let (state, _mailer) = support::build_state(test_db.pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::get().uri(&format!("/api/admin/custom-songs/{}", song.id)).to_request();
    let before: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(before["approval_badge"], json!("Needs Approval"));
    assert_eq!(before["is_approved"], json!(false));

    let req = TestRequest::post()
        .uri(&format!("/api/admin/custom-songs/{}/approve", song.id))
        .to_request();
    let after: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(after["approval_badge"], json!("Approved"));
    assert_eq!(after["is_approved"], json!(true));

    let req = TestRequest::post().uri("/api/admin/custom-songs/999999/approve").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn ready_status_sends_one_email() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let pool = &test_db.pool;
    support::seed_templates(pool).await;
    let song = insert_song(pool, "Meera", 149_900).await;
    let (state, mailer) = support::build_state(pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;
    let uri = format!("/api/admin/custom-songs/{}", song.id);

    let req = TestRequest::patch()
        .uri(&uri)
        .set_json(json!({ "status": "ready", "preview_url": "https://cdn.example.com/preview.mp3" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["status"], json!("ready"));

    // setting the same status again is not a new transition
    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "ready" })).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body_html.contains("https://cdn.example.com/preview.mp3"));

    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "mixing" })).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "completed" })).to_request();
    let done: Value = test::call_and_read_body_json(&app, req).await;
    assert!(!done["completed_at"].is_null());
}

#[actix_web::test]
async fn reset_payment_archives_the_gateway_order() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let pool = &test_db.pool;
    let song = insert_song(pool, "Meera", 149_900).await;
    db::custom_songs::attach_gateway_order(pool, song.id, "order_first")
        .await
        .expect("attach")
        .expect("unpaid");
    db::custom_songs::mark_paid(pool, song.id, Some("pay_1"))
        .await
        .expect("mark paid")
        .expect("was unpaid");

    let (state, _mailer) = support::build_state(pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::post()
        .uri(&format!("/api/admin/custom-songs/{}/reset-payment", song.id))
        .to_request();
    let reset: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(reset["payment_status"], json!("pending"));
    assert_eq!(reset["order_id_history"], json!(["order_first"]));
    assert_eq!(reset["payment_reset_count"], json!(1));
    assert!(reset["gateway_order_id"].is_null());
    assert!(reset["paid_at"].is_null());

    // the archived id still resolves to the song
    let found = db::custom_songs::find_by_gateway_order(pool, "order_first")
        .await
        .expect("lookup")
        .expect("song by archived id");
    assert_eq!(found.id, song.id);
}

#[actix_web::test]
async fn transactions_summarise_paid_songs() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let pool = &test_db.pool;
    let paid = insert_song(pool, "Meera", 150_000).await;
    insert_song(pool, "Kabir", 90_000).await;
    db::custom_songs::mark_paid(pool, paid.id, Some("pay_1"))
        .await
        .expect("mark paid")
        .expect("was unpaid");

    let (state, _mailer) = support::build_state(pool.clone());
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(api::configure)).await;

    let req = TestRequest::get().uri("/api/admin/transactions").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["summary"]["count"], json!(2));
    assert_eq!(body["summary"]["paid_total"], json!(150_000));
    assert_eq!(body["summary"]["by_state"]["pending"], json!(1));
    assert_eq!(body["summary"]["revenue_by_kind"]["custom_song"], json!(150_000));

    let req = TestRequest::get().uri("/api/admin/transactions?state=paid&search=meera").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["transactions"].as_array().map(Vec::len), Some(1));

    let req = TestRequest::get()
        .uri("/api/admin/transactions?from=2024-05-02&to=2024-05-01")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::get().uri("/api/admin/revenue?days=7").to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["total"], json!(150_000));
    assert_eq!(report["count"], json!(1));

    let req = TestRequest::get().uri("/api/admin/revenue?days=0").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
