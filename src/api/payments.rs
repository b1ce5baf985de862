// src/api/payments.rs
//
// Settlement shared by the client-side verify call and the gateway webhook.

use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::status::TransactionKind;
use crate::{db, mail, templating, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub kind: TransactionKind,
    pub record_id: i32,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    Settled,
    AlreadySettled,
}

/// Local record a gateway order id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTarget {
    pub kind: TransactionKind,
    pub record_id: i32,
    pub settled: bool,
    /// False when the id was found among archived gateway orders.
    pub current: bool,
}

/// Looks the gateway order up in purchases, shop orders and custom songs
/// (including archived purchase and custom song order ids).
pub async fn find_target(state: &AppState, gateway_order_id: &str) -> AppResult<Option<PaymentTarget>> {
    if let Some(p) = db::learning::find_purchase_by_gateway_order(&state.pool, gateway_order_id).await? {
        return Ok(Some(PaymentTarget {
            kind: TransactionKind::Course,
            record_id: p.id,
            settled: p.status == "completed",
            current: p.gateway_order_id.as_deref() == Some(gateway_order_id),
        }));
    }
    if let Some(o) = db::orders::find_by_gateway_order(&state.pool, gateway_order_id).await? {
        return Ok(Some(PaymentTarget {
            kind: TransactionKind::Shop,
            record_id: o.id,
            settled: o.payment_status == "paid",
            current: true,
        }));
    }
    if let Some(s) = db::custom_songs::find_by_gateway_order(&state.pool, gateway_order_id).await? {
        return Ok(Some(PaymentTarget {
            kind: TransactionKind::CustomSong,
            record_id: s.id,
            settled: s.payment_status == "paid",
            current: s.gateway_order_id.as_deref() == Some(gateway_order_id),
        }));
    }
    Ok(None)
}

/// Marks the record paid. Repeated calls are no-ops reported as
/// [`Settlement::AlreadySettled`].
pub async fn settle(state: &AppState, target: PaymentTarget, gateway_payment_id: Option<&str>) -> AppResult<Settlement> {
    let id = target.record_id;
    match target.kind {
        TransactionKind::Course => {
            let Some(purchase) = db::learning::complete_purchase(&state.pool, id, gateway_payment_id).await? else {
                return Ok(Settlement::AlreadySettled);
            };
            log::info!("course purchase {id} paid user_id={} course_id={}", purchase.user_id, purchase.course_id);

            let user = db::users::get_user(&state.pool, purchase.user_id).await?;
            let course = db::courses::get_course(&state.pool, purchase.course_id, false).await?;
            if let (Some(user), Some(course)) = (user, course) {
                mail::notify(
                    &state.pool,
                    state.mailer.as_ref(),
                    templating::COURSE_PURCHASE_CONFIRMATION,
                    &user.email,
                    mail::vars([
                        ("userName", user.name.clone()),
                        ("courseTitle", course.title.clone()),
                        ("amount", mail::format_amount(purchase.amount, &purchase.currency)),
                        ("courseUrl", format!("{}/courses/{}", state.site_url, course.id)),
                    ]),
                )
                .await;
            }
        }
        TransactionKind::Shop => {
            if db::orders::mark_paid(&state.pool, id, gateway_payment_id).await?.is_none() {
                return Ok(Settlement::AlreadySettled);
            }
            log::info!("shop order {id} paid");
        }
        TransactionKind::CustomSong => {
            if db::custom_songs::mark_paid(&state.pool, id, gateway_payment_id).await?.is_none() {
                return Ok(Settlement::AlreadySettled);
            }
            log::info!("custom song {id} paid");
        }
    }
    Ok(Settlement::Settled)
}

/// Marks a pending record failed and tells the customer. Returns false when
/// the record was not pending or the failure belongs to a replaced gateway
/// order.
pub async fn fail(state: &AppState, target: PaymentTarget) -> AppResult<bool> {
    let id = target.record_id;
    if !target.current {
        log::info!("{} {id}: failure for a replaced gateway order ignored", target.kind.as_str());
        return Ok(false);
    }
    let recipient = match target.kind {
        TransactionKind::Course => {
            if !db::learning::fail_purchase(&state.pool, id).await? {
                return Ok(false);
            }
            match db::learning::get_purchase_by_id(&state.pool, id).await? {
                Some(p) => {
                    let user = db::users::get_user(&state.pool, p.user_id).await?;
                    let course = db::courses::get_course(&state.pool, p.course_id, false).await?;
                    user.zip(course).map(|(u, c)| (u.name, u.email, c.title))
                }
                None => None,
            }
        }
        TransactionKind::Shop => {
            if !db::orders::mark_failed(&state.pool, id).await? {
                return Ok(false);
            }
            db::orders::get_order(&state.pool, id)
                .await?
                .map(|o| (o.customer_name, o.customer_email, format!("Order #{}", o.id)))
        }
        TransactionKind::CustomSong => {
            if !db::custom_songs::mark_failed(&state.pool, id).await? {
                return Ok(false);
            }
            db::custom_songs::get_song(&state.pool, id)
                .await?
                .map(|s| (s.customer_name, s.customer_email, format!("Custom song for {}", s.recipient_name)))
        }
    };

    log::warn!("{} {id} payment failed", target.kind.as_str());
    if let Some((name, email, item)) = recipient {
        mail::notify(
            &state.pool,
            state.mailer.as_ref(),
            templating::PAYMENT_FAILED,
            &email,
            mail::vars([("customerName", name), ("itemName", item)]),
        )
        .await;
    }
    Ok(true)
}

#[utoipa::path(
    post,
    path = "/api/payments/verify",
    tag = "payments",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded (or already recorded)"),
        (status = 400, description = "Bad signature or order id mismatch"),
        (status = 404, description = "Unknown record")
    )
)]
#[post("/payments/verify")]
pub async fn verify_payment(
    state: web::Data<AppState>,
    body: web::Json<VerifyPaymentRequest>,
) -> AppResult<HttpResponse> {
    if !state
        .gateway
        .verify_payment_signature(&body.gateway_order_id, &body.gateway_payment_id, &body.signature)
    {
        log::warn!(
            "payment signature mismatch kind={} record_id={} order={}",
            body.kind.as_str(),
            body.record_id,
            body.gateway_order_id
        );
        return Err(AppError::bad_request("invalid payment signature"));
    }

    let target = find_target(&state, &body.gateway_order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("payment for order {}", body.gateway_order_id)))?;
    if target.kind != body.kind || target.record_id != body.record_id {
        return Err(AppError::bad_request("gateway order does not belong to this record"));
    }

    let settlement = settle(&state, target, Some(&body.gateway_payment_id)).await?;
    Ok(HttpResponse::Ok().json(json!({
        "ok": true,
        "kind": body.kind,
        "record_id": body.record_id,
        "settlement": settlement,
    })))
}
