// src/api/webhooks.rs

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::payments::{self, Settlement};
use crate::error::{AppError, AppResult};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Gateway-Signature";

/// Gateway event envelope. Only the fields used for settlement are read;
/// order and payment entities may each be absent depending on the event.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GatewayWebhook {
    pub event: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Paid,
    Failed,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub outcome: EventOutcome,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
}

fn entity_str(payload: &serde_json::Value, entity: &str, field: &str) -> Option<String> {
    payload
        .get(entity)
        .and_then(|e| e.get("entity"))
        .and_then(|e| e.get(field))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_event(webhook: &GatewayWebhook) -> WebhookEvent {
    let outcome = match webhook.event.as_str() {
        "payment.captured" | "order.paid" => EventOutcome::Paid,
        "payment.failed" => EventOutcome::Failed,
        _ => EventOutcome::Ignored,
    };
    let gateway_order_id = entity_str(&webhook.payload, "payment", "order_id")
        .or_else(|| entity_str(&webhook.payload, "order", "id"));

    WebhookEvent {
        outcome,
        gateway_order_id,
        gateway_payment_id: entity_str(&webhook.payload, "payment", "id"),
    }
}

#[utoipa::path(
    post,
    path = "/webhook/payments",
    tag = "webhooks",
    request_body = GatewayWebhook,
    responses(
        (status = 200, description = "Processed, ignored or already applied"),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Missing or invalid signature")
    )
)]
#[post("/webhook/payments")]
pub async fn gateway_webhook(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if signature.is_empty() || !state.gateway.verify_webhook_signature(&body, signature) {
        log::warn!("gateway webhook rejected: bad signature");
        return Err(AppError::Unauthorized("invalid webhook signature".into()));
    }

    let webhook: GatewayWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("invalid webhook body: {e}")))?;
    let event = parse_event(&webhook);
    log::info!(
        "gateway webhook event={} order={:?} payment={:?}",
        webhook.event,
        event.gateway_order_id,
        event.gateway_payment_id
    );

    let Some(order_id) = event.gateway_order_id.as_deref() else {
        return Ok(HttpResponse::Ok().json(json!({ "ok": true, "ignored": true })));
    };
    if event.outcome == EventOutcome::Ignored {
        return Ok(HttpResponse::Ok().json(json!({ "ok": true, "ignored": true })));
    }

    // unknown order ids still answer 200 so the gateway stops retrying
    let Some(target) = payments::find_target(&state, order_id).await? else {
        return Ok(HttpResponse::Ok().json(json!({ "ok": true, "ignored": true })));
    };

    if target.settled {
        return Ok(HttpResponse::Ok().json(json!({ "ok": true, "idempotent": true })));
    }

    match event.outcome {
        EventOutcome::Paid => {
            let settlement = payments::settle(&state, target, event.gateway_payment_id.as_deref()).await?;
            let idempotent = settlement == Settlement::AlreadySettled;
            Ok(HttpResponse::Ok().json(json!({ "ok": true, "idempotent": idempotent })))
        }
        EventOutcome::Failed if !target.current => {
            Ok(HttpResponse::Ok().json(json!({ "ok": true, "ignored": true })))
        }
        EventOutcome::Failed => {
            let changed = payments::fail(&state, target).await?;
            Ok(HttpResponse::Ok().json(json!({ "ok": true, "idempotent": !changed })))
        }
        EventOutcome::Ignored => Ok(HttpResponse::Ok().json(json!({ "ok": true, "ignored": true }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(raw: &str) -> GatewayWebhook {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn captured_payment_carries_both_ids() {
        let event = parse_event(&webhook(
            r#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","order_id":"order_9","status":"captured"}}}}"#,
        ));
        assert_eq!(event.outcome, EventOutcome::Paid);
        assert_eq!(event.gateway_order_id.as_deref(), Some("order_9"));
        assert_eq!(event.gateway_payment_id.as_deref(), Some("pay_1"));
    }

    #[test]
    fn order_paid_falls_back_to_order_entity() {
        let event = parse_event(&webhook(r#"{"event":"order.paid","payload":{"order":{"entity":{"id":"order_3"}}}}"#));
        assert_eq!(event.outcome, EventOutcome::Paid);
        assert_eq!(event.gateway_order_id.as_deref(), Some("order_3"));
        assert_eq!(event.gateway_payment_id, None);
    }

    #[test]
    fn other_events_are_ignored() {
        let event = parse_event(&webhook(r#"{"event":"refund.created"}"#));
        assert_eq!(event.outcome, EventOutcome::Ignored);
        assert_eq!(event.gateway_order_id, None);

        let failed = parse_event(&webhook(
            r#"{"event":"payment.failed","payload":{"payment":{"entity":{"id":"pay_2","order_id":"order_4"}}}}"#,
        ));
        assert_eq!(failed.outcome, EventOutcome::Failed);
    }
}
