// src/api/custom_songs.rs

use std::collections::HashMap;

use actix_web::{get, patch, post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgExecutor;
use utoipa::ToSchema;

use crate::api::gateway_client::{CreateOrderRequest, GatewayOrder};
use crate::db::custom_songs::NewCustomSong;
use crate::error::{AppError, AppResult};
use crate::models::{CustomSongOrder, CustomSongView};
use crate::status::{CustomSongStatus, OrderPaymentStatus};
use crate::{db, mail, templating, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomSongRequest {
    pub user_id: Option<i32>,
    pub customer_name: String,
    pub customer_email: String,
    pub occasion: String,
    pub recipient_name: String,
    pub details: Option<String>,
    /// Minor units.
    pub price: i64,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSongRequest {
    pub status: Option<String>,
    pub preview_url: Option<String>,
    pub full_audio_url: Option<String>,
}

impl CustomSongRequest {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("customer_name", &self.customer_name),
            ("occasion", &self.occasion),
            ("recipient_name", &self.recipient_name),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        if !self.customer_email.contains('@') {
            return Err("customer_email is invalid".into());
        }
        if self.price <= 0 {
            return Err("price must be positive".into());
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn open_gateway_order(
    state: &AppState,
    conn: impl PgExecutor<'_>,
    song: &CustomSongOrder,
) -> AppResult<(CustomSongOrder, GatewayOrder)> {
    let mut notes = HashMap::new();
    notes.insert("kind".to_string(), "custom_song".to_string());
    notes.insert("custom_song_id".to_string(), song.id.to_string());

    let order = state
        .gateway
        .create_order(CreateOrderRequest {
            amount: song.price,
            currency: song.currency.clone(),
            receipt: format!("song-{}-{}", song.id, song.payment_reset_count + song.order_id_history.len() as i32),
            notes,
        })
        .await?;

    let song = db::custom_songs::attach_gateway_order(conn, song.id, &order.id)
        .await?
        .ok_or_else(|| AppError::Conflict("custom song is already paid".into()))?;
    Ok((song, order))
}

#[utoipa::path(
    post,
    path = "/api/custom-songs",
    tag = "custom-songs",
    request_body = CustomSongRequest,
    responses(
        (status = 201, description = "Song order created with a gateway order"),
        (status = 400, description = "Validation failed")
    )
)]
#[post("/custom-songs")]
pub async fn create_song(state: web::Data<AppState>, body: web::Json<CustomSongRequest>) -> AppResult<HttpResponse> {
    body.validate().map_err(AppError::BadRequest)?;

    let currency = body
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("INR")
        .to_ascii_uppercase();

    // a failed gateway call rolls the new row back
    let mut tx = state.pool.begin().await?;
    let song = db::custom_songs::create_song(
        &mut *tx,
        &NewCustomSong {
            user_id: body.user_id,
            customer_name: body.customer_name.trim(),
            customer_email: body.customer_email.trim(),
            occasion: body.occasion.trim(),
            recipient_name: body.recipient_name.trim(),
            details: non_empty(&body.details),
            price: body.price,
            currency: &currency,
        },
    )
    .await?;

    let (song, order) = open_gateway_order(&state, &mut *tx, &song).await?;
    tx.commit().await?;
    log::info!("custom song order id={} gateway_order_id={}", song.id, order.id);

    mail::notify(
        &state.pool,
        state.mailer.as_ref(),
        templating::CUSTOM_SONG_RECEIVED,
        &song.customer_email,
        mail::vars([
            ("customerName", song.customer_name.clone()),
            ("occasion", song.occasion.clone()),
            ("recipientName", song.recipient_name.clone()),
            ("orderId", song.id.to_string()),
        ]),
    )
    .await;

    Ok(HttpResponse::Created().json(json!({
        "custom_song": CustomSongView::from(song),
        "gateway_order": order,
        "key_id": state.gateway.key_id(),
    })))
}

/// New gateway order for an unpaid song; the previous order id is archived
/// so late payments against it are still recognised.
#[post("/custom-songs/{id}/repay")]
pub async fn repay_song(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let song = db::custom_songs::get_song(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("custom song {id}")))?;
    if song.payment_status == OrderPaymentStatus::Paid.as_str() {
        return Err(AppError::Conflict("custom song is already paid".into()));
    }

    let (song, order) = open_gateway_order(&state, &state.pool, &song).await?;
    log::info!("custom song repay id={} gateway_order_id={}", song.id, order.id);

    Ok(HttpResponse::Ok().json(json!({
        "custom_song": CustomSongView::from(song),
        "gateway_order": order,
        "key_id": state.gateway.key_id(),
    })))
}

#[get("/custom-songs")]
pub async fn admin_list_songs(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let songs: Vec<CustomSongView> = db::custom_songs::list_songs(&state.pool)
        .await?
        .into_iter()
        .map(CustomSongView::from)
        .collect();
    Ok(HttpResponse::Ok().json(songs))
}

#[get("/custom-songs/{id}")]
pub async fn admin_get_song(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let song = db::custom_songs::get_song(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("custom song {id}")))?;
    Ok(HttpResponse::Ok().json(CustomSongView::from(song)))
}

#[patch("/custom-songs/{id}")]
pub async fn update_song(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UpdateSongRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let status = body.status.as_deref().map(str::parse::<CustomSongStatus>).transpose()?;

    let current = db::custom_songs::get_song(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("custom song {id}")))?;

    let song = db::custom_songs::update_song(
        &state.pool,
        id,
        status.map(CustomSongStatus::as_str),
        non_empty(&body.preview_url),
        non_empty(&body.full_audio_url),
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("custom song {id}")))?;

    let became_ready =
        status == Some(CustomSongStatus::Ready) && current.status != CustomSongStatus::Ready.as_str();
    if became_ready {
        mail::notify(
            &state.pool,
            state.mailer.as_ref(),
            templating::CUSTOM_SONG_READY,
            &song.customer_email,
            mail::vars([
                ("customerName", song.customer_name.clone()),
                ("recipientName", song.recipient_name.clone()),
                ("previewUrl", song.preview_url.clone().unwrap_or_default()),
            ]),
        )
        .await;
    }

    log::info!("custom song updated id={} status={}", song.id, song.status);
    Ok(HttpResponse::Ok().json(CustomSongView::from(song)))
}

#[utoipa::path(
    post,
    path = "/api/admin/custom-songs/{id}/approve",
    tag = "admin",
    params(("id" = i32, Path, description = "Custom song id")),
    responses(
        (status = 200, description = "Approved; approval_badge becomes \"Approved\""),
        (status = 404, description = "No such custom song")
    )
)]
#[post("/custom-songs/{id}/approve")]
pub async fn approve_song(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let song = db::custom_songs::approve(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("custom song {id}")))?;
    log::info!("custom song approved id={id}");
    Ok(HttpResponse::Ok().json(CustomSongView::from(song)))
}

#[post("/custom-songs/{id}/reset-payment")]
pub async fn reset_payment(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let song = db::custom_songs::reset_payment(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("custom song {id}")))?;
    log::warn!(
        "custom song payment reset id={} resets={} archived_orders={}",
        song.id,
        song.payment_reset_count,
        song.order_id_history.len()
    );
    Ok(HttpResponse::Ok().json(CustomSongView::from(song)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CustomSongRequest {
        CustomSongRequest {
            user_id: None,
            customer_name: "Meera".into(),
            customer_email: "meera@example.com".into(),
            occasion: "birthday".into(),
            recipient_name: "Arjun".into(),
            details: Some("   ".into()),
            price: 149_900,
            currency: None,
        }
    }

    #[test]
    fn validation() {
        assert_eq!(request().validate(), Ok(()));

        let mut r = request();
        r.recipient_name = " ".into();
        assert_eq!(r.validate(), Err("recipient_name is required".into()));

        let mut r = request();
        r.price = 0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn blank_details_are_dropped() {
        assert_eq!(non_empty(&request().details), None);
        assert_eq!(non_empty(&Some(" slow ballad ".into())), Some("slow ballad"));
    }
}
