// src/api/videos.rs

use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::video::{extract_youtube_id, format_duration};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DurationQuery {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DurationResponse {
    pub video_id: String,
    pub duration_seconds: u32,
    pub formatted: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/video-duration",
    tag = "admin",
    params(("url" = String, Query, description = "YouTube link")),
    responses(
        (status = 200, description = "Duration of the linked video", body = DurationResponse),
        (status = 400, description = "Unsupported URL"),
        (status = 502, description = "Lookup failed")
    )
)]
#[get("/video-duration")]
pub async fn video_duration(state: web::Data<AppState>, query: web::Query<DurationQuery>) -> AppResult<HttpResponse> {
    let video_id = extract_youtube_id(&query.url)
        .ok_or_else(|| AppError::bad_request("unsupported or malformed video URL"))?;

    let duration_seconds = state.videos.duration_seconds(&video_id).await?;
    Ok(HttpResponse::Ok().json(DurationResponse {
        formatted: format_duration(duration_seconds),
        video_id,
        duration_seconds,
    }))
}
