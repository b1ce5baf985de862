// src/api/certificates.rs

use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::api::courses::UserRequest;
use crate::certificate::{self, PlacedText, Progress};
use crate::error::{AppError, AppResult};
use crate::models::{Certificate, LayoutField};
use crate::{db, mail, templating, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LayoutRequest {
    pub background_url: String,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub fields: Vec<LayoutField>,
}

#[derive(Debug, Serialize)]
pub struct CertificateView {
    pub certificate: Certificate,
    pub background_url: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub placed: Vec<PlacedText>,
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/certificate",
    tag = "courses",
    params(("id" = i32, Path, description = "Course id")),
    request_body = UserRequest,
    responses(
        (status = 201, description = "Certificate issued"),
        (status = 200, description = "Certificate already issued earlier"),
        (status = 400, description = "Course not finished or review missing")
    )
)]
#[post("/courses/{id}/certificate")]
pub async fn issue_certificate(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UserRequest>,
) -> AppResult<HttpResponse> {
    let course_id = path.into_inner();
    let user_id = body.user_id;

    if !db::learning::has_completed_purchase(&state.pool, user_id, course_id).await? {
        return Err(AppError::bad_request("course has not been purchased"));
    }

    if let Some(existing) = db::certificates::get_for_user_course(&state.pool, user_id, course_id).await? {
        return Ok(HttpResponse::Ok().json(existing));
    }

    let course = db::courses::get_course(&state.pool, course_id, false)
        .await?
        .ok_or_else(|| AppError::not_found(format!("course {course_id}")))?;
    let user = db::users::get_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

    let total = db::courses::count_videos(&state.pool, course_id).await?;
    let completed = db::learning::completed_video_count(&state.pool, user_id, course_id).await?;
    let reviewed = db::learning::get_review(&state.pool, user_id, course_id).await?.is_some();
    let progress = Progress {
        completed: completed.max(0) as usize,
        total: total.max(0) as usize,
    };
    certificate::check_eligibility(progress, reviewed).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let certificate_id = certificate::generate_certificate_id(Utc::now());
    let (cert, created) =
        db::certificates::issue(&state.pool, &certificate_id, user_id, course_id, &user.name, &course.title).await?;

    if !created {
        return Ok(HttpResponse::Ok().json(cert));
    }

    log::info!(
        "certificate issued certificate_id={} user_id={} course_id={}",
        cert.certificate_id,
        user_id,
        course_id
    );
    mail::notify(
        &state.pool,
        state.mailer.as_ref(),
        templating::CERTIFICATE_ISSUED,
        &user.email,
        mail::vars([
            ("userName", user.name.clone()),
            ("courseTitle", course.title.clone()),
            ("certificateId", cert.certificate_id.clone()),
            ("certificateUrl", format!("{}/certificates/{}", state.site_url, cert.certificate_id)),
        ]),
    )
    .await;

    Ok(HttpResponse::Created().json(cert))
}

/// Certificate with text already fitted to the course layout, ready to draw.
#[get("/certificates/{certificate_id}")]
pub async fn get_certificate(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let certificate_id = path.into_inner();
    let cert = db::certificates::get_by_certificate_id(&state.pool, &certificate_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("certificate {certificate_id}")))?;

    let view = match db::certificates::get_layout(&state.pool, cert.course_id).await? {
        Some(layout) => CertificateView {
            placed: certificate::compose(&cert, &layout.fields, state.measure.as_ref()),
            background_url: Some(layout.background_url),
            width: Some(layout.width),
            height: Some(layout.height),
            certificate: cert,
        },
        None => CertificateView {
            certificate: cert,
            background_url: None,
            width: None,
            height: None,
            placed: Vec::new(),
        },
    };

    Ok(HttpResponse::Ok().json(view))
}

#[put("/courses/{id}/certificate-layout")]
pub async fn put_layout(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<LayoutRequest>,
) -> AppResult<HttpResponse> {
    let course_id = path.into_inner();

    if body.background_url.trim().is_empty() {
        return Err(AppError::bad_request("background_url is required"));
    }
    if body.width <= 0 || body.height <= 0 {
        return Err(AppError::bad_request("width and height must be positive"));
    }
    certificate::validate_fields(&body.fields, body.width, body.height).map_err(AppError::BadRequest)?;

    if db::courses::get_course(&state.pool, course_id, false).await?.is_none() {
        return Err(AppError::not_found(format!("course {course_id}")));
    }

    let layout = db::certificates::upsert_layout(
        &state.pool,
        course_id,
        body.background_url.trim(),
        body.width,
        body.height,
        &body.fields,
    )
    .await?;
    Ok(HttpResponse::Ok().json(layout))
}

#[get("/courses/{id}/certificate-layout")]
pub async fn get_layout(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let course_id = path.into_inner();
    match db::certificates::get_layout(&state.pool, course_id).await? {
        Some(layout) => Ok(HttpResponse::Ok().json(layout)),
        None => Ok(HttpResponse::Ok().json(json!({ "course_id": course_id, "fields": [] }))),
    }
}
