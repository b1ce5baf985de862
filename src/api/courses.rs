// src/api/courses.rs

use std::collections::HashMap;

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::api::gateway_client::CreateOrderRequest;
use crate::certificate::Progress;
use crate::db::courses::CourseInput;
use crate::error::{AppError, AppResult};
use crate::{db, mail, templating, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserRequest {
    pub user_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgressRequest {
    pub user_id: i32,
    pub video_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub user_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressSummary {
    pub course_id: i32,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub all_complete: bool,
    pub completed_video_ids: Vec<i32>,
    pub review_submitted: bool,
    pub certificate_id: Option<String>,
}

pub(crate) async fn progress_summary(state: &AppState, user_id: i32, course_id: i32) -> AppResult<ProgressSummary> {
    let total = db::courses::count_videos(&state.pool, course_id).await?;
    let completed_video_ids = db::learning::completed_video_ids(&state.pool, user_id, course_id).await?;
    let review_submitted = db::learning::get_review(&state.pool, user_id, course_id).await?.is_some();
    let certificate_id = db::certificates::get_for_user_course(&state.pool, user_id, course_id)
        .await?
        .map(|c| c.certificate_id);

    let progress = Progress {
        completed: completed_video_ids.len(),
        total: total.max(0) as usize,
    };

    Ok(ProgressSummary {
        course_id,
        completed: progress.completed,
        total: progress.total,
        percent: progress.percent(),
        all_complete: progress.all_complete(),
        completed_video_ids,
        review_submitted,
        certificate_id,
    })
}

async fn require_purchase(state: &AppState, user_id: i32, course_id: i32) -> AppResult<()> {
    if db::learning::has_completed_purchase(&state.pool, user_id, course_id).await? {
        Ok(())
    } else {
        Err(AppError::bad_request("course has not been purchased"))
    }
}

// ---- public ----

#[utoipa::path(get, path = "/api/courses", tag = "courses", responses((status = 200, description = "Published courses")))]
#[get("/courses")]
pub async fn list_courses(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let courses = db::courses::list_courses(&state.pool, true).await?;
    Ok(HttpResponse::Ok().json(courses))
}

#[get("/courses/{id}")]
pub async fn get_course(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let detail = db::courses::get_course_detail(&state.pool, id, true)
        .await?
        .ok_or_else(|| AppError::not_found(format!("course {id}")))?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Free courses are enrolled straight away; paid ones get a gateway order
/// the client completes before calling `/api/payments/verify`.
#[utoipa::path(
    post,
    path = "/api/courses/{id}/purchase",
    tag = "courses",
    params(("id" = i32, Path, description = "Course id")),
    request_body = UserRequest,
    responses(
        (status = 200, description = "Pending purchase with gateway order, or completed free enrolment"),
        (status = 404, description = "Unknown course or user"),
        (status = 409, description = "Already purchased")
    )
)]
#[post("/courses/{id}/purchase")]
pub async fn purchase_course(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UserRequest>,
) -> AppResult<HttpResponse> {
    let course_id = path.into_inner();
    let user_id = body.user_id;

    let course = db::courses::get_course(&state.pool, course_id, true)
        .await?
        .ok_or_else(|| AppError::not_found(format!("course {course_id}")))?;
    let user = db::users::get_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

    if db::learning::has_completed_purchase(&state.pool, user_id, course_id).await? {
        return Err(AppError::Conflict("course already purchased".into()));
    }

    if course.price == 0 {
        let purchase = db::learning::create_free_purchase(&state.pool, user_id, course_id, &course.currency).await?;
        log::info!("free enrolment user_id={user_id} course_id={course_id}");
        mail::notify(
            &state.pool,
            state.mailer.as_ref(),
            templating::COURSE_PURCHASE_CONFIRMATION,
            &user.email,
            mail::vars([
                ("userName", user.name.clone()),
                ("courseTitle", course.title.clone()),
                ("amount", mail::format_amount(0, &course.currency)),
                ("courseUrl", format!("{}/courses/{}", state.site_url, course.id)),
            ]),
        )
        .await;
        return Ok(HttpResponse::Ok().json(json!({ "purchase": purchase, "gateway_order": null })));
    }

    let mut notes = HashMap::new();
    notes.insert("kind".to_string(), "course".to_string());
    notes.insert("course_id".to_string(), course_id.to_string());
    notes.insert("user_id".to_string(), user_id.to_string());

    let order = state
        .gateway
        .create_order(CreateOrderRequest {
            amount: course.price,
            currency: course.currency.clone(),
            receipt: format!("course-{course_id}-user-{user_id}"),
            notes,
        })
        .await?;

    let purchase = db::learning::upsert_pending_purchase(
        &state.pool,
        user_id,
        course_id,
        course.price,
        &course.currency,
        &order.id,
    )
    .await?
    .ok_or_else(|| AppError::Conflict("course already purchased".into()))?;

    log::info!(
        "course purchase pending user_id={} course_id={} gateway_order_id={}",
        user_id,
        course_id,
        order.id
    );

    Ok(HttpResponse::Ok().json(json!({
        "purchase": purchase,
        "gateway_order": order,
        "key_id": state.gateway.key_id(),
    })))
}

#[post("/courses/{id}/progress")]
pub async fn mark_progress(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<ProgressRequest>,
) -> AppResult<HttpResponse> {
    let course_id = path.into_inner();
    require_purchase(&state, body.user_id, course_id).await?;

    if !db::courses::video_in_course(&state.pool, course_id, body.video_id).await? {
        return Err(AppError::not_found(format!("video {} in course {course_id}", body.video_id)));
    }

    let progress = db::learning::mark_video_complete(&state.pool, body.user_id, body.video_id).await?;
    log::debug!(
        "video {} complete for user {} since {}",
        progress.video_id,
        progress.user_id,
        progress.completed_at
    );
    let summary = progress_summary(&state, body.user_id, course_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/courses/{id}/progress")]
pub async fn get_progress(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<UserQuery>,
) -> AppResult<HttpResponse> {
    let course_id = path.into_inner();
    require_purchase(&state, query.user_id, course_id).await?;
    let summary = progress_summary(&state, query.user_id, course_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[post("/courses/{id}/review")]
pub async fn submit_review(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<ReviewRequest>,
) -> AppResult<HttpResponse> {
    let course_id = path.into_inner();
    if !(1..=5).contains(&body.rating) {
        return Err(AppError::bad_request("rating must be between 1 and 5"));
    }
    require_purchase(&state, body.user_id, course_id).await?;

    let comment = body.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let review = db::learning::insert_review(&state.pool, body.user_id, course_id, body.rating, comment)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("review already submitted".into()),
            other => other,
        })?;

    Ok(HttpResponse::Created().json(review))
}

// ---- admin ----

#[get("/courses")]
pub async fn admin_list_courses(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let courses = db::courses::list_courses(&state.pool, false).await?;
    Ok(HttpResponse::Ok().json(courses))
}

#[get("/courses/{id}")]
pub async fn admin_get_course(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let detail = db::courses::get_course_detail(&state.pool, id, false)
        .await?
        .ok_or_else(|| AppError::not_found(format!("course {id}")))?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    post,
    path = "/api/admin/courses",
    tag = "admin",
    request_body = CourseInput,
    responses(
        (status = 201, description = "Course created with its curriculum"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Slug already taken")
    )
)]
#[post("/courses")]
pub async fn create_course(state: web::Data<AppState>, body: web::Json<CourseInput>) -> AppResult<HttpResponse> {
    body.validate().map_err(AppError::BadRequest)?;

    let id = db::courses::create_course(&state.pool, &body).await?;
    log::info!("course created id={id} slug={}", body.slug());

    let detail = db::courses::get_course_detail(&state.pool, id, false)
        .await?
        .ok_or_else(|| AppError::not_found(format!("course {id}")))?;
    Ok(HttpResponse::Created().json(detail))
}

#[put("/courses/{id}")]
pub async fn update_course(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<CourseInput>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    body.validate().map_err(AppError::BadRequest)?;

    if !db::courses::update_course(&state.pool, id, &body).await? {
        return Err(AppError::not_found(format!("course {id}")));
    }

    let detail = db::courses::get_course_detail(&state.pool, id, false)
        .await?
        .ok_or_else(|| AppError::not_found(format!("course {id}")))?;
    Ok(HttpResponse::Ok().json(detail))
}

#[delete("/courses/{id}")]
pub async fn delete_course(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<DeleteQuery>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let deleted = if query.hard {
        if db::courses::has_purchases(&state.pool, id).await? {
            return Err(AppError::Conflict(format!(
                "course {id} has purchases; soft delete it instead"
            )));
        }
        db::courses::hard_delete_course(&state.pool, id).await?
    } else {
        db::courses::soft_delete_course(&state.pool, id).await?
    };

    if !deleted {
        return Err(AppError::not_found(format!("course {id}")));
    }
    log::info!("course deleted id={id} hard={}", query.hard);
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
