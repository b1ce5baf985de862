// src/api/email_templates.rs

use std::collections::HashMap;

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::db::email_templates::TemplateInput;
use crate::error::{AppError, AppResult};
use crate::mail::{EmailMessage, MailClient};
use crate::models::TemplateVariable;
use crate::templating::Preview;
use crate::{db, templating, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PreviewRequest {
    pub subject: String,
    pub html_body: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TestSendRequest {
    pub to: String,
    /// Overrides the declared example values.
    #[serde(default)]
    pub values: HashMap<String, String>,
}

fn conflict_on_name(err: sqlx::Error, name: &str) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict(format!("template {name:?} already exists")),
        other => other,
    }
}

#[get("/email-templates")]
pub async fn list_templates(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(db::email_templates::list_templates(&state.pool).await?))
}

#[get("/email-templates/{id}")]
pub async fn get_template(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let template = db::email_templates::get_template(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("email template {id}")))?;
    Ok(HttpResponse::Ok().json(template))
}

#[post("/email-templates")]
pub async fn create_template(state: web::Data<AppState>, body: web::Json<TemplateInput>) -> AppResult<HttpResponse> {
    body.validate().map_err(AppError::BadRequest)?;
    let template = db::email_templates::create_template(&state.pool, &body)
        .await
        .map_err(|e| conflict_on_name(e, body.name.trim()))?;
    log::info!("email template created name={}", template.name);
    Ok(HttpResponse::Created().json(template))
}

#[put("/email-templates/{id}")]
pub async fn update_template(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<TemplateInput>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    body.validate().map_err(AppError::BadRequest)?;
    let template = db::email_templates::update_template(&state.pool, id, &body)
        .await
        .map_err(|e| conflict_on_name(e, body.name.trim()))?
        .ok_or_else(|| AppError::not_found(format!("email template {id}")))?;
    Ok(HttpResponse::Ok().json(template))
}

#[delete("/email-templates/{id}")]
pub async fn delete_template(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if !db::email_templates::delete_template(&state.pool, id).await? {
        return Err(AppError::not_found(format!("email template {id}")));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Upserts the built-in templates by name.
#[post("/email-templates/seed")]
pub async fn seed_templates(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let report = db::email_templates::seed(&state.pool, &templating::default_templates()).await?;
    log::info!(
        "email templates seeded inserted={} updated={}",
        report.inserted,
        report.updated
    );
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/admin/email-templates/preview",
    tag = "admin",
    request_body = PreviewRequest,
    responses((status = 200, description = "Rendered with example values", body = Preview))
)]
#[post("/email-templates/preview")]
pub async fn preview_adhoc(body: web::Json<PreviewRequest>) -> AppResult<HttpResponse> {
    let preview = templating::preview(&body.subject, &body.html_body, &body.variables);
    Ok(HttpResponse::Ok().json(preview))
}

#[get("/email-templates/{id}/preview")]
pub async fn preview_template(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let template = db::email_templates::get_template(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("email template {id}")))?;
    let preview = templating::preview(&template.subject, &template.html_body, &template.variables);
    Ok(HttpResponse::Ok().json(preview))
}

/// Sends the template rendered with example values, active or not.
#[post("/email-templates/{id}/test-send")]
pub async fn test_send(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<TestSendRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let to = body.to.trim();
    if !to.contains('@') {
        return Err(AppError::bad_request("to must be an email address"));
    }

    let template = db::email_templates::get_template(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("email template {id}")))?;

    let mut values = templating::example_values(&template.variables);
    values.extend(body.values.clone());

    state
        .mailer
        .send(EmailMessage {
            to: to.to_string(),
            subject: templating::render(&template.subject, &values),
            body_html: templating::render(&template.html_body, &values),
        })
        .await?;

    log::info!("test email for template {} sent to {to}", template.name);
    Ok(HttpResponse::Ok().json(json!({ "sent": true, "to": to })))
}
