// src/api/catalog.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::db::catalog::{ProductInput, ProductQuery};
use crate::error::{AppError, AppResult};
use crate::{db, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct NameRequest {
    pub name: String,
}

impl NameRequest {
    fn validated(&self) -> AppResult<&str> {
        let name = self.name.trim();
        if name.is_empty() || db::slugify(name).is_empty() {
            return Err(AppError::bad_request("name must contain at least one letter or digit"));
        }
        Ok(name)
    }
}

fn deleted(what: String, found: bool) -> AppResult<HttpResponse> {
    if found {
        Ok(HttpResponse::Ok().json(json!({ "success": true })))
    } else {
        Err(AppError::not_found(what))
    }
}

#[get("/products")]
pub async fn list_products(state: web::Data<AppState>, query: web::Query<ProductQuery>) -> AppResult<HttpResponse> {
    let products = db::catalog::list_products(&state.pool, true, &query).await?;
    Ok(HttpResponse::Ok().json(products))
}

#[get("/products/{id}")]
pub async fn get_product(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let detail = db::catalog::get_product_detail(&state.pool, id, true)
        .await?
        .ok_or_else(|| AppError::not_found(format!("product {id}")))?;
    Ok(HttpResponse::Ok().json(detail))
}

#[get("/categories")]
pub async fn list_categories(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(db::catalog::list_categories(&state.pool).await?))
}

#[get("/tags")]
pub async fn list_tags(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(db::catalog::list_tags(&state.pool).await?))
}

#[get("/products")]
pub async fn admin_list_products(
    state: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> AppResult<HttpResponse> {
    let products = db::catalog::list_products(&state.pool, false, &query).await?;
    Ok(HttpResponse::Ok().json(products))
}

#[post("/products")]
pub async fn create_product(state: web::Data<AppState>, body: web::Json<ProductInput>) -> AppResult<HttpResponse> {
    body.validate().map_err(AppError::BadRequest)?;
    let id = db::catalog::create_product(&state.pool, &body).await?;
    log::info!("product created id={id}");

    let detail = db::catalog::get_product_detail(&state.pool, id, false)
        .await?
        .ok_or_else(|| AppError::not_found(format!("product {id}")))?;
    Ok(HttpResponse::Created().json(detail))
}

#[put("/products/{id}")]
pub async fn update_product(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<ProductInput>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    body.validate().map_err(AppError::BadRequest)?;
    if !db::catalog::update_product(&state.pool, id, &body).await? {
        return Err(AppError::not_found(format!("product {id}")));
    }
    let detail = db::catalog::get_product_detail(&state.pool, id, false)
        .await?
        .ok_or_else(|| AppError::not_found(format!("product {id}")))?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    tag = "admin",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Deleted: {\"success\": true}"),
        (status = 404, description = "No such product")
    )
)]
#[delete("/products/{id}")]
pub async fn delete_product(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let found = db::catalog::delete_product(&state.pool, id).await?;
    if found {
        log::info!("product deleted id={id}");
    }
    deleted(format!("product {id}"), found)
}

#[post("/categories")]
pub async fn create_category(state: web::Data<AppState>, body: web::Json<NameRequest>) -> AppResult<HttpResponse> {
    let name = body.validated()?;
    let category = db::catalog::create_category(&state.pool, name).await?;
    Ok(HttpResponse::Created().json(category))
}

#[delete("/categories/{id}")]
pub async fn delete_category(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let found = db::catalog::delete_category(&state.pool, id).await?;
    deleted(format!("category {id}"), found)
}

#[post("/tags")]
pub async fn create_tag(state: web::Data<AppState>, body: web::Json<NameRequest>) -> AppResult<HttpResponse> {
    let name = body.validated()?;
    let tag = db::catalog::create_tag(&state.pool, name).await?;
    Ok(HttpResponse::Created().json(tag))
}

#[delete("/tags/{id}")]
pub async fn delete_tag(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let found = db::catalog::delete_tag(&state.pool, id).await?;
    deleted(format!("tag {id}"), found)
}
