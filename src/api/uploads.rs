// src/api/uploads.rs

use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures_util::StreamExt;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::storage::{image_extension, object_key, sanitize, MAX_IMAGE_BYTES, UPLOAD_FOLDERS};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

#[utoipa::path(
    post,
    path = "/api/admin/uploads/{folder}",
    tag = "admin",
    params(("folder" = String, Path, description = "products | courses | custom-songs | certificates")),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing file, wrong type, too large or unknown folder"),
        (status = 500, description = "Storage error")
    )
)]
#[post("/uploads/{folder}")]
pub async fn upload_image(
    state: web::Data<AppState>,
    path: web::Path<String>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let folder = path.into_inner();
    if !UPLOAD_FOLDERS.contains(&folder.as_str()) {
        return Err(AppError::bad_request(format!("unknown upload folder {folder:?}")));
    }

    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::bad_request(format!("invalid multipart body: {e}")))?;

        let Some(filename) = field.content_disposition().get_filename().map(sanitize) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        if image_extension(&content_type).is_none() {
            return Err(AppError::bad_request(format!("unsupported content type {content_type:?}")));
        }

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| AppError::bad_request(format!("upload interrupted: {e}")))?;
            if bytes.len() + data.len() > MAX_IMAGE_BYTES {
                return Err(AppError::bad_request(format!(
                    "file exceeds {} MiB",
                    MAX_IMAGE_BYTES / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&data);
        }

        file = Some((filename, content_type, bytes));
        break;
    }

    let Some((filename, content_type, bytes)) = file else {
        return Err(AppError::bad_request("no file uploaded"));
    };
    if bytes.is_empty() {
        return Err(AppError::bad_request("uploaded file is empty"));
    }

    let extension = image_extension(&content_type).unwrap_or("bin");
    let key = object_key(&folder, &filename, extension);
    let url = state
        .storage
        .put_object(&key, &content_type, bytes)
        .await
        .map_err(AppError::Storage)?;

    log::info!("uploaded {key}");
    Ok(HttpResponse::Ok().json(UploadResponse { url, key }))
}
