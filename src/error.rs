// src/error.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::api::gateway_client::GatewayError;
use crate::mail::MailError;
use crate::video::VideoLookupError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("video lookup failed: {0}")]
    VideoLookup(#[from] VideoLookupError),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(format!("{} not found", what.into()))
    }
}

/// Postgres unique_violation.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres foreign_key_violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return Self::NotFound("record not found".to_string());
        }
        let code = err.as_database_error().and_then(|db| db.code());
        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => return Self::Conflict("record already exists".to_string()),
            Some(FOREIGN_KEY_VIOLATION) => return Self::Conflict("record is still referenced".to_string()),
            _ => {}
        }
        Self::Database(err)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Gateway(_) | AppError::VideoLookup(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Mail(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("request failed: {self}");
            match self {
                // upstream messages are useful to the admin UI, db internals are not
                AppError::Gateway(_) | AppError::VideoLookup(_) => self.to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({ "error": message }))
    }
}
