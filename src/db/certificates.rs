// src/db/certificates.rs

use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::{Certificate, CertificateLayout, LayoutField};

const CERTIFICATE_COLUMNS: &str = "id, certificate_id, user_id, course_id, user_name, course_title, issued_at";

pub async fn get_for_user_course(pool: &PgPool, user_id: i32, course_id: i32) -> Result<Option<Certificate>, sqlx::Error> {
    let sql = format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE user_id = $1 AND course_id = $2");
    sqlx::query_as::<_, Certificate>(&sql)
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_by_certificate_id(pool: &PgPool, certificate_id: &str) -> Result<Option<Certificate>, sqlx::Error> {
    let sql = format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE certificate_id = $1");
    sqlx::query_as::<_, Certificate>(&sql)
        .bind(certificate_id)
        .fetch_optional(pool)
        .await
}

/// Inserts unless the user already holds a certificate for the course, in
/// which case the existing one is returned.
pub async fn issue(
    pool: &PgPool,
    certificate_id: &str,
    user_id: i32,
    course_id: i32,
    user_name: &str,
    course_title: &str,
) -> Result<(Certificate, bool), sqlx::Error> {
    let sql = format!(
        r#"INSERT INTO certificates (certificate_id, user_id, course_id, user_name, course_title)
           VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (user_id, course_id) DO NOTHING
           RETURNING {CERTIFICATE_COLUMNS}"#
    );
    let inserted = sqlx::query_as::<_, Certificate>(&sql)
        .bind(certificate_id)
        .bind(user_id)
        .bind(course_id)
        .bind(user_name)
        .bind(course_title)
        .fetch_optional(pool)
        .await?;

    match inserted {
        Some(cert) => Ok((cert, true)),
        None => {
            let existing = get_for_user_course(pool, user_id, course_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            Ok((existing, false))
        }
    }
}

pub async fn get_layout(pool: &PgPool, course_id: i32) -> Result<Option<CertificateLayout>, sqlx::Error> {
    sqlx::query_as::<_, CertificateLayout>(
        "SELECT course_id, background_url, width, height, fields, updated_at FROM certificate_layouts WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub async fn upsert_layout(
    pool: &PgPool,
    course_id: i32,
    background_url: &str,
    width: i32,
    height: i32,
    fields: &[LayoutField],
) -> Result<CertificateLayout, sqlx::Error> {
    sqlx::query_as::<_, CertificateLayout>(
        r#"INSERT INTO certificate_layouts (course_id, background_url, width, height, fields)
           VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (course_id)
           DO UPDATE SET background_url = EXCLUDED.background_url,
                         width = EXCLUDED.width,
                         height = EXCLUDED.height,
                         fields = EXCLUDED.fields,
                         updated_at = NOW()
           RETURNING course_id, background_url, width, height, fields, updated_at"#,
    )
    .bind(course_id)
    .bind(background_url)
    .bind(width)
    .bind(height)
    .bind(Json(fields))
    .fetch_one(pool)
    .await
}
