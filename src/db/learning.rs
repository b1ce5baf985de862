// src/db/learning.rs
//
// Course purchases, video progress and reviews.

use sqlx::{PgPool, Row};

use crate::models::{CourseReview, Purchase, VideoProgress};

const PURCHASE_COLUMNS: &str = "id, user_id, course_id, amount, currency, status, gateway_order_id, \
     gateway_payment_id, order_id_history, created_at, completed_at";

pub async fn get_purchase_by_id(pool: &PgPool, purchase_id: i32) -> Result<Option<Purchase>, sqlx::Error> {
    let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1");
    sqlx::query_as::<_, Purchase>(&sql)
        .bind(purchase_id)
        .fetch_optional(pool)
        .await
}

/// Matches the current gateway order id or any archived one.
pub async fn find_purchase_by_gateway_order(pool: &PgPool, gateway_order_id: &str) -> Result<Option<Purchase>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {PURCHASE_COLUMNS} FROM purchases
           WHERE gateway_order_id = $1 OR $1 = ANY(order_id_history)
           ORDER BY (gateway_order_id = $1) DESC NULLS LAST
           LIMIT 1"#
    );
    sqlx::query_as::<_, Purchase>(&sql)
        .bind(gateway_order_id)
        .fetch_optional(pool)
        .await
}

/// Creates the pending purchase, or points an unfinished one at a new
/// gateway order and archives the previous id so a late payment against it
/// still settles. Returns None when the purchase is already completed.
pub async fn upsert_pending_purchase(
    pool: &PgPool,
    user_id: i32,
    course_id: i32,
    amount: i64,
    currency: &str,
    gateway_order_id: &str,
) -> Result<Option<Purchase>, sqlx::Error> {
    let sql = format!(
        r#"INSERT INTO purchases (user_id, course_id, amount, currency, status, gateway_order_id)
           VALUES ($1, $2, $3, $4, 'pending', $5)
           ON CONFLICT (user_id, course_id)
           DO UPDATE SET amount = EXCLUDED.amount,
                         currency = EXCLUDED.currency,
                         status = 'pending',
                         order_id_history = CASE
                             WHEN purchases.gateway_order_id IS NULL
                                  OR purchases.gateway_order_id = EXCLUDED.gateway_order_id
                                 THEN purchases.order_id_history
                             ELSE array_append(purchases.order_id_history, purchases.gateway_order_id)
                         END,
                         gateway_order_id = EXCLUDED.gateway_order_id,
                         gateway_payment_id = NULL
           WHERE purchases.status <> 'completed'
           RETURNING {PURCHASE_COLUMNS}"#
    );
    sqlx::query_as::<_, Purchase>(&sql)
        .bind(user_id)
        .bind(course_id)
        .bind(amount)
        .bind(currency)
        .bind(gateway_order_id)
        .fetch_optional(pool)
        .await
}

/// Enrolment without payment (free courses).
pub async fn create_free_purchase(pool: &PgPool, user_id: i32, course_id: i32, currency: &str) -> Result<Purchase, sqlx::Error> {
    let sql = format!(
        r#"INSERT INTO purchases (user_id, course_id, amount, currency, status, completed_at)
           VALUES ($1, $2, 0, $3, 'completed', NOW())
           ON CONFLICT (user_id, course_id)
           DO UPDATE SET status = 'completed', completed_at = COALESCE(purchases.completed_at, NOW())
           RETURNING {PURCHASE_COLUMNS}"#
    );
    sqlx::query_as::<_, Purchase>(&sql)
        .bind(user_id)
        .bind(course_id)
        .bind(currency)
        .fetch_one(pool)
        .await
}

/// Returns the purchase only if this call completed it.
pub async fn complete_purchase(
    pool: &PgPool,
    purchase_id: i32,
    gateway_payment_id: Option<&str>,
) -> Result<Option<Purchase>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE purchases
           SET status = 'completed', gateway_payment_id = COALESCE($2, gateway_payment_id), completed_at = NOW()
           WHERE id = $1 AND status <> 'completed'
           RETURNING {PURCHASE_COLUMNS}"#
    );
    sqlx::query_as::<_, Purchase>(&sql)
        .bind(purchase_id)
        .bind(gateway_payment_id)
        .fetch_optional(pool)
        .await
}

pub async fn fail_purchase(pool: &PgPool, purchase_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE purchases SET status = 'failed' WHERE id = $1 AND status = 'pending'")
        .bind(purchase_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn has_completed_purchase(pool: &PgPool, user_id: i32, course_id: i32) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT EXISTS (
               SELECT 1 FROM purchases WHERE user_id = $1 AND course_id = $2 AND status = 'completed'
           ) AS found"#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get("found"))
}

/// Idempotent; a repeat keeps the original completion time.
pub async fn mark_video_complete(pool: &PgPool, user_id: i32, video_id: i32) -> Result<VideoProgress, sqlx::Error> {
    sqlx::query_as::<_, VideoProgress>(
        r#"INSERT INTO video_progress (user_id, video_id)
           VALUES ($1, $2)
           ON CONFLICT (user_id, video_id) DO UPDATE SET completed_at = video_progress.completed_at
           RETURNING user_id, video_id, completed_at"#,
    )
    .bind(user_id)
    .bind(video_id)
    .fetch_one(pool)
    .await
}

pub async fn completed_video_count(pool: &PgPool, user_id: i32, course_id: i32) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS completed
           FROM video_progress p
           JOIN course_videos v ON v.id = p.video_id
           JOIN course_sections s ON s.id = v.section_id
           WHERE p.user_id = $1 AND s.course_id = $2"#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get("completed"))
}

pub async fn completed_video_ids(pool: &PgPool, user_id: i32, course_id: i32) -> Result<Vec<i32>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT p.video_id
           FROM video_progress p
           JOIN course_videos v ON v.id = p.video_id
           JOIN course_sections s ON s.id = v.section_id
           WHERE p.user_id = $1 AND s.course_id = $2
           ORDER BY s.position, v.position"#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.get("video_id")).collect())
}

pub async fn get_review(pool: &PgPool, user_id: i32, course_id: i32) -> Result<Option<CourseReview>, sqlx::Error> {
    sqlx::query_as::<_, CourseReview>(
        r#"SELECT id, user_id, course_id, rating, comment, created_at
           FROM course_reviews WHERE user_id = $1 AND course_id = $2"#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

/// Unique per user and course; a second review is a conflict.
pub async fn insert_review(
    pool: &PgPool,
    user_id: i32,
    course_id: i32,
    rating: i16,
    comment: Option<&str>,
) -> Result<CourseReview, sqlx::Error> {
    sqlx::query_as::<_, CourseReview>(
        r#"INSERT INTO course_reviews (user_id, course_id, rating, comment)
           VALUES ($1, $2, $3, $4)
           RETURNING id, user_id, course_id, rating, comment, created_at"#,
    )
    .bind(user_id)
    .bind(course_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(pool)
    .await
}
