// src/db/custom_songs.rs

use sqlx::{PgExecutor, PgPool};

use crate::models::CustomSongOrder;

const SONG_COLUMNS: &str = "id, user_id, customer_name, customer_email, occasion, recipient_name, details, price, \
     currency, status, needs_approval, is_approved, preview_url, full_audio_url, payment_status, gateway_order_id, \
     gateway_payment_id, order_id_history, payment_reset_count, paid_at, completed_at, created_at, updated_at";

pub struct NewCustomSong<'a> {
    pub user_id: Option<i32>,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub occasion: &'a str,
    pub recipient_name: &'a str,
    pub details: Option<&'a str>,
    pub price: i64,
    pub currency: &'a str,
}

pub async fn create_song(conn: impl PgExecutor<'_>, song: &NewCustomSong<'_>) -> Result<CustomSongOrder, sqlx::Error> {
    let sql = format!(
        r#"INSERT INTO custom_song_orders
               (user_id, customer_name, customer_email, occasion, recipient_name, details, price, currency)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING {SONG_COLUMNS}"#
    );
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(song.user_id)
        .bind(song.customer_name)
        .bind(song.customer_email)
        .bind(song.occasion)
        .bind(song.recipient_name)
        .bind(song.details)
        .bind(song.price)
        .bind(song.currency)
        .fetch_one(conn)
        .await
}

pub async fn list_songs(pool: &PgPool) -> Result<Vec<CustomSongOrder>, sqlx::Error> {
    let sql = format!("SELECT {SONG_COLUMNS} FROM custom_song_orders ORDER BY created_at DESC");
    sqlx::query_as::<_, CustomSongOrder>(&sql).fetch_all(pool).await
}

pub async fn get_song(pool: &PgPool, song_id: i32) -> Result<Option<CustomSongOrder>, sqlx::Error> {
    let sql = format!("SELECT {SONG_COLUMNS} FROM custom_song_orders WHERE id = $1");
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(song_id)
        .fetch_optional(pool)
        .await
}

/// Matches the current gateway order id or any archived one.
pub async fn find_by_gateway_order(pool: &PgPool, gateway_order_id: &str) -> Result<Option<CustomSongOrder>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {SONG_COLUMNS} FROM custom_song_orders
           WHERE gateway_order_id = $1 OR $1 = ANY(order_id_history)
           ORDER BY (gateway_order_id = $1) DESC NULLS LAST
           LIMIT 1"#
    );
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(gateway_order_id)
        .fetch_optional(pool)
        .await
}

/// `completed_at` is stamped the first time status becomes `completed`.
pub async fn update_song(
    pool: &PgPool,
    song_id: i32,
    status: Option<&str>,
    preview_url: Option<&str>,
    full_audio_url: Option<&str>,
) -> Result<Option<CustomSongOrder>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE custom_song_orders
           SET status = COALESCE($2, status),
               preview_url = COALESCE($3, preview_url),
               full_audio_url = COALESCE($4, full_audio_url),
               completed_at = CASE WHEN $2 = 'completed' THEN COALESCE(completed_at, NOW()) ELSE completed_at END,
               updated_at = NOW()
           WHERE id = $1
           RETURNING {SONG_COLUMNS}"#
    );
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(song_id)
        .bind(status)
        .bind(preview_url)
        .bind(full_audio_url)
        .fetch_optional(pool)
        .await
}

pub async fn approve(pool: &PgPool, song_id: i32) -> Result<Option<CustomSongOrder>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE custom_song_orders
           SET is_approved = TRUE, updated_at = NOW()
           WHERE id = $1
           RETURNING {SONG_COLUMNS}"#
    );
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(song_id)
        .fetch_optional(pool)
        .await
}

/// Archives the current gateway order id and puts the song back to pending.
pub async fn reset_payment(pool: &PgPool, song_id: i32) -> Result<Option<CustomSongOrder>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE custom_song_orders
           SET order_id_history = CASE
                   WHEN gateway_order_id IS NULL THEN order_id_history
                   ELSE array_append(order_id_history, gateway_order_id)
               END,
               gateway_order_id = NULL,
               gateway_payment_id = NULL,
               payment_status = 'pending',
               paid_at = NULL,
               payment_reset_count = payment_reset_count + 1,
               updated_at = NOW()
           WHERE id = $1
           RETURNING {SONG_COLUMNS}"#
    );
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(song_id)
        .fetch_optional(pool)
        .await
}

/// Points an unpaid song at a new gateway order, archiving the previous id.
/// Returns None when the song is unknown or already paid.
pub async fn attach_gateway_order(
    conn: impl PgExecutor<'_>,
    song_id: i32,
    gateway_order_id: &str,
) -> Result<Option<CustomSongOrder>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE custom_song_orders
           SET order_id_history = CASE
                   WHEN gateway_order_id IS NULL THEN order_id_history
                   ELSE array_append(order_id_history, gateway_order_id)
               END,
               gateway_order_id = $2,
               payment_status = 'pending',
               updated_at = NOW()
           WHERE id = $1 AND payment_status <> 'paid'
           RETURNING {SONG_COLUMNS}"#
    );
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(song_id)
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await
}

/// Returns the song only if this call moved it to `paid`.
pub async fn mark_paid(
    pool: &PgPool,
    song_id: i32,
    gateway_payment_id: Option<&str>,
) -> Result<Option<CustomSongOrder>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE custom_song_orders
           SET payment_status = 'paid', gateway_payment_id = COALESCE($2, gateway_payment_id),
               paid_at = NOW(), updated_at = NOW()
           WHERE id = $1 AND payment_status <> 'paid'
           RETURNING {SONG_COLUMNS}"#
    );
    sqlx::query_as::<_, CustomSongOrder>(&sql)
        .bind(song_id)
        .bind(gateway_payment_id)
        .fetch_optional(pool)
        .await
}

pub async fn mark_failed(pool: &PgPool, song_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE custom_song_orders SET payment_status = 'failed', updated_at = NOW()
           WHERE id = $1 AND payment_status = 'pending'"#,
    )
    .bind(song_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
