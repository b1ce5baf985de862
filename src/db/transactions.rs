// src/db/transactions.rs
//
// Loads every money-bearing row as a TransactionSource for the dashboards.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::status::TransactionKind;
use crate::transactions::TransactionSource;

#[derive(Debug, FromRow)]
struct SourceRow {
    record_id: i32,
    gateway_order_id: Option<String>,
    customer_name: String,
    customer_email: String,
    description: String,
    amount: i64,
    currency: String,
    payment_status: String,
    fulfilment_status: Option<String>,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl SourceRow {
    fn into_source(self, kind: TransactionKind) -> TransactionSource {
        TransactionSource {
            kind,
            record_id: self.record_id,
            gateway_order_id: self.gateway_order_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            description: self.description,
            amount: self.amount,
            currency: self.currency,
            payment_status: self.payment_status,
            fulfilment_status: self.fulfilment_status,
            created_at: self.created_at,
            settled_at: self.settled_at,
        }
    }
}

const PURCHASES_SQL: &str = r#"
    SELECT p.id AS record_id, p.gateway_order_id, u.name AS customer_name, u.email AS customer_email,
           c.title AS description, p.amount, p.currency, p.status AS payment_status,
           NULL::text AS fulfilment_status, p.created_at, p.completed_at AS settled_at
    FROM purchases p
    JOIN users u ON u.id = p.user_id
    JOIN courses c ON c.id = p.course_id"#;

const ORDERS_SQL: &str = r#"
    SELECT o.id AS record_id, o.gateway_order_id, o.customer_name, o.customer_email,
           'Shop order #' || o.id AS description, o.total AS amount, o.currency,
           o.payment_status, o.status AS fulfilment_status, o.created_at,
           COALESCE(o.paid_at, CASE WHEN o.status = 'delivered' THEN o.delivered_at END) AS settled_at
    FROM orders o"#;

const SONGS_SQL: &str = r#"
    SELECT s.id AS record_id, s.gateway_order_id, s.customer_name, s.customer_email,
           'Custom song: ' || s.occasion || ' for ' || s.recipient_name AS description,
           s.price AS amount, s.currency, s.payment_status, NULL::text AS fulfilment_status,
           s.created_at, s.paid_at AS settled_at
    FROM custom_song_orders s"#;

async fn load(pool: &PgPool, sql: &str, kind: TransactionKind) -> Result<Vec<TransactionSource>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SourceRow>(sql).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|r| r.into_source(kind)).collect())
}

pub async fn load_sources(pool: &PgPool) -> Result<Vec<TransactionSource>, sqlx::Error> {
    let mut sources = load(pool, PURCHASES_SQL, TransactionKind::Course).await?;
    sources.extend(load(pool, ORDERS_SQL, TransactionKind::Shop).await?);
    sources.extend(load(pool, SONGS_SQL, TransactionKind::CustomSong).await?);
    Ok(sources)
}
