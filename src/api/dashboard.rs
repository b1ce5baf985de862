// src/api/dashboard.rs

use actix_web::{get, web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::transactions::{apply_filter, summarize, Transaction, TransactionFilter};
use crate::{db, revenue, AppState};

pub const DEFAULT_REVENUE_DAYS: u32 = 30;
pub const MAX_REVENUE_DAYS: u32 = 366;

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub days: Option<u32>,
    /// Last day of the window; defaults to today (UTC).
    pub end: Option<NaiveDate>,
}

async fn load_transactions(state: &AppState) -> AppResult<Vec<Transaction>> {
    let sources = db::transactions::load_sources(&state.pool).await?;
    Ok(sources.into_iter().map(Transaction::from).collect())
}

#[get("/transactions")]
pub async fn list_transactions(
    state: web::Data<AppState>,
    query: web::Query<TransactionFilter>,
) -> AppResult<HttpResponse> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::bad_request("from must not be after to"));
        }
    }

    let transactions = apply_filter(load_transactions(&state).await?, &query);
    let summary = summarize(&transactions);
    Ok(HttpResponse::Ok().json(json!({
        "transactions": transactions,
        "summary": summary,
    })))
}

#[utoipa::path(
    get,
    path = "/api/admin/revenue",
    tag = "admin",
    params(
        ("days" = Option<u32>, Query, description = "Window length in days, 1..=366"),
        ("end" = Option<String>, Query, description = "Last day (YYYY-MM-DD), default today")
    ),
    responses(
        (status = 200, description = "Daily paid revenue by effective date"),
        (status = 400, description = "Window out of range")
    )
)]
#[get("/revenue")]
pub async fn revenue_report(state: web::Data<AppState>, query: web::Query<RevenueQuery>) -> AppResult<HttpResponse> {
    let days = query.days.unwrap_or(DEFAULT_REVENUE_DAYS);
    if days == 0 || days > MAX_REVENUE_DAYS {
        return Err(AppError::bad_request(format!("days must be between 1 and {MAX_REVENUE_DAYS}")));
    }
    let end = query.end.unwrap_or_else(|| Utc::now().date_naive());

    let transactions = load_transactions(&state).await?;
    let report = revenue::report(&transactions, end, days, state.chart_max_points);
    Ok(HttpResponse::Ok().json(report))
}
