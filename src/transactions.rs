//! Unified, read-only view over course purchases, shop orders and custom
//! song orders for the payments dashboards.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{normalize, PaymentState, TransactionKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub record_id: i32,
    /// Gateway order id when one exists, else a local `<kind>-<id>` reference.
    pub reference: String,
    pub customer_name: String,
    pub customer_email: String,
    pub description: String,
    pub amount: i64,
    pub currency: String,
    pub raw_status: String,
    pub state: PaymentState,
    pub badge_label: &'static str,
    pub badge_color: &'static str,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Fields every source row provides before normalization.
#[derive(Debug, Clone)]
pub struct TransactionSource {
    pub kind: TransactionKind,
    pub record_id: i32,
    pub gateway_order_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub description: String,
    pub amount: i64,
    pub currency: String,
    pub payment_status: String,
    pub fulfilment_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl From<TransactionSource> for Transaction {
    fn from(src: TransactionSource) -> Self {
        let state = normalize(src.kind, &src.payment_status, src.fulfilment_status.as_deref());
        let badge = state.badge();
        let reference = src
            .gateway_order_id
            .unwrap_or_else(|| format!("{}-{}", src.kind.as_str(), src.record_id));
        Self {
            kind: src.kind,
            record_id: src.record_id,
            reference,
            customer_name: src.customer_name,
            customer_email: src.customer_email,
            description: src.description,
            amount: src.amount,
            currency: src.currency,
            raw_status: src.payment_status,
            state,
            badge_label: badge.label,
            badge_color: badge.color,
            created_at: src.created_at,
            settled_at: src.settled_at,
        }
    }
}

impl Transaction {
    /// Settlement time for paid records, creation time otherwise.
    pub fn effective_at(&self) -> DateTime<Utc> {
        match (self.state, self.settled_at) {
            (PaymentState::Paid, Some(settled)) => settled,
            _ => self.created_at,
        }
    }

    pub fn effective_date(&self) -> NaiveDate {
        self.effective_at().date_naive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub state: Option<PaymentState>,
    /// Inclusive, compared against the effective date.
    pub from: Option<NaiveDate>,
    /// Inclusive, compared against the effective date.
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on customer, email, description or reference.
    pub search: Option<String>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.kind.is_some_and(|k| k != tx.kind) {
            return false;
        }
        if self.state.is_some_and(|s| s != tx.state) {
            return false;
        }
        let date = tx.effective_date();
        if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [&tx.customer_name, &tx.customer_email, &tx.description, &tx.reference]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Filters and orders newest effective date first; ties fall back to kind
/// and record id so the order is stable across requests.
pub fn apply_filter(mut txs: Vec<Transaction>, filter: &TransactionFilter) -> Vec<Transaction> {
    txs.retain(|tx| filter.matches(tx));
    txs.sort_by(|a, b| {
        b.effective_at()
            .cmp(&a.effective_at())
            .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
            .then_with(|| b.record_id.cmp(&a.record_id))
    });
    txs
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionSummary {
    pub count: usize,
    /// Sum of paid amounts, all currencies added together.
    pub paid_total: i64,
    pub by_state: HashMap<PaymentState, usize>,
    pub revenue_by_kind: HashMap<TransactionKind, i64>,
}

pub fn summarize(txs: &[Transaction]) -> TransactionSummary {
    let mut summary = TransactionSummary {
        count: txs.len(),
        ..Default::default()
    };
    for state in PaymentState::ALL {
        summary.by_state.insert(state, 0);
    }
    for kind in TransactionKind::ALL {
        summary.revenue_by_kind.insert(kind, 0);
    }
    for tx in txs {
        *summary.by_state.entry(tx.state).or_default() += 1;
        if tx.state == PaymentState::Paid {
            summary.paid_total += tx.amount;
            *summary.revenue_by_kind.entry(tx.kind).or_default() += tx.amount;
        }
    }
    summary
}
