//! Daily revenue series for the dashboard chart.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::status::{PaymentState, TransactionKind};
use crate::transactions::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub total: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: Vec<RevenuePoint>,
    pub total: i64,
    pub count: usize,
    pub by_kind: HashMap<TransactionKind, i64>,
}

/// Buckets paid transactions by effective date over `days` days ending at
/// `end` (inclusive). Returns one point per day before sampling.
fn daily_buckets(transactions: &[Transaction], end: NaiveDate, days: u32) -> Vec<RevenuePoint> {
    let days = days.max(1);
    let start = end - Duration::days(i64::from(days) - 1);

    let mut buckets: BTreeMap<NaiveDate, (i64, usize)> = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.state == PaymentState::Paid) {
        let date = tx.effective_date();
        if date < start || date > end {
            continue;
        }
        let entry = buckets.entry(date).or_default();
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    start
        .iter_days()
        .take(days as usize)
        .map(|date| {
            let (total, count) = buckets.get(&date).copied().unwrap_or_default();
            RevenuePoint { date, total, count }
        })
        .collect()
}

/// Thins a daily series for display. The first and last day and every
/// non-empty day are always kept; empty days survive on a fixed stride.
pub fn sample(points: Vec<RevenuePoint>, max_points: usize) -> Vec<RevenuePoint> {
    let len = points.len();
    if max_points == 0 || len <= max_points {
        return points;
    }
    let stride = len.div_ceil(max_points);

    points
        .into_iter()
        .enumerate()
        .filter(|(i, p)| *i == 0 || *i == len - 1 || p.count > 0 || i % stride == 0)
        .map(|(_, p)| p)
        .collect()
}

pub fn build_series(
    transactions: &[Transaction],
    end: NaiveDate,
    days: u32,
    max_points: usize,
) -> Vec<RevenuePoint> {
    sample(daily_buckets(transactions, end, days), max_points)
}

pub fn report(
    transactions: &[Transaction],
    end: NaiveDate,
    days: u32,
    max_points: usize,
) -> RevenueReport {
    let daily = daily_buckets(transactions, end, days);
    let start = daily.first().map(|p| p.date).unwrap_or(end);

    let mut by_kind: HashMap<TransactionKind, i64> =
        TransactionKind::ALL.iter().map(|k| (*k, 0)).collect();
    for tx in transactions.iter().filter(|t| t.state == PaymentState::Paid) {
        let date = tx.effective_date();
        if date >= start && date <= end {
            *by_kind.entry(tx.kind).or_default() += tx.amount;
        }
    }

    let total = daily.iter().map(|p| p.total).sum();
    let count = daily.iter().map(|p| p.count).sum();

    RevenueReport {
        start,
        end,
        points: sample(daily, max_points),
        total,
        count,
        by_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::fixtures::{at, tx};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn day_total_is_sum_of_effective_date_amounts() {
        let txs = vec![
            // created on the 1st, settled on the 3rd: counts on the 3rd
            tx(TransactionKind::Course, 1, 100, "completed", at(2024, 3, 1, 10), Some(at(2024, 3, 3, 8))),
            tx(TransactionKind::Shop, 2, 250, "paid", at(2024, 3, 3, 12), Some(at(2024, 3, 3, 13))),
            // paid without a settlement stamp falls back to creation
            tx(TransactionKind::CustomSong, 3, 40, "paid", at(2024, 3, 2, 9), None),
            tx(TransactionKind::Shop, 4, 999, "pending", at(2024, 3, 3, 9), None),
        ];
        let series = build_series(&txs, day(5), 5, 30);
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], RevenuePoint { date: day(1), total: 0, count: 0 });
        assert_eq!(series[1], RevenuePoint { date: day(2), total: 40, count: 1 });
        assert_eq!(series[2], RevenuePoint { date: day(3), total: 350, count: 2 });
    }

    #[test]
    fn transactions_outside_range_are_ignored() {
        let txs = vec![
            tx(TransactionKind::Shop, 1, 100, "paid", at(2024, 2, 28, 0), None),
            tx(TransactionKind::Shop, 2, 100, "paid", at(2024, 3, 6, 0), None),
        ];
        let series = build_series(&txs, day(5), 5, 30);
        assert!(series.iter().all(|p| p.total == 0));
    }

    #[test]
    fn sampling_keeps_edges_and_non_empty_days() {
        let txs = vec![tx(TransactionKind::Shop, 1, 70, "paid", at(2024, 3, 14, 0), None)];
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let series = build_series(&txs, end, 31, 10);

        assert!(series.len() < 31);
        assert_eq!(series.first().map(|p| p.date), Some(day(1)));
        assert_eq!(series.last().map(|p| p.date), Some(end));
        assert!(series.iter().any(|p| p.date == day(14) && p.total == 70));
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn sampling_preserves_totals() {
        let txs: Vec<_> = (1..=20)
            .map(|d| tx(TransactionKind::Course, d as i32, 10, "completed", at(2024, 3, d * 3 % 28 + 1, 0), None))
            .collect();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let sampled: i64 = build_series(&txs, end, 31, 7).iter().map(|p| p.total).sum();
        let full: i64 = build_series(&txs, end, 31, 0).iter().map(|p| p.total).sum();
        assert_eq!(sampled, full);
        assert_eq!(full, 200);
    }

    #[test]
    fn report_totals_by_kind() {
        let txs = vec![
            tx(TransactionKind::Course, 1, 100, "completed", at(2024, 3, 2, 0), None),
            tx(TransactionKind::Shop, 2, 50, "cod", at(2024, 3, 2, 0), None),
        ];
        let r = report(&txs, day(5), 7, 30);
        assert_eq!(r.start, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        assert_eq!(r.total, 100);
        assert_eq!(r.count, 1);
        assert_eq!(r.by_kind[&TransactionKind::Course], 100);
        assert_eq!(r.by_kind[&TransactionKind::Shop], 0);
    }

    #[test]
    fn zero_days_is_one_day() {
        let series = build_series(&[], day(5), 0, 30);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, day(5));
    }
}
