//! Derivation of platform metrics from booking, payout and refund records

use std::cmp::Ordering;
use std::collections::HashMap;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::{Datelike, NaiveDateTime};

use crate::config::ReconciliationConfig;
use crate::payout::stats::success_rate;
use crate::reconciliation::metrics::*;
use crate::types::*;

/// Summary metric names, in report order
pub const BOOKING_REVENUE: &str = "Booking Revenue";
pub const COMMISSION: &str = "Commission";
pub const PAYOUT_FEES: &str = "Payout Fees";
pub const HOST_PAYOUTS: &str = "Host Payouts";
pub const REFUNDS: &str = "Refunds";
pub const NET_REVENUE: &str = "Net Revenue";

/// Read-only aggregation over record snapshots
///
/// Bookings are bucketed by creation date, completed refunds by creation date and
/// completed payouts by the time they completed (`updated_at`).
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: ReconciliationConfig,
}

impl ReconciliationEngine {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Compute the metrics of `window`, using the preceding window for growth figures
    pub fn aggregate(
        &self,
        bookings: &[BookingRevenueRecord],
        payouts: &[Payout],
        refunds: &[RefundRecord],
        window: ReportWindow,
    ) -> PlatformMetrics {
        let monthly_trend = self.monthly_trend(bookings, payouts, refunds, &window);
        let current = sum_buckets(&monthly_trend);
        let previous = sum_buckets(&self.monthly_trend(bookings, payouts, refunds, &window.previous()));

        let completed: Vec<&Payout> = payouts
            .iter()
            .filter(|p| p.status == PayoutStatus::Completed && window.contains(p.updated_at))
            .collect();
        let unsuccessful = payouts
            .iter()
            .filter(|p| {
                matches!(p.status, PayoutStatus::Rejected | PayoutStatus::Failed)
                    && window.contains(p.updated_at)
            })
            .count();
        let payout_success_rate = success_rate(completed.len(), unsuccessful);

        let outstanding_balance: BigDecimal = payouts
            .iter()
            .filter(|p| !p.is_terminal())
            .map(|p| p.amount.clone())
            .sum();

        let health = self.health(&current, &previous, payout_success_rate, &outstanding_balance);

        PlatformMetrics {
            window,
            generated_at: chrono::Utc::now().naive_utc(),
            summary: summary(&current, &previous),
            monthly_trend,
            method_breakdown: method_breakdown(&completed),
            top_hosts: top_hosts(&completed, self.config.top_hosts_limit),
            outstanding_balance,
            payout_success_rate,
            health,
        }
    }

    /// One bucket per month of `window`, oldest first
    pub fn monthly_trend(
        &self,
        bookings: &[BookingRevenueRecord],
        payouts: &[Payout],
        refunds: &[RefundRecord],
        window: &ReportWindow,
    ) -> Vec<MonthlyBucket> {
        let mut buckets: Vec<MonthlyBucket> = window
            .month_starts()
            .into_iter()
            .map(|month| MonthlyBucket::empty(month_label(month)))
            .collect();

        for booking in bookings.iter().filter(|b| b.status.is_revenue()) {
            if let Some(bucket) = bucket_for(&mut buckets, window, booking.created_at) {
                bucket.booking_revenue += &booking.total_price;
                bucket.booking_count += 1;
            }
        }

        for payout in payouts.iter().filter(|p| p.status == PayoutStatus::Completed) {
            if let Some(bucket) = bucket_for(&mut buckets, window, payout.updated_at) {
                bucket.payout_fees += &payout.fee;
                bucket.payouts_amount += &payout.amount;
                bucket.payout_count += 1;
            }
        }

        for refund in refunds.iter().filter(|r| r.status == RefundStatus::Completed) {
            if let Some(bucket) = bucket_for(&mut buckets, window, refund.created_at) {
                bucket.refunds += &refund.refund_amount;
                bucket.refund_count += 1;
            }
        }

        let rate = &self.config.commission_rate;
        for bucket in &mut buckets {
            bucket.commission = &bucket.booking_revenue * rate;
            bucket.net_revenue = &bucket.commission + &bucket.payout_fees - &bucket.refunds * rate;
        }

        buckets
    }

    fn health(
        &self,
        current: &MonthlyBucket,
        previous: &MonthlyBucket,
        payout_success_rate: f64,
        outstanding: &BigDecimal,
    ) -> HealthScores {
        let growth = growth_pct(&current.booking_revenue, &previous.booking_revenue);
        let revenue_growth = growth / self.config.growth_threshold_pct * 100.0;

        let refund_rate = share_pct(&current.refunds, &current.booking_revenue);
        let risk = 100.0 - refund_rate * self.config.risk_scale;

        let outstanding_rate = share_pct(outstanding, &current.booking_revenue);
        let liquidity = 100.0 - outstanding_rate * self.config.liquidity_scale;

        HealthScores::new(revenue_growth, payout_success_rate, risk, liquidity)
    }
}

fn bucket_for<'a>(
    buckets: &'a mut [MonthlyBucket],
    window: &ReportWindow,
    at: NaiveDateTime,
) -> Option<&'a mut MonthlyBucket> {
    if !window.contains(at) {
        return None;
    }
    let start = window.start().date();
    let offset = (at.year() - start.year()) * 12 + at.month0() as i32 - start.month0() as i32;
    usize::try_from(offset).ok().and_then(|i| buckets.get_mut(i))
}

fn sum_buckets(buckets: &[MonthlyBucket]) -> MonthlyBucket {
    buckets
        .iter()
        .fold(MonthlyBucket::empty("total"), |mut total, bucket| {
            total.booking_revenue += &bucket.booking_revenue;
            total.commission += &bucket.commission;
            total.payout_fees += &bucket.payout_fees;
            total.payouts_amount += &bucket.payouts_amount;
            total.refunds += &bucket.refunds;
            total.net_revenue += &bucket.net_revenue;
            total.booking_count += bucket.booking_count;
            total.payout_count += bucket.payout_count;
            total.refund_count += bucket.refund_count;
            total
        })
}

fn summary(current: &MonthlyBucket, previous: &MonthlyBucket) -> Vec<SummaryLine> {
    let line = |metric: &str, now: &BigDecimal, before: &BigDecimal| SummaryLine {
        metric: metric.to_string(),
        amount: now.clone(),
        growth_pct: growth_pct(now, before),
    };

    vec![
        line(BOOKING_REVENUE, &current.booking_revenue, &previous.booking_revenue),
        line(COMMISSION, &current.commission, &previous.commission),
        line(PAYOUT_FEES, &current.payout_fees, &previous.payout_fees),
        line(HOST_PAYOUTS, &current.payouts_amount, &previous.payouts_amount),
        line(REFUNDS, &current.refunds, &previous.refunds),
        line(NET_REVENUE, &current.net_revenue, &previous.net_revenue),
    ]
}

fn method_breakdown(completed: &[&Payout]) -> Vec<MethodBreakdown> {
    let mut by_method: HashMap<PayoutMethod, (BigDecimal, BigDecimal, usize)> = HashMap::new();
    for payout in completed {
        let entry = by_method
            .entry(payout.method.clone())
            .or_insert_with(|| (BigDecimal::from(0), BigDecimal::from(0), 0));
        entry.0 += &payout.amount;
        entry.1 += &payout.fee;
        entry.2 += 1;
    }

    let mut breakdown: Vec<MethodBreakdown> = by_method
        .into_iter()
        .map(|(method, (total_amount, total_fees, count))| {
            let average_fee = (&total_fees / &BigDecimal::from(count as u64))
                .with_scale_round(2, RoundingMode::HalfUp);
            MethodBreakdown {
                method,
                total_amount,
                total_fees,
                count,
                average_fee,
            }
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.method.code().cmp(b.method.code()))
    });
    breakdown
}

fn top_hosts(completed: &[&Payout], limit: usize) -> Vec<HostRanking> {
    let mut by_host: HashMap<&str, (BigDecimal, usize)> = HashMap::new();
    for payout in completed {
        let entry = by_host
            .entry(payout.host_id.as_str())
            .or_insert_with(|| (BigDecimal::from(0), 0));
        entry.0 += &payout.amount;
        entry.1 += 1;
    }

    let mut ranking: Vec<HostRanking> = by_host
        .into_iter()
        .map(|(host_id, (total_paid, payout_count))| HostRanking {
            host_id: host_id.to_string(),
            total_paid,
            payout_count,
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.total_paid
            .cmp(&a.total_paid)
            .then_with(|| b.payout_count.cmp(&a.payout_count))
            .then_with(|| a.host_id.cmp(&b.host_id))
    });
    ranking.truncate(limit);
    ranking
}

/// Percent change from `previous` to `current`
///
/// A zero baseline yields 100 when the current value is positive and 0 otherwise.
pub fn growth_pct(current: &BigDecimal, previous: &BigDecimal) -> f64 {
    let zero = BigDecimal::from(0);
    if *previous == zero {
        return match current.cmp(&zero) {
            Ordering::Greater => 100.0,
            _ => 0.0,
        };
    }
    ((current - previous) / previous.abs() * BigDecimal::from(100))
        .to_f64()
        .unwrap_or(0.0)
}

/// `part / whole` in percent; a zero `whole` counts any positive part as 100%
fn share_pct(part: &BigDecimal, whole: &BigDecimal) -> f64 {
    let zero = BigDecimal::from(0);
    if *whole <= zero {
        return if *part > zero { 100.0 } else { 0.0 };
    }
    (part / whole * BigDecimal::from(100)).to_f64().unwrap_or(0.0)
}
