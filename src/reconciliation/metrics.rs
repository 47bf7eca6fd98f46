//! Reporting windows and the metrics derived over them

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::types::{PayoutError, PayoutMethod};

/// Length of a reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl ReportPeriod {
    /// Number of calendar months covered
    pub fn months(&self) -> u32 {
        match self {
            ReportPeriod::Month => 1,
            ReportPeriod::Quarter => 3,
            ReportPeriod::HalfYear => 6,
            ReportPeriod::Year => 12,
        }
    }

    /// Period covering exactly `months` calendar months, if one exists
    pub fn from_months(months: u32) -> Option<Self> {
        match months {
            1 => Some(ReportPeriod::Month),
            3 => Some(ReportPeriod::Quarter),
            6 => Some(ReportPeriod::HalfYear),
            12 => Some(ReportPeriod::Year),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Month => "month",
            ReportPeriod::Quarter => "quarter",
            ReportPeriod::HalfYear => "half_year",
            ReportPeriod::Year => "year",
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportPeriod {
    type Err = PayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" | "1m" => Ok(ReportPeriod::Month),
            "quarter" | "3m" => Ok(ReportPeriod::Quarter),
            "half_year" | "6m" => Ok(ReportPeriod::HalfYear),
            "year" | "12m" => Ok(ReportPeriod::Year),
            other => Err(PayoutError::Validation(format!(
                "Unknown report period '{}'",
                other
            ))),
        }
    }
}

/// Trailing calendar months ending with the month containing `as_of`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    /// First day of the last month in the window
    pub last_month: NaiveDate,
    /// Number of months, at least one
    pub months: u32,
}

impl ReportWindow {
    pub fn new(period: ReportPeriod, as_of: NaiveDate) -> Self {
        Self::trailing(period.months(), as_of)
    }

    pub fn trailing(months: u32, as_of: NaiveDate) -> Self {
        Self {
            last_month: first_of_month(as_of),
            months: months.max(1),
        }
    }

    /// First day of every month in the window, oldest first
    pub fn month_starts(&self) -> Vec<NaiveDate> {
        (0..self.months)
            .rev()
            .map(|back| shift_months(self.last_month, -(back as i32)))
            .collect()
    }

    /// Inclusive start of the window
    pub fn start(&self) -> NaiveDateTime {
        shift_months(self.last_month, 1 - self.months as i32).and_time(NaiveTime::MIN)
    }

    /// Exclusive end of the window
    pub fn end(&self) -> NaiveDateTime {
        shift_months(self.last_month, 1).and_time(NaiveTime::MIN)
    }

    /// Period name for the window length, or `<n>_months` for other lengths
    pub fn label(&self) -> String {
        ReportPeriod::from_months(self.months)
            .map(|period| period.as_str().to_string())
            .unwrap_or_else(|| format!("{}_months", self.months))
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start() && at < self.end()
    }

    /// The window of equal length immediately before this one
    pub fn previous(&self) -> Self {
        Self {
            last_month: shift_months(self.last_month, -(self.months as i32)),
            months: self.months,
        }
    }
}

pub(crate) fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

pub(crate) fn shift_months(first: NaiveDate, delta: i32) -> NaiveDate {
    let index = first.year() * 12 + first.month0() as i32 + delta;
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(first)
}

/// `YYYY-MM` label of a month
pub fn month_label(first: NaiveDate) -> String {
    first.format("%Y-%m").to_string()
}

/// Aggregates for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// `YYYY-MM`
    pub month: String,
    /// Gross price of confirmed and completed bookings
    pub booking_revenue: BigDecimal,
    /// Platform share of the booking revenue
    pub commission: BigDecimal,
    /// Fees on payouts completed in the month
    pub payout_fees: BigDecimal,
    /// Gross amount of payouts completed in the month
    pub payouts_amount: BigDecimal,
    /// Completed refunds
    pub refunds: BigDecimal,
    /// `commission + payout_fees - refunds * commission_rate`
    pub net_revenue: BigDecimal,
    pub booking_count: usize,
    pub payout_count: usize,
    pub refund_count: usize,
}

impl MonthlyBucket {
    pub fn empty(month: impl Into<String>) -> Self {
        let zero = BigDecimal::from(0);
        Self {
            month: month.into(),
            booking_revenue: zero.clone(),
            commission: zero.clone(),
            payout_fees: zero.clone(),
            payouts_amount: zero.clone(),
            refunds: zero.clone(),
            net_revenue: zero,
            booking_count: 0,
            payout_count: 0,
            refund_count: 0,
        }
    }
}

/// One row of the window summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub metric: String,
    pub amount: BigDecimal,
    /// Change against the previous window, in percent
    pub growth_pct: f64,
}

/// Completed payouts grouped by method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodBreakdown {
    pub method: PayoutMethod,
    pub total_amount: BigDecimal,
    pub total_fees: BigDecimal,
    pub count: usize,
    pub average_fee: BigDecimal,
}

/// A host ranked by completed payouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRanking {
    pub host_id: String,
    pub total_paid: BigDecimal,
    pub payout_count: usize,
}

/// Qualitative band of the overall health score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Excellent,
    Good,
    NeedsAttention,
}

impl HealthBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthBand::Excellent
        } else if score >= 60.0 {
            HealthBand::Good
        } else {
            HealthBand::NeedsAttention
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthBand::Excellent => "Excellent",
            HealthBand::Good => "Good",
            HealthBand::NeedsAttention => "Needs Attention",
        }
    }
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Platform health sub-scores, each in `[0, 100]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScores {
    pub revenue_growth: f64,
    pub payout_efficiency: f64,
    pub risk: f64,
    pub liquidity: f64,
    /// Mean of the four sub-scores
    pub overall: f64,
    pub band: HealthBand,
}

impl HealthScores {
    pub fn new(revenue_growth: f64, payout_efficiency: f64, risk: f64, liquidity: f64) -> Self {
        let revenue_growth = clamp_score(revenue_growth);
        let payout_efficiency = clamp_score(payout_efficiency);
        let risk = clamp_score(risk);
        let liquidity = clamp_score(liquidity);
        let overall = (revenue_growth + payout_efficiency + risk + liquidity) / 4.0;
        Self {
            revenue_growth,
            payout_efficiency,
            risk,
            liquidity,
            overall,
            band: HealthBand::from_score(overall),
        }
    }
}

/// Clamp to `[0, 100]`, mapping NaN to 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Everything the reporting surface shows for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub window: ReportWindow,
    pub generated_at: NaiveDateTime,
    pub summary: Vec<SummaryLine>,
    pub monthly_trend: Vec<MonthlyBucket>,
    pub method_breakdown: Vec<MethodBreakdown>,
    pub top_hosts: Vec<HostRanking>,
    /// Gross amount of payouts not yet in a terminal status
    pub outstanding_balance: BigDecimal,
    /// Completed share of payouts finished in the window, in percent
    pub payout_success_rate: f64,
    pub health: HealthScores,
}

impl PlatformMetrics {
    pub fn summary_line(&self, metric: &str) -> Option<&SummaryLine> {
        self.summary.iter().find(|line| line.metric == metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_quarter_window_crosses_year() {
        let window = ReportWindow::new(ReportPeriod::Quarter, date(2026, 2, 17));
        let labels: Vec<_> = window.month_starts().into_iter().map(month_label).collect();
        assert_eq!(labels, vec!["2025-12", "2026-01", "2026-02"]);
        assert_eq!(window.start(), date(2025, 12, 1).and_time(NaiveTime::MIN));
        assert_eq!(window.end(), date(2026, 3, 1).and_time(NaiveTime::MIN));

        let previous = window.previous();
        assert_eq!(previous.start(), date(2025, 9, 1).and_time(NaiveTime::MIN));
        assert_eq!(previous.end(), window.start());
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let window = ReportWindow::new(ReportPeriod::Month, date(2026, 10, 31));
        assert!(window.contains(date(2026, 10, 1).and_time(NaiveTime::MIN)));
        assert!(!window.contains(date(2026, 11, 1).and_time(NaiveTime::MIN)));
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("Quarter".parse::<ReportPeriod>().unwrap(), ReportPeriod::Quarter);
        assert_eq!("6m".parse::<ReportPeriod>().unwrap().months(), 6);
        assert!("decade".parse::<ReportPeriod>().is_err());
    }

    #[test]
    fn test_window_label_follows_length() {
        assert_eq!(ReportWindow::new(ReportPeriod::HalfYear, date(2026, 10, 5)).label(), "half_year");
        assert_eq!(ReportWindow::trailing(2, date(2026, 10, 5)).label(), "2_months");
        assert_eq!(ReportPeriod::from_months(12), Some(ReportPeriod::Year));
        assert_eq!(ReportPeriod::from_months(0), None);
    }

    #[test]
    fn test_health_bands() {
        assert_eq!(HealthBand::from_score(80.0), HealthBand::Excellent);
        assert_eq!(HealthBand::from_score(79.9), HealthBand::Good);
        assert_eq!(HealthBand::from_score(59.9), HealthBand::NeedsAttention);

        let scores = HealthScores::new(150.0, 100.0, -20.0, 60.0);
        assert_eq!(scores.revenue_growth, 100.0);
        assert_eq!(scores.risk, 0.0);
        assert_eq!(scores.overall, 65.0);
        assert_eq!(scores.band, HealthBand::Good);
    }
}
