//! CSV export of platform metrics

use std::borrow::Cow;
use std::fmt::Write;

use bigdecimal::{BigDecimal, RoundingMode};

use crate::reconciliation::metrics::PlatformMetrics;

/// Header of the summary section, always the first line of a report
pub const SUMMARY_HEADER: &str = "Metric,Amount,Growth %";

/// Render metrics as a flat CSV document
///
/// Sections are separated by a blank line: summary, monthly trend, payment methods,
/// top hosts, health scores and the report period, named after the metrics window.
pub fn export_financial_report(metrics: &PlatformMetrics) -> String {
    let mut out = String::new();

    push_row(&mut out, &[SUMMARY_HEADER.into()]);
    for line in &metrics.summary {
        push_row(
            &mut out,
            &[
                csv_field(&line.metric),
                money(&line.amount).into(),
                format!("{:.2}", line.growth_pct).into(),
            ],
        );
    }

    section(&mut out, "Monthly Trend");
    push_row(
        &mut out,
        &[
            "Month,Booking Revenue,Commission,Payout Fees,Refunds,Net Revenue,Bookings,Payouts,Refund Count"
                .into(),
        ],
    );
    for bucket in &metrics.monthly_trend {
        push_row(
            &mut out,
            &[
                csv_field(&bucket.month),
                money(&bucket.booking_revenue).into(),
                money(&bucket.commission).into(),
                money(&bucket.payout_fees).into(),
                money(&bucket.refunds).into(),
                money(&bucket.net_revenue).into(),
                bucket.booking_count.to_string().into(),
                bucket.payout_count.to_string().into(),
                bucket.refund_count.to_string().into(),
            ],
        );
    }

    section(&mut out, "Payment Methods");
    push_row(&mut out, &["Method,Total Amount,Payouts,Average Fee".into()]);
    for row in &metrics.method_breakdown {
        push_row(
            &mut out,
            &[
                csv_field(row.method.code()),
                money(&row.total_amount).into(),
                row.count.to_string().into(),
                money(&row.average_fee).into(),
            ],
        );
    }

    section(&mut out, "Top Hosts");
    push_row(&mut out, &["Rank,Host,Total Paid,Payouts".into()]);
    for (rank, host) in metrics.top_hosts.iter().enumerate() {
        push_row(
            &mut out,
            &[
                (rank + 1).to_string().into(),
                csv_field(&host.host_id),
                money(&host.total_paid).into(),
                host.payout_count.to_string().into(),
            ],
        );
    }

    section(&mut out, "Health Scores");
    push_row(&mut out, &["Score,Value".into()]);
    let health = &metrics.health;
    for (name, value) in [
        ("Revenue Growth", health.revenue_growth),
        ("Payout Efficiency", health.payout_efficiency),
        ("Risk", health.risk),
        ("Liquidity", health.liquidity),
        ("Overall", health.overall),
    ] {
        push_row(&mut out, &[name.into(), format!("{:.1}", value).into()]);
    }
    push_row(&mut out, &["Band".into(), health.band.label().into()]);

    section(&mut out, "Report Period");
    push_row(&mut out, &["Period,From,To".into()]);
    push_row(
        &mut out,
        &[
            metrics.window.label().into(),
            metrics.window.start().date().to_string().into(),
            metrics.window.end().date().to_string().into(),
        ],
    );

    out
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    push_row(out, &[csv_field(title)]);
}

fn push_row(out: &mut String, fields: &[Cow<'_, str>]) {
    let _ = writeln!(out, "{}", fields.join(","));
}

fn money(amount: &BigDecimal) -> String {
    amount.with_scale_round(2, RoundingMode::HalfUp).to_string()
}

/// Quote a field when it contains a separator, quote or line break
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
