//! Reconciliation of bookings, payouts and refunds into platform financial metrics
//!
//! Everything here is a pure derivation over record snapshots and is recomputed on
//! each request.

pub mod engine;
pub mod metrics;
pub mod report;

pub use engine::{growth_pct, ReconciliationEngine};
pub use metrics::*;
pub use report::{export_financial_report, SUMMARY_HEADER};
