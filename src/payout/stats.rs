//! Operator dashboard statistics over payout records

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Counts and totals by lifecycle stage
///
/// `approved` and `processing` are reported together as in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutStats {
    pub total_count: usize,
    pub pending_count: usize,
    pub in_flight_count: usize,
    pub completed_count: usize,
    pub rejected_count: usize,
    pub failed_count: usize,
    /// Gross amount awaiting operator review
    pub pending_amount: BigDecimal,
    /// Gross amount approved but not yet delivered
    pub in_flight_amount: BigDecimal,
    /// Gross amount delivered
    pub completed_amount: BigDecimal,
    /// Net amount received by hosts
    pub completed_net_amount: BigDecimal,
    /// Provider fees on delivered payouts
    pub completed_fees: BigDecimal,
    /// Completed share of finished payouts, in percent
    pub success_rate: f64,
}

impl PayoutStats {
    pub fn from_payouts(payouts: &[Payout]) -> Self {
        let zero = BigDecimal::from(0);
        let mut stats = Self {
            total_count: payouts.len(),
            pending_count: 0,
            in_flight_count: 0,
            completed_count: 0,
            rejected_count: 0,
            failed_count: 0,
            pending_amount: zero.clone(),
            in_flight_amount: zero.clone(),
            completed_amount: zero.clone(),
            completed_net_amount: zero.clone(),
            completed_fees: zero,
            success_rate: 0.0,
        };

        for payout in payouts {
            match payout.status {
                PayoutStatus::Pending => {
                    stats.pending_count += 1;
                    stats.pending_amount += &payout.amount;
                }
                PayoutStatus::Approved | PayoutStatus::Processing => {
                    stats.in_flight_count += 1;
                    stats.in_flight_amount += &payout.amount;
                }
                PayoutStatus::Completed => {
                    stats.completed_count += 1;
                    stats.completed_amount += &payout.amount;
                    stats.completed_net_amount += &payout.net_amount;
                    stats.completed_fees += &payout.fee;
                }
                PayoutStatus::Rejected => stats.rejected_count += 1,
                PayoutStatus::Failed => stats.failed_count += 1,
            }
        }

        stats.success_rate = success_rate(
            stats.completed_count,
            stats.rejected_count + stats.failed_count,
        );
        stats
    }

    /// Amount still owed to hosts (pending plus in flight)
    pub fn outstanding_amount(&self) -> BigDecimal {
        &self.pending_amount + &self.in_flight_amount
    }
}

/// `completed / (completed + unsuccessful)` in percent; 100 when nothing finished
pub fn success_rate(completed: usize, unsuccessful: usize) -> f64 {
    let finished = completed + unsuccessful;
    if finished == 0 {
        100.0
    } else {
        completed as f64 / finished as f64 * 100.0
    }
}
