//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::provider::{
    BankAccountValidation, BatchPayoutReceipt, ProviderListFilter, ProviderPayout,
    ProviderPayoutPage, ProviderResult,
};
use crate::types::*;

/// Storage abstraction for payout records
///
/// This trait allows the payout core to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
/// Implementations must make `update_payout` a compare-and-swap on `version` and
/// write the audit entries in the same atomic step as the record.
#[async_trait]
pub trait PayoutStorage: Send + Sync {
    /// Insert a new payout together with any initial audit entries
    async fn save_payout(&self, payout: &Payout, audit: &[AuditEntry]) -> PayoutResult<()>;

    /// Get a payout by ID
    async fn get_payout(&self, payout_id: &str) -> PayoutResult<Option<Payout>>;

    /// List payouts matching a filter, newest first
    async fn list_payouts(&self, filter: &PayoutFilter) -> PayoutResult<Vec<Payout>>;

    /// Replace a payout if the stored version still equals `expected_version`
    ///
    /// Fails with `ConcurrentModification` when another writer got there first.
    async fn update_payout(
        &self,
        payout: &Payout,
        expected_version: u64,
        audit: &[AuditEntry],
    ) -> PayoutResult<()>;

    /// Audit trail of a payout, oldest first
    async fn get_audit_trail(&self, payout_id: &str) -> PayoutResult<Vec<AuditEntry>>;
}

/// Read-only access to booking and refund projections owned by other services
#[async_trait]
pub trait RevenueSource: Send + Sync {
    /// Bookings created in `[start, end)`
    async fn bookings_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> PayoutResult<Vec<BookingRevenueRecord>>;

    /// Refunds created in `[start, end)`
    async fn refunds_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> PayoutResult<Vec<RefundRecord>>;
}

/// External money-movement provider
///
/// Implementations never panic across this boundary: every failure, including
/// transport errors, comes back as a `ProviderError`.
#[async_trait]
pub trait DisbursementProvider: Send + Sync {
    /// Create a payout at the provider
    async fn create_payout(&self, payout: &Payout) -> ProviderResult<ProviderPayout>;

    /// Fetch a payout by provider ID
    async fn retrieve_payout(&self, provider_id: &str) -> ProviderResult<ProviderPayout>;

    /// List provider payouts using cursor pagination
    async fn list_payouts(&self, filter: &ProviderListFilter) -> ProviderResult<ProviderPayoutPage>;

    /// Create several payouts in one provider request
    async fn create_batch_payout(&self, payouts: &[Payout]) -> ProviderResult<BatchPayoutReceipt>;

    /// Check that a bank account exists and resolve its holder name
    async fn validate_bank_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> ProviderResult<BankAccountValidation>;
}

/// Trait for implementing custom payout request validation rules
pub trait PayoutRequestValidator: Send + Sync {
    /// Validate a request before it becomes a payout
    fn validate(&self, request: &PayoutRequest) -> PayoutResult<()>;
}
