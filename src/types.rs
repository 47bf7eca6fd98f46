//! Core types and data structures for the payout system

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::provider::ProviderError;

/// Disbursement channels supported by the provider
///
/// Codes the platform does not know yet are preserved as `Other` so that records
/// written by newer clients still round-trip; they are priced with the default policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PayoutMethod {
    /// GCash e-wallet
    Gcash,
    /// Maya (PayMaya) e-wallet
    Paymaya,
    /// Direct bank transfer
    BankTransfer,
    /// InstaPay real-time interbank transfer
    Instapay,
    /// PESONet batch interbank transfer
    Pesonet,
    /// Any method code not listed above
    Other(String),
}

impl PayoutMethod {
    /// All methods with a built-in policy
    pub const KNOWN: [PayoutMethod; 5] = [
        PayoutMethod::Gcash,
        PayoutMethod::Paymaya,
        PayoutMethod::BankTransfer,
        PayoutMethod::Instapay,
        PayoutMethod::Pesonet,
    ];

    /// Wire code used in storage and configuration
    pub fn code(&self) -> &str {
        match self {
            PayoutMethod::Gcash => "gcash",
            PayoutMethod::Paymaya => "paymaya",
            PayoutMethod::BankTransfer => "bank_transfer",
            PayoutMethod::Instapay => "instapay",
            PayoutMethod::Pesonet => "pesonet",
            PayoutMethod::Other(code) => code,
        }
    }

    /// Whether the recipient must carry a bank code
    pub fn requires_bank_code(&self) -> bool {
        matches!(self, PayoutMethod::BankTransfer)
    }
}

impl From<String> for PayoutMethod {
    fn from(code: String) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "gcash" => PayoutMethod::Gcash,
            "paymaya" => PayoutMethod::Paymaya,
            "bank_transfer" => PayoutMethod::BankTransfer,
            "instapay" => PayoutMethod::Instapay,
            "pesonet" => PayoutMethod::Pesonet,
            _ => PayoutMethod::Other(code),
        }
    }
}

impl From<&str> for PayoutMethod {
    fn from(code: &str) -> Self {
        PayoutMethod::from(code.to_string())
    }
}

impl From<PayoutMethod> for String {
    fn from(method: PayoutMethod) -> Self {
        method.code().to_string()
    }
}

impl fmt::Display for PayoutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Lifecycle status of a payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Requested by the host, awaiting operator review
    Pending,
    /// Signed off by an operator
    Approved,
    /// Accepted by the disbursement provider
    Processing,
    /// Funds delivered (terminal)
    Completed,
    /// Declined by an operator (terminal)
    Rejected,
    /// Unrecoverable provider failure (terminal)
    Failed,
}

impl PayoutStatus {
    /// All statuses in lifecycle order
    pub const ALL: [PayoutStatus; 6] = [
        PayoutStatus::Pending,
        PayoutStatus::Approved,
        PayoutStatus::Processing,
        PayoutStatus::Completed,
        PayoutStatus::Rejected,
        PayoutStatus::Failed,
    ];

    /// Terminal statuses have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PayoutStatus::Completed | PayoutStatus::Rejected | PayoutStatus::Failed
        )
    }

    /// Approved and processing payouts are grouped as "in flight" in statistics
    pub fn is_in_flight(&self) -> bool {
        matches!(self, PayoutStatus::Approved | PayoutStatus::Processing)
    }

    /// Statuses reachable in exactly one step
    pub fn successors(&self) -> &'static [PayoutStatus] {
        match self {
            PayoutStatus::Pending => &[PayoutStatus::Approved, PayoutStatus::Rejected],
            PayoutStatus::Approved => &[PayoutStatus::Processing, PayoutStatus::Failed],
            PayoutStatus::Processing => &[PayoutStatus::Completed, PayoutStatus::Failed],
            PayoutStatus::Completed | PayoutStatus::Rejected | PayoutStatus::Failed => &[],
        }
    }

    /// Check whether moving to `next` is a legal single step
    pub fn can_transition_to(&self, next: PayoutStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Rejected => "rejected",
            PayoutStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method-specific recipient details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientProperties {
    /// Wallet or bank account number
    pub account_number: Option<String>,
    /// Name registered on the account
    pub account_name: Option<String>,
    /// Bank identifier (required for bank transfers)
    pub bank_code: Option<String>,
    /// Account type, e.g. "savings" or "checking"
    pub account_type: Option<String>,
}

impl RecipientProperties {
    /// Recipient for an e-wallet
    pub fn wallet(account_number: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            account_number: Some(account_number.into()),
            account_name: Some(account_name.into()),
            ..Self::default()
        }
    }

    /// Recipient for a bank account
    pub fn bank(
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            account_number: Some(account_number.into()),
            account_name: Some(account_name.into()),
            bank_code: Some(bank_code.into()),
            account_type: None,
        }
    }
}

/// A host withdrawal request, before it becomes a payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRequest {
    /// Host receiving the funds
    pub host_id: String,
    /// Gross amount requested
    pub amount: BigDecimal,
    /// Disbursement channel
    pub method: PayoutMethod,
    /// Recipient details for the channel
    pub properties: RecipientProperties,
    /// Bookings settled by this payout
    #[serde(default)]
    pub booking_ids: Vec<String>,
}

impl PayoutRequest {
    pub fn new(
        host_id: impl Into<String>,
        amount: BigDecimal,
        method: PayoutMethod,
        properties: RecipientProperties,
    ) -> Self {
        Self {
            host_id: host_id.into(),
            amount,
            method,
            properties,
            booking_ids: Vec::new(),
        }
    }

    /// Attach the bookings this payout settles
    pub fn with_bookings(mut self, booking_ids: Vec<String>) -> Self {
        self.booking_ids = booking_ids;
        self
    }
}

/// A single disbursement of earnings to a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    /// Unique identifier
    pub id: String,
    /// Owning host
    pub host_id: String,
    /// Gross amount
    pub amount: BigDecimal,
    /// Provider fee charged on the amount
    pub fee: BigDecimal,
    /// What the host receives (`amount - fee`)
    pub net_amount: BigDecimal,
    /// Operating currency (ISO 4217)
    pub currency: String,
    /// Disbursement channel
    pub method: PayoutMethod,
    /// Recipient details
    pub properties: RecipientProperties,
    /// Bookings settled by this payout
    pub booking_ids: Vec<String>,
    /// Current lifecycle status
    pub status: PayoutStatus,
    /// Operator attestation reference, set on approval
    pub transaction_ref: Option<String>,
    /// Identifier assigned by the provider
    pub provider_payout_id: Option<String>,
    /// Proof of transfer, set on completion
    pub proof_url: Option<String>,
    /// Operator reason, set on rejection
    pub rejection_reason: Option<String>,
    /// Provider or operator reason, set on failure
    pub failure_reason: Option<String>,
    /// Optimistic concurrency counter, bumped on every persisted change
    pub version: u64,
    /// When the payout was requested
    pub created_at: NaiveDateTime,
    /// When the payout last changed
    pub updated_at: NaiveDateTime,
}

impl Payout {
    /// Create a pending payout from a request with already-derived fee
    pub fn new(request: PayoutRequest, fee: BigDecimal, currency: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        let net_amount = net_of_fee(&request.amount, &fee);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            host_id: request.host_id,
            amount: request.amount,
            fee,
            net_amount,
            currency,
            method: request.method,
            properties: request.properties,
            booking_ids: request.booking_ids,
            status: PayoutStatus::Pending,
            transaction_ref: None,
            provider_payout_id: None,
            proof_url: None,
            rejection_reason: None,
            failure_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// `amount - fee`, floored at zero
pub fn net_of_fee(amount: &BigDecimal, fee: &BigDecimal) -> BigDecimal {
    let net = amount - fee;
    if net < BigDecimal::from(0) {
        BigDecimal::from(0)
    } else {
        net
    }
}

/// Criteria for listing payouts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayoutFilter {
    pub status: Option<PayoutStatus>,
    pub host_id: Option<String>,
    pub method: Option<PayoutMethod>,
    /// Created at or after this instant
    pub created_from: Option<NaiveDateTime>,
    /// Created strictly before this instant
    pub created_to: Option<NaiveDateTime>,
    /// Maximum number of records returned
    pub limit: Option<usize>,
    /// Records skipped before the first returned one
    #[serde(default)]
    pub offset: usize,
}

impl PayoutFilter {
    pub fn by_status(status: PayoutStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn by_host(host_id: impl Into<String>) -> Self {
        Self {
            host_id: Some(host_id.into()),
            ..Self::default()
        }
    }

    /// Whether a payout satisfies every set criterion (paging aside)
    pub fn matches(&self, payout: &Payout) -> bool {
        self.status.is_none_or(|s| payout.status == s)
            && self.host_id.as_ref().is_none_or(|h| &payout.host_id == h)
            && self.method.as_ref().is_none_or(|m| &payout.method == m)
            && self.created_from.is_none_or(|from| payout.created_at >= from)
            && self.created_to.is_none_or(|to| payout.created_at < to)
    }

    /// Filter, order newest first, and page a set of payouts
    pub fn apply<'a>(&self, payouts: impl IntoIterator<Item = &'a Payout>) -> Vec<Payout> {
        let mut matched: Vec<Payout> = payouts
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// One recorded status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub payout_id: String,
    pub from: PayoutStatus,
    pub to: PayoutStatus,
    /// Operator or system component that caused the change
    pub actor: String,
    pub note: Option<String>,
    pub at: NaiveDateTime,
}

impl AuditEntry {
    pub fn new(
        payout_id: &str,
        from: PayoutStatus,
        to: PayoutStatus,
        actor: &str,
        note: Option<String>,
    ) -> Self {
        Self {
            payout_id: payout_id.to_string(),
            from,
            to,
            actor: actor.to_string(),
            note,
            at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Booking status as reported by the booking collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Confirmed and completed bookings count towards platform revenue
    pub fn is_revenue(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }
}

/// Read-only projection of a booking used for revenue aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRevenueRecord {
    pub booking_id: String,
    pub host_id: String,
    /// Gross price paid by the guest
    pub total_price: BigDecimal,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
}

/// Refund status as reported by the booking collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Read-only projection of a guest refund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub refund_id: String,
    pub booking_id: String,
    pub refund_amount: BigDecimal,
    pub status: RefundStatus,
    pub created_at: NaiveDateTime,
}

/// Errors that can occur in the payout system
#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Payout not found: {0}")]
    PayoutNotFound(String),
    #[error("Invalid transition for payout {payout_id}: {from} -> {to}")]
    InvalidTransition {
        payout_id: String,
        from: PayoutStatus,
        to: PayoutStatus,
    },
    #[error("Payout {0} was modified concurrently")]
    ConcurrentModification(String),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for payout operations
pub type PayoutResult<T> = Result<T, PayoutError>;
