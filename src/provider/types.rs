//! Internal representations of provider resources

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// A payout as the provider sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayout {
    /// Provider-assigned identifier
    pub id: String,
    /// Amount in major currency units
    pub amount: BigDecimal,
    pub currency: String,
    /// Provider status text (e.g. "pending", "succeeded")
    pub status: String,
    /// Reference number from the receiving institution, once known
    pub reference_number: Option<String>,
    /// Our payout id, echoed back from the metadata
    pub payout_id: Option<String>,
}

/// Cursor-based filter for listing provider payouts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderListFilter {
    /// Page size
    pub limit: Option<u32>,
    /// Return records after this provider id
    pub after: Option<String>,
    /// Return records before this provider id
    pub before: Option<String>,
}

impl ProviderListFilter {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Query string pairs, omitting unset cursors
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if let Some(before) = &self.before {
            pairs.push(("before", before.clone()));
        }
        pairs
    }
}

/// One page of provider payouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayoutPage {
    pub data: Vec<ProviderPayout>,
    pub has_more: bool,
}

impl ProviderPayoutPage {
    /// Cursor for the next page, if there is one
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_more {
            self.data.last().map(|p| p.id.as_str())
        } else {
            None
        }
    }
}

/// Outcome of a pre-flight bank account check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountValidation {
    pub valid: bool,
    /// Account holder name as registered with the bank
    pub account_name: Option<String>,
}

/// Receipt for a submitted batch payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPayoutReceipt {
    pub id: String,
    pub status: String,
    /// Payouts created within the batch
    pub payouts: Vec<ProviderPayout>,
}
