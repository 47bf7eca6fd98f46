//! # Payout Core
//!
//! Host payout lifecycle and financial reconciliation for a booking marketplace.
//!
//! ## Features
//!
//! - **Fee policy**: Per-method fixed and percentage fees with configurable bounds
//! - **Payout lifecycle**: Operator-gated state machine with an audit trail
//! - **Disbursement provider**: HTTP client with Basic auth and token-bucket pacing
//! - **Batch disbursement**: Sequential runs with per-recipient failure isolation
//! - **Reconciliation**: Monthly trends, method breakdowns, top hosts and health scores
//! - **Storage abstraction**: Database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use payout_core::{EngineConfig, MemoryStorage, PayoutMethod, PayoutRequest, RecipientProperties, Treasury};
//! use bigdecimal::BigDecimal;
//!
//! # async fn run() -> payout_core::PayoutResult<()> {
//! let config = EngineConfig::load(None).map_err(|e| payout_core::PayoutError::Config(e.to_string()))?;
//! let treasury = Treasury::connect(MemoryStorage::new(), config)?;
//!
//! let payout = treasury
//!     .submit_payout(PayoutRequest::new(
//!         "host-42",
//!         BigDecimal::from(5000),
//!         PayoutMethod::BankTransfer,
//!         RecipientProperties::bank("BPI", "001234567890", "Maria Santos"),
//!     ))
//!     .await?;
//! treasury.approve_payout(&payout.id, "TX123", "ops@example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod payout;
pub mod provider;
pub mod reconciliation;
pub mod traits;
pub mod treasury;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::EngineConfig;
pub use payout::*;
pub use provider::{HttpDisbursementProvider, ProviderError, ProviderResult};
pub use reconciliation::{PlatformMetrics, ReconciliationEngine, ReportPeriod, ReportWindow};
pub use traits::*;
pub use treasury::Treasury;
pub use types::*;
pub use utils::memory_storage::MemoryStorage;
