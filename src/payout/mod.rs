//! Payout lifecycle: fees, validation, state machine and batch disbursement

pub mod batch;
pub mod fee;
pub mod lifecycle;
pub mod orchestrator;
pub mod stats;
pub mod validator;

pub use batch::{BatchDisburser, BatchFailure, BatchOutcome, BatchSuccess};
pub use fee::{FeePolicy, FeeQuote};
pub use orchestrator::PayoutOrchestrator;
pub use stats::PayoutStats;
pub use validator::PayoutValidator;
