//! Batch disbursement with per-recipient failure isolation

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::payout::fee::FeePolicy;
use crate::payout::orchestrator::verify_bank_account;
use crate::payout::validator::PayoutValidator;
use crate::traits::*;
use crate::types::*;

/// A recipient the provider accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSuccess {
    /// Position in the submitted list
    pub index: usize,
    pub host_id: String,
    pub payout_id: String,
    pub amount: BigDecimal,
    pub fee: BigDecimal,
    pub net_amount: BigDecimal,
    pub provider_payout_id: String,
    /// False when the provider accepted the payout but the local record could not be written
    pub recorded: bool,
}

/// A recipient that was skipped or refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Position in the submitted list
    pub index: usize,
    pub host_id: String,
    pub amount: BigDecimal,
    pub reason: String,
    /// Provider status code, when the provider refused
    pub code: Option<u16>,
}

/// Result of a batch run
///
/// Every submitted recipient lands in exactly one of `successful` or `failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub successful: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// Gross amount the provider accepted
    pub fn disbursed_amount(&self) -> BigDecimal {
        self.successful
            .iter()
            .fold(BigDecimal::from(0), |acc, s| acc + &s.amount)
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends many payouts in one run, one provider call per recipient
///
/// A failing recipient never stops the run and never undoes an earlier success.
/// Calls go out in order; pacing is left to the provider's rate limiter.
pub struct BatchDisburser<S: PayoutStorage, P: DisbursementProvider> {
    storage: S,
    provider: Arc<P>,
    fee_policy: Arc<FeePolicy>,
    validator: Box<dyn PayoutRequestValidator>,
    config: OrchestratorConfig,
}

impl<S: PayoutStorage, P: DisbursementProvider> BatchDisburser<S, P> {
    pub fn new(
        storage: S,
        provider: Arc<P>,
        fee_policy: Arc<FeePolicy>,
        config: OrchestratorConfig,
    ) -> Self {
        let validator = Box::new(PayoutValidator::new(fee_policy.clone()));
        Self {
            storage,
            provider,
            fee_policy,
            validator,
            config,
        }
    }

    /// Disburse to every recipient, collecting per-recipient outcomes
    pub async fn disburse(&self, requests: Vec<PayoutRequest>, actor: &str) -> BatchOutcome {
        let batch_id = format!("batch_{}", uuid::Uuid::new_v4());
        let started_at = chrono::Utc::now().naive_utc();
        info!(batch_id = %batch_id, recipients = requests.len(), "batch disbursement started");

        let mut successful = Vec::new();
        let mut failed = Vec::new();

        for (index, request) in requests.into_iter().enumerate() {
            let host_id = request.host_id.clone();
            let amount = request.amount.clone();

            match self.disburse_one(&batch_id, index, request, actor).await {
                Ok(success) => successful.push(success),
                Err(err) => {
                    let code = match &err {
                        PayoutError::Provider(provider_err) => provider_err.code,
                        _ => None,
                    };
                    warn!(
                        batch_id = %batch_id,
                        index,
                        host_id = %host_id,
                        error = %err,
                        "batch recipient failed"
                    );
                    failed.push(BatchFailure {
                        index,
                        host_id,
                        amount,
                        reason: err.to_string(),
                        code,
                    });
                }
            }
        }

        info!(
            batch_id = %batch_id,
            successful = successful.len(),
            failed = failed.len(),
            "batch disbursement finished"
        );

        BatchOutcome {
            batch_id,
            successful,
            failed,
            started_at,
            finished_at: chrono::Utc::now().naive_utc(),
        }
    }

    async fn disburse_one(
        &self,
        batch_id: &str,
        index: usize,
        request: PayoutRequest,
        actor: &str,
    ) -> PayoutResult<BatchSuccess> {
        self.validator.validate(&request)?;

        let fee = self.fee_policy.fee(&request.method, &request.amount);
        let mut payout = Payout::new(request, fee, self.fee_policy.currency().to_string());

        if self.config.verify_bank_accounts {
            verify_bank_account(self.provider.as_ref(), &payout).await?;
        }

        let approval = payout.approve(batch_id, actor)?;
        let remote = self.provider.create_payout(&payout).await?;
        let processing = payout.mark_processing(&remote.id)?;

        // The money has moved; a storage failure is reported, not rolled back
        let recorded = match self
            .storage
            .save_payout(&payout, &[approval, processing])
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!(
                    batch_id,
                    payout_id = %payout.id,
                    provider_payout_id = %remote.id,
                    error = %err,
                    "provider accepted payout but it could not be recorded"
                );
                false
            }
        };

        Ok(BatchSuccess {
            index,
            host_id: payout.host_id,
            payout_id: payout.id,
            amount: payout.amount,
            fee: payout.fee,
            net_amount: payout.net_amount,
            provider_payout_id: remote.id,
            recorded,
        })
    }
}
