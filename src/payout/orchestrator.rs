//! Payout state machine driven by operator commands

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::config::OrchestratorConfig;
use crate::payout::fee::FeePolicy;
use crate::payout::stats::PayoutStats;
use crate::payout::validator::PayoutValidator;
use crate::provider::ProviderPayout;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_required_text;

/// Per-payout async locks, so commands on one payout run one at a time
#[derive(Debug, Default)]
struct PayoutLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PayoutLocks {
    fn handle(&self, payout_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop locks nobody is holding or waiting on
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(payout_id.to_string()).or_default().clone()
    }
}

/// Payout orchestrator owning every status change
///
/// Transitions are computed on a copy of the stored record and written back with a
/// version check, so a refused or conflicting command never leaves a partial update.
pub struct PayoutOrchestrator<S: PayoutStorage, P: DisbursementProvider> {
    storage: S,
    provider: Arc<P>,
    fee_policy: Arc<FeePolicy>,
    validator: Box<dyn PayoutRequestValidator>,
    config: OrchestratorConfig,
    locks: PayoutLocks,
}

impl<S: PayoutStorage, P: DisbursementProvider> PayoutOrchestrator<S, P> {
    /// Create a new orchestrator with the default request validator
    pub fn new(
        storage: S,
        provider: Arc<P>,
        fee_policy: Arc<FeePolicy>,
        config: OrchestratorConfig,
    ) -> Self {
        let validator = Box::new(PayoutValidator::new(fee_policy.clone()));
        Self::with_validator(storage, provider, fee_policy, config, validator)
    }

    /// Create a new orchestrator with a custom request validator
    pub fn with_validator(
        storage: S,
        provider: Arc<P>,
        fee_policy: Arc<FeePolicy>,
        config: OrchestratorConfig,
        validator: Box<dyn PayoutRequestValidator>,
    ) -> Self {
        Self {
            storage,
            provider,
            fee_policy,
            validator,
            config,
            locks: PayoutLocks::default(),
        }
    }

    /// Accept a host withdrawal request as a pending payout
    pub async fn submit_payout(&self, request: PayoutRequest) -> PayoutResult<Payout> {
        self.validator.validate(&request)?;

        let fee = self.fee_policy.fee(&request.method, &request.amount);
        let payout = Payout::new(request, fee, self.fee_policy.currency().to_string());
        self.storage.save_payout(&payout, &[]).await?;

        info!(
            payout_id = %payout.id,
            host_id = %payout.host_id,
            method = %payout.method,
            amount = %payout.amount,
            fee = %payout.fee,
            "payout submitted"
        );
        Ok(payout)
    }

    /// Operator sign-off: `pending -> approved -> processing`
    ///
    /// The provider payout is created after the sign-off. When the provider refuses,
    /// either on the bank pre-check or on the payout itself, nothing is written and
    /// the payout stays pending, unless the refusal is fatal, in which case the
    /// payout ends up failed.
    pub async fn approve_payout(
        &self,
        payout_id: &str,
        transaction_ref: &str,
        actor: &str,
    ) -> PayoutResult<Payout> {
        validate_required_text("Transaction reference", transaction_ref)?;

        let lock = self.locks.handle(payout_id);
        let _guard = lock.lock().await;

        let current = self.load(payout_id).await?;
        let mut payout = current.clone();
        let approval = payout.approve(transaction_ref.trim(), actor)?;

        match self.hand_off(&payout).await {
            Ok(remote) => {
                let processing = payout.mark_processing(&remote.id)?;
                self.persist(current.version, payout, vec![approval, processing])
                    .await
            }
            Err(PayoutError::Provider(err)) if err.is_fatal() => {
                warn!(
                    payout_id,
                    code = ?err.code,
                    error = %err,
                    "provider refused payout permanently"
                );
                let failure = payout.fail(&err.message, "provider")?;
                self.persist(current.version, payout, vec![approval, failure])
                    .await?;
                Err(err.into())
            }
            Err(PayoutError::Provider(err)) => {
                warn!(
                    payout_id,
                    code = ?err.code,
                    error = %err,
                    "provider call failed, payout left pending"
                );
                Err(err.into())
            }
            Err(err) => Err(err),
        }
    }

    /// Bank pre-check (when enabled) followed by the provider payout
    async fn hand_off(&self, payout: &Payout) -> PayoutResult<ProviderPayout> {
        if self.config.verify_bank_accounts {
            verify_bank_account(self.provider.as_ref(), payout).await?;
        }
        Ok(self.provider.create_payout(payout).await?)
    }

    /// `processing -> completed`, with optional proof of transfer
    pub async fn complete_payout(
        &self,
        payout_id: &str,
        proof_url: Option<String>,
        actor: &str,
    ) -> PayoutResult<Payout> {
        let proof_url = proof_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let lock = self.locks.handle(payout_id);
        let _guard = lock.lock().await;

        let current = self.load(payout_id).await?;
        let mut payout = current.clone();
        let entry = payout.complete(proof_url, actor)?;
        self.persist(current.version, payout, vec![entry]).await
    }

    /// `pending -> rejected`
    pub async fn reject_payout(
        &self,
        payout_id: &str,
        reason: &str,
        actor: &str,
    ) -> PayoutResult<Payout> {
        validate_required_text("Rejection reason", reason)?;

        let lock = self.locks.handle(payout_id);
        let _guard = lock.lock().await;

        let current = self.load(payout_id).await?;
        let mut payout = current.clone();
        let entry = payout.reject(reason.trim(), actor)?;
        self.persist(current.version, payout, vec![entry]).await
    }

    /// `approved | processing -> failed`, e.g. after the provider reports a bounce
    pub async fn fail_payout(
        &self,
        payout_id: &str,
        reason: &str,
        actor: &str,
    ) -> PayoutResult<Payout> {
        validate_required_text("Failure reason", reason)?;

        let lock = self.locks.handle(payout_id);
        let _guard = lock.lock().await;

        let current = self.load(payout_id).await?;
        let mut payout = current.clone();
        let entry = payout.fail(reason.trim(), actor)?;
        self.persist(current.version, payout, vec![entry]).await
    }

    /// Get a payout by ID, returning an error if not found
    pub async fn get_payout(&self, payout_id: &str) -> PayoutResult<Payout> {
        self.load(payout_id).await
    }

    /// List payouts matching a filter
    pub async fn list_payouts(&self, filter: &PayoutFilter) -> PayoutResult<Vec<Payout>> {
        self.storage.list_payouts(filter).await
    }

    /// Dashboard statistics over every payout
    pub async fn payout_stats(&self) -> PayoutResult<PayoutStats> {
        let payouts = self.storage.list_payouts(&PayoutFilter::default()).await?;
        Ok(PayoutStats::from_payouts(&payouts))
    }

    /// Status history of a payout
    pub async fn audit_trail(&self, payout_id: &str) -> PayoutResult<Vec<AuditEntry>> {
        self.load(payout_id).await?;
        self.storage.get_audit_trail(payout_id).await
    }

    async fn load(&self, payout_id: &str) -> PayoutResult<Payout> {
        self.storage
            .get_payout(payout_id)
            .await?
            .ok_or_else(|| PayoutError::PayoutNotFound(payout_id.to_string()))
    }

    async fn persist(
        &self,
        expected_version: u64,
        mut payout: Payout,
        audit: Vec<AuditEntry>,
    ) -> PayoutResult<Payout> {
        payout.version = expected_version + 1;
        self.storage
            .update_payout(&payout, expected_version, &audit)
            .await?;

        for entry in &audit {
            info!(
                payout_id = %entry.payout_id,
                from = %entry.from,
                to = %entry.to,
                actor = %entry.actor,
                "payout transition"
            );
        }
        Ok(payout)
    }
}

/// Pre-flight check that a bank transfer recipient exists at the bank
///
/// Non-bank methods pass through untouched.
pub(crate) async fn verify_bank_account<P: DisbursementProvider + ?Sized>(
    provider: &P,
    payout: &Payout,
) -> PayoutResult<()> {
    if !payout.method.requires_bank_code() {
        return Ok(());
    }

    let properties = &payout.properties;
    let (bank_code, account_number) = match (
        properties.bank_code.as_deref(),
        properties.account_number.as_deref(),
    ) {
        (Some(bank_code), Some(account_number)) => (bank_code, account_number),
        _ => {
            return Err(PayoutError::Validation(
                "Bank code and account number are required for bank transfers".to_string(),
            ))
        }
    };

    let validation = provider
        .validate_bank_account(bank_code, account_number)
        .await?;

    if !validation.valid {
        return Err(PayoutError::Validation(format!(
            "Bank account ending in {} could not be verified with bank {}",
            last_digits(account_number),
            bank_code
        )));
    }

    if let (Some(resolved), Some(expected)) = (
        validation.account_name.as_deref(),
        properties.account_name.as_deref(),
    ) {
        if !resolved.trim().eq_ignore_ascii_case(expected.trim()) {
            warn!(
                payout_id = %payout.id,
                bank_code,
                "bank account holder name differs from recipient name"
            );
        }
    }

    Ok(())
}

fn last_digits(account_number: &str) -> String {
    let digits: Vec<char> = account_number.chars().filter(char::is_ascii_digit).collect();
    digits[digits.len().saturating_sub(4)..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        BankAccountValidation, BatchPayoutReceipt, ProviderError, ProviderListFilter,
        ProviderPayout, ProviderPayoutPage, ProviderResult,
    };
    use crate::utils::memory_storage::MemoryStorage;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that fails `create_payout` or the bank check with a preset error
    #[derive(Default)]
    struct StubProvider {
        create_error: Option<ProviderError>,
        validate_error: Option<ProviderError>,
        invalid_accounts: Vec<String>,
        create_calls: AtomicUsize,
    }

    #[async_trait]
    impl DisbursementProvider for StubProvider {
        async fn create_payout(&self, payout: &Payout) -> ProviderResult<ProviderPayout> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.create_error {
                return Err(err.clone());
            }
            Ok(ProviderPayout {
                id: format!("po_{}", payout.id),
                amount: payout.amount.clone(),
                currency: payout.currency.clone(),
                status: "pending".to_string(),
                reference_number: None,
                payout_id: Some(payout.id.clone()),
            })
        }

        async fn retrieve_payout(&self, provider_id: &str) -> ProviderResult<ProviderPayout> {
            Err(ProviderError::http(404, Some(format!("{} not found", provider_id))))
        }

        async fn list_payouts(&self, _filter: &ProviderListFilter) -> ProviderResult<ProviderPayoutPage> {
            Ok(ProviderPayoutPage {
                data: Vec::new(),
                has_more: false,
            })
        }

        async fn create_batch_payout(&self, _payouts: &[Payout]) -> ProviderResult<BatchPayoutReceipt> {
            Err(ProviderError::http(501, None))
        }

        async fn validate_bank_account(
            &self,
            _bank_code: &str,
            account_number: &str,
        ) -> ProviderResult<BankAccountValidation> {
            if let Some(err) = &self.validate_error {
                return Err(err.clone());
            }
            Ok(BankAccountValidation {
                valid: !self.invalid_accounts.iter().any(|a| a == account_number),
                account_name: Some("Maria Santos".to_string()),
            })
        }
    }

    fn orchestrator(provider: StubProvider) -> PayoutOrchestrator<MemoryStorage, StubProvider> {
        PayoutOrchestrator::new(
            MemoryStorage::new(),
            Arc::new(provider),
            Arc::new(FeePolicy::default()),
            OrchestratorConfig::default(),
        )
    }

    fn bank_request(account_number: &str) -> PayoutRequest {
        PayoutRequest::new(
            "host-1",
            BigDecimal::from(5000),
            PayoutMethod::BankTransfer,
            RecipientProperties::bank("BPI", account_number, "Maria Santos"),
        )
    }

    #[tokio::test]
    async fn test_happy_path() {
        let orchestrator = orchestrator(StubProvider::default());
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();
        assert_eq!(payout.fee, BigDecimal::from(25));
        assert_eq!(payout.net_amount, BigDecimal::from(4975));

        let approved = orchestrator
            .approve_payout(&payout.id, "TX123", "ops")
            .await
            .unwrap();
        assert_eq!(approved.status, PayoutStatus::Processing);
        assert_eq!(approved.transaction_ref.as_deref(), Some("TX123"));
        assert!(approved.provider_payout_id.is_some());

        let completed = orchestrator
            .complete_payout(&payout.id, None, "ops")
            .await
            .unwrap();
        assert_eq!(completed.status, PayoutStatus::Completed);
        assert_eq!(completed.proof_url, None);
        assert_eq!(completed.version, 2);

        let trail = orchestrator.audit_trail(&payout.id).await.unwrap();
        let steps: Vec<_> = trail.iter().map(|e| (e.from, e.to)).collect();
        assert_eq!(
            steps,
            vec![
                (PayoutStatus::Pending, PayoutStatus::Approved),
                (PayoutStatus::Approved, PayoutStatus::Processing),
                (PayoutStatus::Processing, PayoutStatus::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_transient_provider_error_leaves_payout_pending() {
        let orchestrator = orchestrator(StubProvider {
            create_error: Some(ProviderError::http(503, None)),
            ..StubProvider::default()
        });
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();

        let err = orchestrator
            .approve_payout(&payout.id, "TX123", "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, PayoutError::Provider(ref e) if e.code == Some(503)));

        let stored = orchestrator.get_payout(&payout.id).await.unwrap();
        assert_eq!(stored.status, PayoutStatus::Pending);
        assert_eq!(stored.transaction_ref, None);
        assert!(orchestrator.audit_trail(&payout.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_provider_error_fails_payout() {
        let orchestrator = orchestrator(StubProvider {
            create_error: Some(ProviderError::http(403, Some("account suspended".to_string()))),
            ..StubProvider::default()
        });
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();

        assert!(orchestrator
            .approve_payout(&payout.id, "TX123", "ops")
            .await
            .is_err());

        let stored = orchestrator.get_payout(&payout.id).await.unwrap();
        assert_eq!(stored.status, PayoutStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("account suspended"));
    }

    #[tokio::test]
    async fn test_fatal_bank_check_error_fails_payout() {
        let orchestrator = orchestrator(StubProvider {
            validate_error: Some(ProviderError::http(403, Some("Account suspended".to_string()))),
            ..StubProvider::default()
        });
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();

        let err = orchestrator
            .approve_payout(&payout.id, "TX123", "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, PayoutError::Provider(ref e) if e.code == Some(403)));
        assert_eq!(orchestrator.provider.create_calls.load(Ordering::SeqCst), 0);

        let stored = orchestrator.get_payout(&payout.id).await.unwrap();
        assert_eq!(stored.status, PayoutStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("Account suspended"));

        let trail = orchestrator.audit_trail(&payout.id).await.unwrap();
        let steps: Vec<_> = trail.iter().map(|e| (e.from, e.to)).collect();
        assert_eq!(
            steps,
            vec![
                (PayoutStatus::Pending, PayoutStatus::Approved),
                (PayoutStatus::Approved, PayoutStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn test_transient_bank_check_error_leaves_payout_pending() {
        let orchestrator = orchestrator(StubProvider {
            validate_error: Some(ProviderError::transport("connection reset")),
            ..StubProvider::default()
        });
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();

        assert!(orchestrator
            .approve_payout(&payout.id, "TX123", "ops")
            .await
            .is_err());
        assert_eq!(
            orchestrator.get_payout(&payout.id).await.unwrap().status,
            PayoutStatus::Pending
        );
        assert!(orchestrator.audit_trail(&payout.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_bank_account_blocks_approval() {
        let provider = StubProvider {
            invalid_accounts: vec!["009999999999".to_string()],
            ..StubProvider::default()
        };
        let orchestrator = orchestrator(provider);
        let payout = orchestrator
            .submit_payout(bank_request("009999999999"))
            .await
            .unwrap();

        let err = orchestrator
            .approve_payout(&payout.id, "TX123", "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, PayoutError::Validation(_)));
        assert!(err.to_string().contains("ending in 9999"));
        assert_eq!(orchestrator.provider.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            orchestrator.get_payout(&payout.id).await.unwrap().status,
            PayoutStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_reject_requires_reason_and_is_terminal() {
        let orchestrator = orchestrator(StubProvider::default());
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();

        assert!(matches!(
            orchestrator.reject_payout(&payout.id, " ", "ops").await,
            Err(PayoutError::Validation(_))
        ));

        let rejected = orchestrator
            .reject_payout(&payout.id, "Duplicate request", "ops")
            .await
            .unwrap();
        assert_eq!(rejected.status, PayoutStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Duplicate request"));

        let err = orchestrator
            .approve_payout(&payout.id, "TX123", "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, PayoutError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_complete_from_pending_is_refused() {
        let orchestrator = orchestrator(StubProvider::default());
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();

        let err = orchestrator
            .complete_payout(&payout.id, Some("https://proof".to_string()), "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, PayoutError::InvalidTransition { .. }));

        let stored = orchestrator.get_payout(&payout.id).await.unwrap();
        assert_eq!(stored, payout);
    }

    #[tokio::test]
    async fn test_concurrent_approve_and_reject_only_one_wins() {
        let orchestrator = Arc::new(orchestrator(StubProvider::default()));
        let payout = orchestrator
            .submit_payout(bank_request("001234567890"))
            .await
            .unwrap();

        let approve = {
            let orchestrator = orchestrator.clone();
            let id = payout.id.clone();
            tokio::spawn(async move { orchestrator.approve_payout(&id, "TX1", "ops-a").await })
        };
        let reject = {
            let orchestrator = orchestrator.clone();
            let id = payout.id.clone();
            tokio::spawn(async move { orchestrator.reject_payout(&id, "fraud", "ops-b").await })
        };

        let results = [approve.await.unwrap(), reject.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let trail = orchestrator.audit_trail(&payout.id).await.unwrap();
        assert_eq!(
            trail.iter().filter(|e| e.from == PayoutStatus::Pending).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_payout() {
        let orchestrator = orchestrator(StubProvider::default());
        let err = orchestrator
            .reject_payout("missing", "reason", "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, PayoutError::PayoutNotFound(_)));
    }

    #[test]
    fn test_last_digits() {
        assert_eq!(last_digits("0012-3456-7890"), "7890");
        assert_eq!(last_digits("12"), "12");
    }
}
