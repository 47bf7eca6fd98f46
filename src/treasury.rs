//! Main treasury facade that coordinates payouts, batches and reporting

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::info;

use crate::config::EngineConfig;
use crate::payout::{
    BatchDisburser, BatchOutcome, FeePolicy, FeeQuote, PayoutOrchestrator, PayoutStats,
};
use crate::provider::{
    BankAccountValidation, BatchPayoutReceipt, HttpDisbursementProvider, ProviderListFilter, ProviderPayout,
    ProviderPayoutPage,
};
use crate::reconciliation::{
    export_financial_report, PlatformMetrics, ReconciliationEngine, ReportPeriod, ReportWindow,
};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_account_number, validate_required_text};

/// Treasury system exposing the admin and reporting surfaces
pub struct Treasury<S, P>
where
    S: PayoutStorage + RevenueSource + Clone,
    P: DisbursementProvider,
{
    storage: S,
    provider: Arc<P>,
    fee_policy: Arc<FeePolicy>,
    orchestrator: PayoutOrchestrator<S, P>,
    batch: BatchDisburser<S, P>,
    reconciliation: ReconciliationEngine,
}

impl<S> Treasury<S, HttpDisbursementProvider>
where
    S: PayoutStorage + RevenueSource + Clone,
{
    /// Create a treasury talking to the configured HTTP provider
    pub fn connect(storage: S, config: EngineConfig) -> PayoutResult<Self> {
        let provider = HttpDisbursementProvider::new(config.provider.clone())?;
        Self::new(storage, provider, config)
    }
}

impl<S, P> Treasury<S, P>
where
    S: PayoutStorage + RevenueSource + Clone,
    P: DisbursementProvider,
{
    /// Create a treasury with the given storage backend and provider
    pub fn new(storage: S, provider: P, config: EngineConfig) -> PayoutResult<Self> {
        Self::with_shared_provider(storage, Arc::new(provider), config)
    }

    /// Create a treasury sharing a provider with other components
    pub fn with_shared_provider(
        storage: S,
        provider: Arc<P>,
        config: EngineConfig,
    ) -> PayoutResult<Self> {
        config
            .validate()
            .map_err(|e| PayoutError::Config(e.to_string()))?;

        let fee_policy = Arc::new(FeePolicy::new(config.policy));
        Ok(Self {
            orchestrator: PayoutOrchestrator::new(
                storage.clone(),
                provider.clone(),
                fee_policy.clone(),
                config.orchestrator.clone(),
            ),
            batch: BatchDisburser::new(
                storage.clone(),
                provider.clone(),
                fee_policy.clone(),
                config.orchestrator,
            ),
            reconciliation: ReconciliationEngine::new(config.reconciliation),
            storage,
            provider,
            fee_policy,
        })
    }

    // Payout operations
    /// Fee, net amount and bounds for a prospective payout
    pub fn quote_fee(&self, method: &PayoutMethod, amount: &BigDecimal) -> FeeQuote {
        self.fee_policy.quote(method, amount)
    }

    /// Record a host withdrawal request
    pub async fn submit_payout(&self, request: PayoutRequest) -> PayoutResult<Payout> {
        self.orchestrator.submit_payout(request).await
    }

    /// Approve a pending payout and hand it to the provider
    pub async fn approve_payout(
        &self,
        payout_id: &str,
        transaction_ref: &str,
        actor: &str,
    ) -> PayoutResult<Payout> {
        self.orchestrator
            .approve_payout(payout_id, transaction_ref, actor)
            .await
    }

    /// Mark a processing payout as delivered
    pub async fn complete_payout(
        &self,
        payout_id: &str,
        proof_url: Option<String>,
        actor: &str,
    ) -> PayoutResult<Payout> {
        self.orchestrator
            .complete_payout(payout_id, proof_url, actor)
            .await
    }

    /// Reject a pending payout
    pub async fn reject_payout(
        &self,
        payout_id: &str,
        reason: &str,
        actor: &str,
    ) -> PayoutResult<Payout> {
        self.orchestrator.reject_payout(payout_id, reason, actor).await
    }

    /// Fail an approved or processing payout
    pub async fn fail_payout(
        &self,
        payout_id: &str,
        reason: &str,
        actor: &str,
    ) -> PayoutResult<Payout> {
        self.orchestrator.fail_payout(payout_id, reason, actor).await
    }

    pub async fn get_payout(&self, payout_id: &str) -> PayoutResult<Payout> {
        self.orchestrator.get_payout(payout_id).await
    }

    pub async fn list_payouts(&self, filter: &PayoutFilter) -> PayoutResult<Vec<Payout>> {
        self.orchestrator.list_payouts(filter).await
    }

    pub async fn get_payout_stats(&self) -> PayoutResult<PayoutStats> {
        self.orchestrator.payout_stats().await
    }

    pub async fn audit_trail(&self, payout_id: &str) -> PayoutResult<Vec<AuditEntry>> {
        self.orchestrator.audit_trail(payout_id).await
    }

    /// Disburse to many recipients in one run
    pub async fn disburse_batch(
        &self,
        requests: Vec<PayoutRequest>,
        actor: &str,
    ) -> BatchOutcome {
        self.batch.disburse(requests, actor).await
    }

    // Provider operations
    /// Ask the provider whether a bank account exists
    pub async fn validate_bank_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> PayoutResult<BankAccountValidation> {
        validate_required_text("Bank code", bank_code)?;
        validate_account_number(account_number)?;

        Ok(self
            .provider
            .validate_bank_account(bank_code.trim(), account_number)
            .await?)
    }

    /// Current provider view of a submitted payout
    pub async fn provider_payout(&self, payout_id: &str) -> PayoutResult<ProviderPayout> {
        let payout = self.orchestrator.get_payout(payout_id).await?;
        let provider_id = payout.provider_payout_id.ok_or_else(|| {
            PayoutError::Validation(format!(
                "Payout {} has not been submitted to the provider",
                payout_id
            ))
        })?;

        Ok(self.provider.retrieve_payout(&provider_id).await?)
    }

    /// Send stored pending payouts to the provider's batch endpoint
    ///
    /// Local records are not changed. The provider deduplicates on the `payout_id`
    /// metadata, so a later approval of the same payout does not pay twice.
    pub async fn submit_provider_batch(
        &self,
        payout_ids: &[String],
    ) -> PayoutResult<BatchPayoutReceipt> {
        if payout_ids.is_empty() {
            return Err(PayoutError::Validation(
                "Provider batch needs at least one payout".to_string(),
            ));
        }

        let mut payouts = Vec::with_capacity(payout_ids.len());
        for payout_id in payout_ids {
            let payout = self.orchestrator.get_payout(payout_id).await?;
            if payout.status != PayoutStatus::Pending {
                return Err(PayoutError::Validation(format!(
                    "Payout {} is {} and cannot be batched",
                    payout.id, payout.status
                )));
            }
            payouts.push(payout);
        }

        let receipt = self.provider.create_batch_payout(&payouts).await?;
        info!(
            batch_id = %receipt.id,
            status = %receipt.status,
            payouts = receipt.payouts.len(),
            "provider batch submitted"
        );
        Ok(receipt)
    }

    /// Page through payouts as the provider sees them
    pub async fn list_provider_payouts(
        &self,
        filter: &ProviderListFilter,
    ) -> PayoutResult<ProviderPayoutPage> {
        Ok(self.provider.list_payouts(filter).await?)
    }

    // Reporting
    /// Platform metrics for the period ending with the month of `as_of`
    pub async fn get_platform_earnings(
        &self,
        period: ReportPeriod,
        as_of: NaiveDate,
    ) -> PayoutResult<PlatformMetrics> {
        let window = ReportWindow::new(period, as_of);
        let from = window.previous().start();
        let to = window.end();

        let bookings = self.storage.bookings_between(from, to).await?;
        let refunds = self.storage.refunds_between(from, to).await?;
        let payouts = self.storage.list_payouts(&PayoutFilter::default()).await?;

        let metrics = self
            .reconciliation
            .aggregate(&bookings, &payouts, &refunds, window);

        info!(
            period = %period,
            from = %window.start(),
            to = %to,
            bookings = bookings.len(),
            payouts = payouts.len(),
            refunds = refunds.len(),
            overall_health = metrics.health.overall,
            "platform earnings computed"
        );
        Ok(metrics)
    }

    /// CSV rendering of previously computed metrics
    pub fn export_financial_report(&self, metrics: &PlatformMetrics) -> String {
        export_financial_report(metrics)
    }
}
