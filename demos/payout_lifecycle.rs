//! Payout lifecycle walkthrough against an in-process sandbox provider

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use payout_core::provider::{
    BankAccountValidation, BatchPayoutReceipt, ProviderListFilter, ProviderPayout,
    ProviderPayoutPage,
};
use payout_core::reconciliation::ReportPeriod;
use payout_core::utils::init_tracing;
use payout_core::{
    BookingRevenueRecord, BookingStatus, DisbursementProvider, EngineConfig, MemoryStorage, Payout,
    PayoutMethod, PayoutRequest, ProviderError, ProviderResult, RecipientProperties, Treasury,
};

/// Accepts every payout except those for account numbers ending in 9999
#[derive(Default)]
struct SandboxProvider {
    issued: AtomicUsize,
}

#[async_trait]
impl DisbursementProvider for SandboxProvider {
    async fn create_payout(&self, payout: &Payout) -> ProviderResult<ProviderPayout> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderPayout {
            id: format!("po_sandbox_{}", n),
            amount: payout.amount.clone(),
            currency: payout.currency.clone(),
            status: "pending".to_string(),
            reference_number: Some(format!("REF{:06}", n)),
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
        Ok(BankAccountValidation {
            valid: !account_number.ends_with("9999"),
            account_name: Some("Maria Santos".to_string()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("💸 Payout Core - Lifecycle Example\n");

    let storage = MemoryStorage::new();
    let treasury = Treasury::new(storage.clone(), SandboxProvider::default(), EngineConfig::default())?;

    // 1. Quote and submit a withdrawal
    let quote = treasury.quote_fee(&PayoutMethod::BankTransfer, &BigDecimal::from(5000));
    println!(
        "  Quote: ₱{} via {} costs ₱{} (host receives ₱{})",
        quote.amount, quote.method, quote.fee, quote.net_amount
    );

    let payout = treasury
        .submit_payout(PayoutRequest::new(
            "host-42",
            BigDecimal::from(5000),
            PayoutMethod::BankTransfer,
            RecipientProperties::bank("BPI", "001234567890", "Maria Santos"),
        ))
        .await?;
    println!("  ✓ Submitted payout {} ({})", payout.id, payout.status);

    // 2. Operator sign-off hands the payout to the provider
    let payout = treasury
        .approve_payout(&payout.id, "TX123", "ops@example.com")
        .await?;
    println!(
        "  ✓ Approved, provider id {}",
        payout.provider_payout_id.as_deref().unwrap_or("-")
    );

    // 3. Proof of transfer arrives
    let payout = treasury
        .complete_payout(&payout.id, None, "ops@example.com")
        .await?;
    println!("  ✓ Completed ({})\n", payout.status);

    for entry in treasury.audit_trail(&payout.id).await? {
        println!("    {} -> {} by {}", entry.from, entry.to, entry.actor);
    }

    // 4. A batch where one bank account cannot be verified
    println!("\n📦 Batch disbursement...");
    let outcome = treasury
        .disburse_batch(
            vec![
                PayoutRequest::new(
                    "host-7",
                    BigDecimal::from(1200),
                    PayoutMethod::Gcash,
                    RecipientProperties::wallet("09171234567", "Juan Dela Cruz"),
                ),
                PayoutRequest::new(
                    "host-8",
                    BigDecimal::from(8000),
                    PayoutMethod::BankTransfer,
                    RecipientProperties::bank("BDO", "004500009999", "Ana Reyes"),
                ),
            ],
            "ops@example.com",
        )
        .await;
    println!(
        "  {}: {} sent, {} failed",
        outcome.batch_id,
        outcome.successful.len(),
        outcome.failed.len()
    );
    for failure in &outcome.failed {
        println!("    #{} {}: {}", failure.index, failure.host_id, failure.reason);
    }

    // 5. Reporting
    storage.insert_booking(BookingRevenueRecord {
        booking_id: "bk-1".to_string(),
        host_id: "host-42".to_string(),
        total_price: BigDecimal::from(60000),
        status: BookingStatus::Completed,
        created_at: Utc::now().naive_utc(),
    })?;

    let stats = treasury.get_payout_stats().await?;
    println!(
        "\n📊 {} payouts, {} in flight, success rate {:.1}%",
        stats.total_count, stats.in_flight_count, stats.success_rate
    );

    let metrics = treasury
        .get_platform_earnings(ReportPeriod::Quarter, Utc::now().date_naive())
        .await?;
    println!(
        "  Health: {:.1} ({})\n",
        metrics.health.overall, metrics.health.band
    );
    println!("{}", treasury.export_financial_report(&metrics));

    Ok(())
}
