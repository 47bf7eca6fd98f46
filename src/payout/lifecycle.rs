//! Payout state transitions
//!
//! Each transition checks the current status before touching any field, so a refused
//! transition leaves the payout exactly as it was.

use crate::types::*;

impl Payout {
    /// Move to `next`, returning the audit entry for the change
    pub fn transition_to(
        &mut self,
        next: PayoutStatus,
        actor: &str,
        note: Option<String>,
    ) -> PayoutResult<AuditEntry> {
        if !self.status.can_transition_to(next) {
            return Err(PayoutError::InvalidTransition {
                payout_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }

        let entry = AuditEntry::new(&self.id, self.status, next, actor, note);
        self.status = next;
        self.updated_at = entry.at;
        Ok(entry)
    }

    /// `pending -> approved` with the operator's attestation reference
    pub fn approve(&mut self, transaction_ref: &str, actor: &str) -> PayoutResult<AuditEntry> {
        let entry = self.transition_to(
            PayoutStatus::Approved,
            actor,
            Some(format!("transaction_ref={}", transaction_ref)),
        )?;
        self.transaction_ref = Some(transaction_ref.to_string());
        Ok(entry)
    }

    /// `approved -> processing` once the provider accepted the payout
    pub fn mark_processing(&mut self, provider_payout_id: &str) -> PayoutResult<AuditEntry> {
        let entry = self.transition_to(
            PayoutStatus::Processing,
            "provider",
            Some(format!("provider_payout_id={}", provider_payout_id)),
        )?;
        self.provider_payout_id = Some(provider_payout_id.to_string());
        Ok(entry)
    }

    /// `processing -> completed`
    pub fn complete(&mut self, proof_url: Option<String>, actor: &str) -> PayoutResult<AuditEntry> {
        let entry = self.transition_to(PayoutStatus::Completed, actor, proof_url.clone())?;
        self.proof_url = proof_url;
        Ok(entry)
    }

    /// `pending -> rejected`
    pub fn reject(&mut self, reason: &str, actor: &str) -> PayoutResult<AuditEntry> {
        let entry = self.transition_to(PayoutStatus::Rejected, actor, Some(reason.to_string()))?;
        self.rejection_reason = Some(reason.to_string());
        Ok(entry)
    }

    /// `approved | processing -> failed`
    pub fn fail(&mut self, reason: &str, actor: &str) -> PayoutResult<AuditEntry> {
        let entry = self.transition_to(PayoutStatus::Failed, actor, Some(reason.to_string()))?;
        self.failure_reason = Some(reason.to_string());
        Ok(entry)
    }
}
