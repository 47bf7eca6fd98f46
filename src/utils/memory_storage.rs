//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct PayoutTables {
    payouts: HashMap<String, Payout>,
    audit: Vec<AuditEntry>,
}

/// In-memory storage implementation for testing and development
///
/// Payouts and their audit trail share one lock so a transition and its audit
/// entries become visible together.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    tables: Arc<RwLock<PayoutTables>>,
    bookings: Arc<RwLock<Vec<BookingRevenueRecord>>>,
    refunds: Arc<RwLock<Vec<RefundRecord>>>,
}

fn read<T>(lock: &RwLock<T>) -> PayoutResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| PayoutError::Storage("storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> PayoutResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| PayoutError::Storage("storage lock poisoned".to_string()))
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(PayoutTables::default())),
            bookings: Arc::new(RwLock::new(Vec::new())),
            refunds: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Load a booking projection (stands in for the booking service)
    pub fn insert_booking(&self, booking: BookingRevenueRecord) -> PayoutResult<()> {
        write(&self.bookings)?.push(booking);
        Ok(())
    }

    /// Load a refund projection (stands in for the booking service)
    pub fn insert_refund(&self, refund: RefundRecord) -> PayoutResult<()> {
        write(&self.refunds)?.push(refund);
        Ok(())
    }

    /// Store a payout as-is, bypassing lifecycle checks (seeding historical data)
    pub fn import_payout(&self, payout: Payout) -> PayoutResult<()> {
        write(&self.tables)?
            .payouts
            .insert(payout.id.clone(), payout);
        Ok(())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> PayoutResult<()> {
        let mut tables = write(&self.tables)?;
        tables.payouts.clear();
        tables.audit.clear();
        write(&self.bookings)?.clear();
        write(&self.refunds)?.clear();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayoutStorage for MemoryStorage {
    async fn save_payout(&self, payout: &Payout, audit: &[AuditEntry]) -> PayoutResult<()> {
        let mut tables = write(&self.tables)?;
        if tables.payouts.contains_key(&payout.id) {
            return Err(PayoutError::Storage(format!(
                "Payout with ID '{}' already exists",
                payout.id
            )));
        }
        tables.payouts.insert(payout.id.clone(), payout.clone());
        tables.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn get_payout(&self, payout_id: &str) -> PayoutResult<Option<Payout>> {
        Ok(read(&self.tables)?.payouts.get(payout_id).cloned())
    }

    async fn list_payouts(&self, filter: &PayoutFilter) -> PayoutResult<Vec<Payout>> {
        let tables = read(&self.tables)?;
        Ok(filter.apply(tables.payouts.values()))
    }

    async fn update_payout(
        &self,
        payout: &Payout,
        expected_version: u64,
        audit: &[AuditEntry],
    ) -> PayoutResult<()> {
        let mut tables = write(&self.tables)?;
        let stored = tables
            .payouts
            .get(&payout.id)
            .ok_or_else(|| PayoutError::PayoutNotFound(payout.id.clone()))?;

        if stored.version != expected_version {
            return Err(PayoutError::ConcurrentModification(payout.id.clone()));
        }

        tables.payouts.insert(payout.id.clone(), payout.clone());
        tables.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn get_audit_trail(&self, payout_id: &str) -> PayoutResult<Vec<AuditEntry>> {
        let tables = read(&self.tables)?;
        Ok(tables
            .audit
            .iter()
            .filter(|entry| entry.payout_id == payout_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RevenueSource for MemoryStorage {
    async fn bookings_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> PayoutResult<Vec<BookingRevenueRecord>> {
        let bookings = read(&self.bookings)?;
        Ok(bookings
            .iter()
            .filter(|b| b.created_at >= start && b.created_at < end)
            .cloned()
            .collect())
    }

    async fn refunds_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> PayoutResult<Vec<RefundRecord>> {
        let refunds = read(&self.refunds)?;
        Ok(refunds
            .iter()
            .filter(|r| r.created_at >= start && r.created_at < end)
            .cloned()
            .collect())
    }
}
