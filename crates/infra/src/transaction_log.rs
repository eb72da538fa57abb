//! Append-only transaction log over the durable store.
//!
//! Source of truth for balance reconstruction and audit. The log never
//! rejects a well-formed entry: business validation (sufficient stock,
//! capacity) happens upstream in the ledger before an entry is constructed.

use std::sync::Arc;

use partledger_core::{DomainError, DomainResult, PartId, TransactionId};
use partledger_inventory::StockTransaction;

use crate::store::InventoryStore;

/// Read/append view of a part's immutable history.
#[derive(Debug)]
pub struct TransactionLog<S> {
    store: Arc<S>,
}

impl<S> Clone for TransactionLog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: InventoryStore> TransactionLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append an entry with no paired balance change.
    ///
    /// Rejects only malformed entries: zero quantity (`InvalidQuantity`) or
    /// an empty actor (`Validation`). Every successful append is visible to
    /// subsequent reads immediately.
    pub fn append(&self, transaction: &StockTransaction) -> DomainResult<TransactionId> {
        if transaction.quantity == 0 {
            return Err(DomainError::invalid_quantity(
                "transaction quantity cannot be zero",
            ));
        }
        if transaction.performed_by.trim().is_empty() {
            return Err(DomainError::validation("performed_by cannot be empty"));
        }

        self.store.append_transaction(transaction)?;
        Ok(transaction.id_typed())
    }

    /// A part's entries in commit order: finite, restartable (each call
    /// returns a fresh snapshot to iterate).
    pub fn transactions_for_part(&self, part_id: PartId) -> DomainResult<Vec<StockTransaction>> {
        Ok(self.store.transactions_for_part(part_id)?)
    }

    /// Recompute the balance purely from the log.
    ///
    /// Reconciliation/testing path, not the hot path: the ledger's stored
    /// balance is authoritative and must equal this sum at all times.
    pub fn reconstruct_balance(&self, part_id: PartId) -> DomainResult<i64> {
        let transactions = self.store.transactions_for_part(part_id)?;
        Ok(transactions.iter().map(|tx| tx.stock_delta()).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryInventoryStore;
    use chrono::Utc;
    use partledger_core::JobOrderId;

    fn log() -> TransactionLog<InMemoryInventoryStore> {
        TransactionLog::new(Arc::new(InMemoryInventoryStore::new()))
    }

    #[test]
    fn appended_entries_are_immediately_readable_in_order() {
        let log = log();
        let part_id = PartId::new();

        let a = StockTransaction::restock(part_id, 10, "buyer", Utc::now()).unwrap();
        let b = StockTransaction::consume(part_id, 3, "mechanic", None, Utc::now()).unwrap();
        log.append(&a).unwrap();
        log.append(&b).unwrap();

        let entries = log.transactions_for_part(part_id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id_typed(), a.id_typed());
        assert_eq!(entries[1].id_typed(), b.id_typed());
    }

    #[test]
    fn reconstruct_balance_sums_deltas_and_skips_reserve_entries() {
        let log = log();
        let part_id = PartId::new();
        let job = JobOrderId::new();

        log.append(&StockTransaction::restock(part_id, 10, "buyer", Utc::now()).unwrap())
            .unwrap();
        log.append(&StockTransaction::reserve(part_id, 5, "planner", job, Utc::now()).unwrap())
            .unwrap();
        log.append(
            &StockTransaction::consume(part_id, 4, "mechanic", Some(job), Utc::now()).unwrap(),
        )
        .unwrap();
        log.append(
            &StockTransaction::return_stock(part_id, 1, "mechanic", Some(job), Utc::now()).unwrap(),
        )
        .unwrap();

        assert_eq!(log.reconstruct_balance(part_id).unwrap(), 10 - 4 + 1);
    }

    #[test]
    fn unknown_part_reconstructs_to_zero() {
        assert_eq!(log().reconstruct_balance(PartId::new()).unwrap(), 0);
    }
}
