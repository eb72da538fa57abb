use std::sync::Arc;

use thiserror::Error;

use partledger_core::{AlertId, DomainError, JobOrderId, PartId, ReservationId};
use partledger_inventory::{LowStockAlert, Part, Reservation, StockTransaction};

/// Store operation error.
///
/// Infrastructure failures only; business validation happens upstream in the
/// engines before anything reaches the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. duplicate part id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed or is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => DomainError::validation(msg),
            StoreError::Unavailable(msg) => DomainError::storage(msg),
        }
    }
}

/// Capability interface over the durable store.
///
/// The engines treat this as the persistence boundary: each method is an
/// atomic operation from the caller's perspective. `commit_stock_change` and
/// `commit_reservation` pair an entity write with a transaction append —
/// implementations must persist both or neither (one SQL transaction in a
/// relational store; one write-lock scope in memory).
///
/// Reads reflect all previously returned writes immediately (no buffering,
/// no eventual consistency).
pub trait InventoryStore: Send + Sync {
    // -- parts -------------------------------------------------------------

    /// Insert a new part. Fails with `Conflict` if the id or part number is
    /// already registered.
    fn insert_part(&self, part: &Part) -> Result<(), StoreError>;

    fn load_part(&self, id: PartId) -> Result<Option<Part>, StoreError>;

    fn list_parts(&self) -> Result<Vec<Part>, StoreError>;

    /// Persist a part's new balance together with the log entry that caused
    /// it. Atomic: both or neither.
    fn commit_stock_change(
        &self,
        part: &Part,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError>;

    // -- transaction log ---------------------------------------------------

    /// Append a log entry with no paired balance change (Reserve audit
    /// entries).
    fn append_transaction(&self, transaction: &StockTransaction) -> Result<(), StoreError>;

    /// All entries for a part in commit order.
    fn transactions_for_part(&self, part_id: PartId) -> Result<Vec<StockTransaction>, StoreError>;

    // -- reservations ------------------------------------------------------

    /// Insert a new reservation together with its Reserve audit entry.
    /// Atomic: both or neither.
    fn commit_reservation(
        &self,
        reservation: &Reservation,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError>;

    /// Persist an updated reservation, the part's new balance, and the log
    /// entry in one atomic write. Used when consumption or a return moves
    /// stock against a hold: all three or none, so the ledger and the hold
    /// can never disagree.
    fn commit_reservation_update(
        &self,
        reservation: &Reservation,
        part: &Part,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError>;

    fn load_reservation(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError>;

    fn save_reservation(&self, reservation: &Reservation) -> Result<(), StoreError>;

    /// The non-terminal reservation for (part, job order), if one exists.
    fn find_open_reservation(
        &self,
        part_id: PartId,
        job_order_id: JobOrderId,
    ) -> Result<Option<Reservation>, StoreError>;

    fn reservations_for_job_order(
        &self,
        job_order_id: JobOrderId,
    ) -> Result<Vec<Reservation>, StoreError>;

    // -- alerts ------------------------------------------------------------

    /// The unacknowledged alert for a part, if one is open.
    fn load_open_alert(&self, part_id: PartId) -> Result<Option<LowStockAlert>, StoreError>;

    fn load_alert(&self, id: AlertId) -> Result<Option<LowStockAlert>, StoreError>;

    /// Insert or replace an alert record by id.
    fn upsert_alert(&self, alert: &LowStockAlert) -> Result<(), StoreError>;

    /// Full alert history for a part, acknowledged records included.
    fn alerts_for_part(&self, part_id: PartId) -> Result<Vec<LowStockAlert>, StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn insert_part(&self, part: &Part) -> Result<(), StoreError> {
        (**self).insert_part(part)
    }

    fn load_part(&self, id: PartId) -> Result<Option<Part>, StoreError> {
        (**self).load_part(id)
    }

    fn list_parts(&self) -> Result<Vec<Part>, StoreError> {
        (**self).list_parts()
    }

    fn commit_stock_change(
        &self,
        part: &Part,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError> {
        (**self).commit_stock_change(part, transaction)
    }

    fn append_transaction(&self, transaction: &StockTransaction) -> Result<(), StoreError> {
        (**self).append_transaction(transaction)
    }

    fn transactions_for_part(&self, part_id: PartId) -> Result<Vec<StockTransaction>, StoreError> {
        (**self).transactions_for_part(part_id)
    }

    fn commit_reservation(
        &self,
        reservation: &Reservation,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError> {
        (**self).commit_reservation(reservation, transaction)
    }

    fn commit_reservation_update(
        &self,
        reservation: &Reservation,
        part: &Part,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError> {
        (**self).commit_reservation_update(reservation, part, transaction)
    }

    fn load_reservation(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError> {
        (**self).load_reservation(id)
    }

    fn save_reservation(&self, reservation: &Reservation) -> Result<(), StoreError> {
        (**self).save_reservation(reservation)
    }

    fn find_open_reservation(
        &self,
        part_id: PartId,
        job_order_id: JobOrderId,
    ) -> Result<Option<Reservation>, StoreError> {
        (**self).find_open_reservation(part_id, job_order_id)
    }

    fn reservations_for_job_order(
        &self,
        job_order_id: JobOrderId,
    ) -> Result<Vec<Reservation>, StoreError> {
        (**self).reservations_for_job_order(job_order_id)
    }

    fn load_open_alert(&self, part_id: PartId) -> Result<Option<LowStockAlert>, StoreError> {
        (**self).load_open_alert(part_id)
    }

    fn load_alert(&self, id: AlertId) -> Result<Option<LowStockAlert>, StoreError> {
        (**self).load_alert(id)
    }

    fn upsert_alert(&self, alert: &LowStockAlert) -> Result<(), StoreError> {
        (**self).upsert_alert(alert)
    }

    fn alerts_for_part(&self, part_id: PartId) -> Result<Vec<LowStockAlert>, StoreError> {
        (**self).alerts_for_part(part_id)
    }
}
