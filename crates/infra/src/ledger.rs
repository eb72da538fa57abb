//! The stock ledger: single authoritative balance per part.
//!
//! Every mutation is one critical section under the part's lock:
//! validate → compute the new balance → persist part + log entry together.
//! Publishing `StockChanged` and alert re-evaluation are post-commit,
//! best-effort effects. A failed validation leaves the part and the log
//! exactly as they were.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use partledger_core::{DomainError, DomainResult, JobOrderId, PartId};
use partledger_events::EventBus;
use partledger_inventory::{
    InventoryEvent, NewPart, Part, Reservation, StockChanged, StockStatus, StockTransaction,
};

use crate::alerts::AlertEngine;
use crate::locks::{self, LockRegistry};
use crate::store::InventoryStore;
use crate::transaction_log::TransactionLog;

/// Owns current stock per part; applies deltas atomically; enforces
/// non-negativity and capacity; derives stock status.
#[derive(Debug)]
pub struct StockLedger<S, B> {
    store: Arc<S>,
    log: TransactionLog<S>,
    alerts: Arc<AlertEngine<S, B>>,
    bus: Arc<B>,
    part_locks: Arc<LockRegistry<PartId>>,
}

impl<S, B> StockLedger<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    pub fn new(store: Arc<S>, bus: Arc<B>, alerts: Arc<AlertEngine<S, B>>) -> Self {
        Self {
            log: TransactionLog::new(Arc::clone(&store)),
            store,
            alerts,
            bus,
            part_locks: Arc::new(LockRegistry::new()),
        }
    }

    /// The per-part lock registry, shared with the reservation manager so
    /// reserve-time stock checks serialize against ledger mutations.
    pub fn part_locks(&self) -> Arc<LockRegistry<PartId>> {
        Arc::clone(&self.part_locks)
    }

    /// Read view of the append-only log.
    pub fn transaction_log(&self) -> TransactionLog<S> {
        self.log.clone()
    }

    /// Register a new part in the catalog.
    ///
    /// The part record is inserted with a zero balance; a non-zero opening
    /// balance then goes through the standard restock path, so it is
    /// committed as a paired write, published as `StockChanged`, and
    /// alert-evaluated like any other mutation. A part registered empty is
    /// alert-evaluated directly (zero stock is a critical condition from the
    /// start).
    pub fn register_part(&self, mut spec: NewPart, actor: impl Into<String>) -> DomainResult<Part> {
        let now = Utc::now();

        let opening_stock = spec.initial_stock;
        spec.initial_stock = 0;
        let part = Part::new(PartId::new(), spec, now)?;
        if opening_stock < 0 || opening_stock > part.max_capacity {
            return Err(DomainError::validation(
                "initial_stock must lie within [0, max_capacity]",
            ));
        }

        self.store.insert_part(&part)?;
        info!(part = %part.id_typed(), part_number = %part.part_number, "part registered");

        if opening_stock > 0 {
            self.restock(part.id_typed(), opening_stock, actor)?;
            return self.load_required(part.id_typed());
        }

        if let Err(err) = self.alerts.on_balance_changed(&part, now) {
            warn!(part = %part.id_typed(), ?err, "alert evaluation failed");
        }
        Ok(part)
    }

    /// Receive stock from procurement. Rejects (never clamps) results above
    /// `max_capacity`: silently clamping would hide procurement errors.
    pub fn restock(
        &self,
        part_id: PartId,
        quantity: i64,
        actor: impl Into<String>,
    ) -> DomainResult<StockChanged> {
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(
                "restock quantity must be positive",
            ));
        }

        let cell = self.part_locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let mut part = self.load_required(part_id)?;
        let tx = StockTransaction::restock(part_id, quantity, actor, now)?;
        let old = part.apply_delta(quantity, now)?;

        self.commit_and_notify(&part, &tx, old)
    }

    /// Draw stock down for a job (or ad-hoc use).
    pub fn consume(
        &self,
        part_id: PartId,
        quantity: i64,
        actor: impl Into<String>,
        job_order_id: Option<JobOrderId>,
    ) -> DomainResult<StockChanged> {
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(
                "consume quantity must be positive",
            ));
        }

        let cell = self.part_locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        // Sufficiency is re-checked here, inside the critical section;
        // a pre-lock check would race with concurrent consumers.
        let mut part = self.load_required(part_id)?;
        let tx = StockTransaction::consume(part_id, quantity, actor, job_order_id, now)?;
        let old = part.apply_delta(-quantity, now)?;

        self.commit_and_notify(&part, &tx, old)
    }

    /// Manual correction/write-off, independent of reservations. The signed
    /// delta must keep the balance within `[0, max_capacity]`.
    pub fn adjust(
        &self,
        part_id: PartId,
        delta: i64,
        actor: impl Into<String>,
        reason: impl Into<String>,
    ) -> DomainResult<StockChanged> {
        if delta == 0 {
            return Err(DomainError::invalid_quantity(
                "adjustment delta cannot be zero",
            ));
        }
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DomainError::validation("adjustment reason cannot be empty"));
        }

        let cell = self.part_locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let mut part = self.load_required(part_id)?;
        let tx = StockTransaction::adjust(part_id, delta, actor, reason, now)?;
        let old = part.apply_delta(delta, now).map_err(|err| match err {
            DomainError::InsufficientStock { .. } | DomainError::CapacityExceeded { .. } => {
                DomainError::invalid_adjustment(format!(
                    "delta {delta} would leave stock outside [0, {}]",
                    part.max_capacity
                ))
            }
            other => other,
        })?;

        self.commit_and_notify(&part, &tx, old)
    }

    /// Physical return of unused stock to the pool. Returns in excess of
    /// capacity indicate a data error and are rejected, not absorbed.
    pub fn return_stock(
        &self,
        part_id: PartId,
        quantity: i64,
        actor: impl Into<String>,
        job_order_id: Option<JobOrderId>,
    ) -> DomainResult<StockChanged> {
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(
                "return quantity must be positive",
            ));
        }

        let cell = self.part_locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let mut part = self.load_required(part_id)?;
        let tx = StockTransaction::return_stock(part_id, quantity, actor, job_order_id, now)?;
        let old = part.apply_delta(quantity, now)?;

        self.commit_and_notify(&part, &tx, old)
    }

    /// Availability for a requested quantity (read-only, no mutation).
    pub fn stock_status(&self, part_id: PartId, requested: i64) -> DomainResult<StockStatus> {
        Ok(self.load_required(part_id)?.status_for(requested))
    }

    pub fn part(&self, part_id: PartId) -> DomainResult<Part> {
        self.load_required(part_id)
    }

    pub fn parts(&self) -> DomainResult<Vec<Part>> {
        Ok(self.store.list_parts()?)
    }

    /// Consume stock against a hold and persist the updated reservation in
    /// the same commit as the balance change and log entry.
    ///
    /// Called by the reservation manager with the reservation lock held;
    /// takes the part lock here. `reservation` must already carry the staged
    /// consumption.
    pub(crate) fn consume_for_reservation(
        &self,
        reservation: &Reservation,
        quantity: i64,
        actor: impl Into<String>,
    ) -> DomainResult<StockChanged> {
        let part_id = reservation.part_id;
        let cell = self.part_locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let mut part = self.load_required(part_id)?;
        let tx = StockTransaction::consume(
            part_id,
            quantity,
            actor,
            Some(reservation.job_order_id),
            now,
        )?;
        let old = part.apply_delta(-quantity, now)?;

        self.store
            .commit_reservation_update(reservation, &part, &tx)?;
        Ok(self.notify(&part, &tx, old))
    }

    /// Return physically unused held stock to the pool, persisting the
    /// shrunken reservation in the same commit.
    pub(crate) fn return_for_reservation(
        &self,
        reservation: &Reservation,
        quantity: i64,
        actor: impl Into<String>,
    ) -> DomainResult<StockChanged> {
        let part_id = reservation.part_id;
        let cell = self.part_locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let mut part = self.load_required(part_id)?;
        let tx = StockTransaction::return_stock(
            part_id,
            quantity,
            actor,
            Some(reservation.job_order_id),
            now,
        )?;
        let old = part.apply_delta(quantity, now)?;

        self.store
            .commit_reservation_update(reservation, &part, &tx)?;
        Ok(self.notify(&part, &tx, old))
    }

    fn load_required(&self, part_id: PartId) -> DomainResult<Part> {
        self.store.load_part(part_id)?.ok_or(DomainError::NotFound)
    }

    /// Persist the paired (part, log entry) write, then run the post-commit
    /// effects.
    fn commit_and_notify(
        &self,
        part: &Part,
        tx: &StockTransaction,
        old_stock: i64,
    ) -> DomainResult<StockChanged> {
        self.store.commit_stock_change(part, tx)?;
        Ok(self.notify(part, tx, old_stock))
    }

    /// Post-commit effects: log, publish, re-evaluate alerts.
    ///
    /// Best-effort: the commit already succeeded and is never unwound, so a
    /// failure here is logged rather than surfaced — returning an error after
    /// the commit would invite a retry that double-applies the mutation.
    /// Consumers rebuild missed events from the transaction log.
    fn notify(&self, part: &Part, tx: &StockTransaction, old_stock: i64) -> StockChanged {
        let event = StockChanged {
            part_id: part.id_typed(),
            old_stock,
            new_stock: part.current_stock(),
            transaction_id: tx.id_typed(),
            occurred_at: tx.occurred_at,
        };

        info!(
            part = %part.id_typed(),
            kind = tx.kind.as_str(),
            old_stock,
            new_stock = part.current_stock(),
            "stock committed"
        );

        if let Err(err) = self
            .bus
            .publish(InventoryEvent::StockChanged(event.clone()))
        {
            warn!(part = %part.id_typed(), ?err, "stock event publish failed");
        }
        if let Err(err) = self.alerts.on_balance_changed(part, tx.occurred_at) {
            warn!(part = %part.id_typed(), ?err, "alert evaluation failed");
        }

        event
    }
}
