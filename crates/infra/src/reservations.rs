//! Reservation lifecycle engine.
//!
//! Reservations are soft holds: placing one never decrements the ledger's
//! balance — stock leaves the pool at consumption time. Concurrently racing
//! reservations may therefore jointly over-promise a shared pool; that is
//! the documented policy, not a bug. What the engine does guarantee is that
//! no single reservation ever consumes more than it reserved.
//!
//! Lock order is fixed: reservation lock first, then (inside the ledger
//! delegate) the part lock. Reserve itself takes only the part lock, shared
//! with the ledger, so duplicate checks and reserve-time stock reads
//! serialize against stock mutations.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use partledger_core::{DomainError, DomainResult, JobOrderId, PartId, ReservationId};
use partledger_events::EventBus;
use partledger_inventory::{
    InventoryEvent, Reservation, ReservationChanged, ReservationStatus, StockTransaction,
};

use crate::ledger::StockLedger;
use crate::locks::{self, LockRegistry};
use crate::store::InventoryStore;

/// Owns the reservation lifecycle per job order; allocates/consumes/releases
/// stock against the ledger; tracks partial fulfillment.
#[derive(Debug)]
pub struct ReservationManager<S, B> {
    store: Arc<S>,
    ledger: Arc<StockLedger<S, B>>,
    bus: Arc<B>,
    reservation_locks: LockRegistry<ReservationId>,
    part_locks: Arc<LockRegistry<PartId>>,
}

impl<S, B> ReservationManager<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    pub fn new(store: Arc<S>, bus: Arc<B>, ledger: Arc<StockLedger<S, B>>) -> Self {
        Self {
            store,
            part_locks: ledger.part_locks(),
            ledger,
            bus,
            reservation_locks: LockRegistry::new(),
        }
    }

    /// Place a soft hold for a job order.
    ///
    /// Requires available stock at reservation time and no existing
    /// non-terminal reservation for the same (part, job order). On failure
    /// no reservation record is created.
    pub fn reserve(
        &self,
        part_id: PartId,
        job_order_id: JobOrderId,
        quantity: i64,
        requested_by: impl Into<String>,
    ) -> DomainResult<Reservation> {
        let cell = self.part_locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let part = self.ledger.part(part_id)?;

        let reservation = Reservation::new(
            ReservationId::new(),
            part_id,
            job_order_id,
            quantity,
            requested_by,
            now,
        )?;

        if self
            .store
            .find_open_reservation(part_id, job_order_id)?
            .is_some()
        {
            return Err(DomainError::DuplicateActiveReservation {
                part_id,
                job_order_id,
            });
        }

        // Soft hold: check, but do not decrement, the authoritative balance.
        if part.current_stock() < quantity {
            return Err(DomainError::InsufficientStock {
                available: part.current_stock(),
                requested: quantity,
            });
        }

        let tx = StockTransaction::reserve(
            part_id,
            quantity,
            reservation.requested_by.clone(),
            job_order_id,
            now,
        )?;
        self.store.commit_reservation(&reservation, &tx)?;

        info!(
            reservation = %reservation.id_typed(),
            part = %part_id,
            job_order = %job_order_id,
            quantity,
            "reservation placed"
        );
        self.publish_changed(&reservation, None);
        Ok(reservation)
    }

    /// Consume stock against a hold.
    ///
    /// Validates the hold first (state, quantity, over-consumption), then
    /// delegates the physical decrement to the ledger. A ledger failure —
    /// e.g. `InsufficientStock` — leaves the reservation unchanged.
    pub fn consume_from_reservation(
        &self,
        reservation_id: ReservationId,
        quantity: i64,
        actor: impl Into<String>,
    ) -> DomainResult<Reservation> {
        let cell = self.reservation_locks.cell(reservation_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let current = self.load_required(reservation_id)?;
        let mut staged = current.clone();
        let (old_status, _) = staged.record_consumption(quantity, now)?;

        // One commit covers the balance decrement, the log entry, and the
        // updated hold; the ledger takes the part lock internally. On any
        // failure the stored reservation is untouched.
        self.ledger
            .consume_for_reservation(&staged, quantity, actor)?;

        info!(
            reservation = %reservation_id,
            quantity,
            consumed = staged.quantity_consumed(),
            reserved = staged.quantity_reserved(),
            "reservation consumption recorded"
        );
        self.publish_changed(&staged, Some(old_status));
        Ok(staged)
    }

    /// Cancel a hold, releasing its unconsumed remainder.
    ///
    /// No physical stock movement: already-consumed stock is genuinely gone
    /// and stays consumed. Allowed from Active/Partial only.
    pub fn cancel(
        &self,
        reservation_id: ReservationId,
        actor: impl Into<String>,
    ) -> DomainResult<Reservation> {
        let actor = actor.into();
        let cell = self.reservation_locks.cell(reservation_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let mut reservation = self.load_required(reservation_id)?;
        let (old_status, _) = reservation.cancel(now)?;
        self.store.save_reservation(&reservation)?;

        info!(reservation = %reservation_id, actor = %actor, "reservation cancelled");
        self.publish_changed(&reservation, Some(old_status));
        Ok(reservation)
    }

    /// Physically return unused held stock to the pool.
    ///
    /// Distinct from cancellation: the quantity goes back through the ledger
    /// as a Return and the hold shrinks by the same amount.
    pub fn return_unused(
        &self,
        reservation_id: ReservationId,
        quantity: i64,
        actor: impl Into<String>,
    ) -> DomainResult<Reservation> {
        let cell = self.reservation_locks.cell(reservation_id)?;
        let _guard = locks::enter(&cell)?;
        let now = Utc::now();

        let current = self.load_required(reservation_id)?;
        let mut staged = current.clone();
        let (old_status, _) = staged.release_unused(quantity, now)?;

        // Same paired commit as consumption: stock movement and the shrunken
        // hold persist together.
        self.ledger
            .return_for_reservation(&staged, quantity, actor)?;

        info!(
            reservation = %reservation_id,
            quantity,
            "unused reserved stock returned"
        );
        self.publish_changed(&staged, Some(old_status));
        Ok(staged)
    }

    pub fn reservation(&self, reservation_id: ReservationId) -> DomainResult<Reservation> {
        self.load_required(reservation_id)
    }

    /// All reservations held by a job order (one per part at most for the
    /// non-terminal ones).
    pub fn reservations_for_job_order(
        &self,
        job_order_id: JobOrderId,
    ) -> DomainResult<Vec<Reservation>> {
        Ok(self.store.reservations_for_job_order(job_order_id)?)
    }

    fn load_required(&self, reservation_id: ReservationId) -> DomainResult<Reservation> {
        self.store
            .load_reservation(reservation_id)?
            .ok_or(DomainError::NotFound)
    }

    /// Best-effort post-commit publish; a bus failure is logged, never
    /// surfaced (the committed state stands either way).
    fn publish_changed(&self, reservation: &Reservation, old_status: Option<ReservationStatus>) {
        let result = self
            .bus
            .publish(InventoryEvent::ReservationChanged(ReservationChanged {
                reservation_id: reservation.id_typed(),
                part_id: reservation.part_id,
                old_status,
                new_status: reservation.status(),
                occurred_at: reservation.updated_at,
            }));
        if let Err(err) = result {
            warn!(reservation = %reservation.id_typed(), ?err, "reservation event publish failed");
        }
    }
}
