use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partledger_core::{DomainError, DomainResult, Entity, JobOrderId, PartId, ReservationId};

/// Reservation lifecycle state.
///
/// Status is never stored independently of the quantities: it is a pure
/// function of `(reserved, consumed, cancelled)`, recomputed on every read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Hold placed, nothing consumed yet.
    Active,
    /// Partially consumed (0 < consumed < reserved).
    Partial,
    /// Fully consumed. Terminal.
    Completed,
    /// Explicitly cancelled; the unconsumed remainder of the hold is released.
    /// Terminal.
    Cancelled,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Completed | ReservationStatus::Cancelled)
    }

    /// Derive the status from the reservation's quantities and cancel flag.
    pub fn derive(reserved: i64, consumed: i64, cancelled: bool) -> Self {
        if cancelled {
            ReservationStatus::Cancelled
        } else if consumed > 0 && consumed == reserved {
            ReservationStatus::Completed
        } else if consumed > 0 {
            ReservationStatus::Partial
        } else {
            ReservationStatus::Active
        }
    }
}

/// A soft hold of part stock against a job order.
///
/// Reservations never decrement the authoritative balance at reserve time;
/// stock leaves the pool only when consumption is recorded. The hold caps how
/// much this job order may draw (`consumed <= reserved`, always).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    pub part_id: PartId,
    pub job_order_id: JobOrderId,
    quantity_reserved: i64,
    quantity_consumed: i64,
    cancelled: bool,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        id: ReservationId,
        part_id: PartId,
        job_order_id: JobOrderId,
        quantity: i64,
        requested_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(
                "reserved quantity must be positive",
            ));
        }
        let requested_by = requested_by.into();
        if requested_by.trim().is_empty() {
            return Err(DomainError::validation("requested_by cannot be empty"));
        }

        Ok(Self {
            id,
            part_id,
            job_order_id,
            quantity_reserved: quantity,
            quantity_consumed: 0,
            cancelled: false,
            requested_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> ReservationId {
        self.id
    }

    pub fn quantity_reserved(&self) -> i64 {
        self.quantity_reserved
    }

    pub fn quantity_consumed(&self) -> i64 {
        self.quantity_consumed
    }

    /// Remainder of the hold not yet consumed.
    pub fn unconsumed(&self) -> i64 {
        self.quantity_reserved - self.quantity_consumed
    }

    pub fn status(&self) -> ReservationStatus {
        ReservationStatus::derive(self.quantity_reserved, self.quantity_consumed, self.cancelled)
    }

    fn ensure_open(&self, action: &str) -> DomainResult<()> {
        let status = self.status();
        if status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} a {status:?} reservation"
            )));
        }
        Ok(())
    }

    /// Record consumption drawn against this hold.
    ///
    /// Caller is responsible for the matching ledger decrement; this method
    /// only moves the hold's bookkeeping. Returns (old, new) status.
    pub fn record_consumption(
        &mut self,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<(ReservationStatus, ReservationStatus)> {
        self.ensure_open("consume from")?;
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(
                "consumed quantity must be positive",
            ));
        }
        // Compared against the unconsumed remainder rather than summing, so
        // holds near i64::MAX cannot overflow the check.
        if quantity > self.unconsumed() {
            return Err(DomainError::OverConsumption {
                reserved: self.quantity_reserved,
                consumed: self.quantity_consumed,
                requested: quantity,
            });
        }

        let old = self.status();
        self.quantity_consumed += quantity;
        self.updated_at = now;
        Ok((old, self.status()))
    }

    /// Shrink the hold by a physically returned quantity.
    ///
    /// Distinct from cancellation: the stock goes back to the pool (ledger
    /// `Return`), and the hold no longer covers it.
    pub fn release_unused(
        &mut self,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<(ReservationStatus, ReservationStatus)> {
        self.ensure_open("return unused stock from")?;
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(
                "returned quantity must be positive",
            ));
        }
        if quantity > self.unconsumed() {
            return Err(DomainError::OverConsumption {
                reserved: self.quantity_reserved,
                consumed: self.quantity_consumed,
                requested: quantity,
            });
        }

        let old = self.status();
        self.quantity_reserved -= quantity;
        self.updated_at = now;
        Ok((old, self.status()))
    }

    /// Cancel the reservation, releasing the unconsumed remainder of the hold.
    ///
    /// Already-consumed stock is genuinely gone and is not reversed.
    pub fn cancel(
        &mut self,
        now: DateTime<Utc>,
    ) -> DomainResult<(ReservationStatus, ReservationStatus)> {
        self.ensure_open("cancel")?;

        let old = self.status();
        self.cancelled = true;
        self.updated_at = now;
        Ok((old, self.status()))
    }
}

impl Entity for Reservation {
    type Id = ReservationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
