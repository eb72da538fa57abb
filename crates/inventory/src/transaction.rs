use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partledger_core::{DomainError, DomainResult, Entity, JobOrderId, PartId, TransactionId};

/// Kind of stock-affecting event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Audit record of a soft hold. Carries the reserved quantity but has
    /// zero effect on the balance (reservations do not decrement stock).
    Reserve,
    Consume,
    Return,
    Adjust,
    Restock,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Reserve => "reserve",
            TransactionType::Consume => "consume",
            TransactionType::Return => "return",
            TransactionType::Adjust => "adjust",
            TransactionType::Restock => "restock",
        }
    }
}

/// One immutable entry in the append-only transaction log.
///
/// Corrections are never edits: a wrong entry is compensated by a new
/// `Adjust` entry. The sum of [`StockTransaction::stock_delta`] over a part's
/// log equals its current balance at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    id: TransactionId,
    pub part_id: PartId,
    pub kind: TransactionType,
    /// Signed quantity recorded for this entry. For `Reserve` this is the
    /// reserved quantity; for everything else it is the balance delta.
    pub quantity: i64,
    pub job_order_id: Option<JobOrderId>,
    pub reason: Option<String>,
    pub performed_by: String,
    pub occurred_at: DateTime<Utc>,
}

impl StockTransaction {
    fn validated(
        part_id: PartId,
        kind: TransactionType,
        quantity: i64,
        job_order_id: Option<JobOrderId>,
        reason: Option<String>,
        performed_by: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let performed_by = performed_by.into();
        if performed_by.trim().is_empty() {
            return Err(DomainError::validation("performed_by cannot be empty"));
        }
        if quantity == 0 {
            return Err(DomainError::invalid_quantity(
                "transaction quantity cannot be zero",
            ));
        }

        Ok(Self {
            id: TransactionId::new(),
            part_id,
            kind,
            quantity,
            job_order_id,
            reason,
            performed_by,
            occurred_at,
        })
    }

    /// Restock entry: positive delta.
    pub fn restock(
        part_id: PartId,
        quantity: i64,
        performed_by: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::validated(
            part_id,
            TransactionType::Restock,
            quantity,
            None,
            None,
            performed_by,
            occurred_at,
        )
    }

    /// Consumption entry: recorded with a negative delta.
    pub fn consume(
        part_id: PartId,
        quantity: i64,
        performed_by: impl Into<String>,
        job_order_id: Option<JobOrderId>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::validated(
            part_id,
            TransactionType::Consume,
            -quantity,
            job_order_id,
            None,
            performed_by,
            occurred_at,
        )
    }

    /// Physical return to the pool: positive delta.
    pub fn return_stock(
        part_id: PartId,
        quantity: i64,
        performed_by: impl Into<String>,
        job_order_id: Option<JobOrderId>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::validated(
            part_id,
            TransactionType::Return,
            quantity,
            job_order_id,
            None,
            performed_by,
            occurred_at,
        )
    }

    /// Manual correction/write-off: signed delta, reason required.
    pub fn adjust(
        part_id: PartId,
        delta: i64,
        performed_by: impl Into<String>,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::validated(
            part_id,
            TransactionType::Adjust,
            delta,
            None,
            Some(reason.into()),
            performed_by,
            occurred_at,
        )
    }

    /// Soft-hold audit entry: records the reserved quantity, no balance effect.
    pub fn reserve(
        part_id: PartId,
        quantity: i64,
        performed_by: impl Into<String>,
        job_order_id: JobOrderId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::validated(
            part_id,
            TransactionType::Reserve,
            quantity,
            Some(job_order_id),
            None,
            performed_by,
            occurred_at,
        )
    }

    pub fn id_typed(&self) -> TransactionId {
        self.id
    }

    /// Effect of this entry on the part's balance.
    pub fn stock_delta(&self) -> i64 {
        match self.kind {
            TransactionType::Reserve => 0,
            _ => self.quantity,
        }
    }
}

impl Entity for StockTransaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_actor_is_rejected() {
        let err =
            StockTransaction::restock(PartId::new(), 5, "   ", Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = StockTransaction::adjust(PartId::new(), 0, "mechanic", "recount", Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
    }

    #[test]
    fn consume_records_a_negative_delta() {
        let tx =
            StockTransaction::consume(PartId::new(), 4, "mechanic", None, Utc::now()).unwrap();
        assert_eq!(tx.quantity, -4);
        assert_eq!(tx.stock_delta(), -4);
    }

    #[test]
    fn reserve_has_no_balance_effect() {
        let tx = StockTransaction::reserve(
            PartId::new(),
            6,
            "planner",
            JobOrderId::new(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(tx.quantity, 6);
        assert_eq!(tx.stock_delta(), 0);
    }
}
