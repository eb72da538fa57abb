use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partledger_core::{DomainError, DomainResult, Entity, PartId};

/// Availability of a part for a requested quantity (pure derivation, no mutation).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// The full requested quantity can be served from stock.
    Available,
    /// Some stock is on hand, but less than requested.
    Partial,
    /// Nothing on hand.
    Backorder,
}

impl StockStatus {
    /// Derive availability from the current balance and a requested quantity.
    pub fn derive(current_stock: i64, requested: i64) -> Self {
        if current_stock == 0 {
            StockStatus::Backorder
        } else if requested <= current_stock {
            StockStatus::Available
        } else {
            StockStatus::Partial
        }
    }
}

/// Catalog + threshold attributes for registering a new part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPart {
    pub part_number: String,
    pub description: String,
    pub category: String,
    pub initial_stock: i64,
    pub min_threshold: i64,
    pub max_capacity: i64,
    /// Cost per unit in the smallest currency unit (e.g. cents).
    pub unit_cost_cents: u64,
    pub supplier: String,
    pub location: String,
}

/// A physical part tracked by the ledger.
///
/// `current_stock` is private: it changes only through [`Part::apply_delta`],
/// which the stock ledger calls inside the part's critical section. Everything
/// else is catalog data and may be read freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    id: PartId,
    pub part_number: String,
    pub description: String,
    pub category: String,
    current_stock: i64,
    pub min_threshold: i64,
    pub max_capacity: i64,
    /// Cost per unit in the smallest currency unit (e.g. cents).
    pub unit_cost_cents: u64,
    pub supplier: String,
    pub location: String,
    pub updated_at: DateTime<Utc>,
}

impl Part {
    /// Validate and construct a part record.
    pub fn new(id: PartId, spec: NewPart, now: DateTime<Utc>) -> DomainResult<Self> {
        if spec.part_number.trim().is_empty() {
            return Err(DomainError::validation("part_number cannot be empty"));
        }
        if spec.max_capacity <= 0 {
            return Err(DomainError::validation("max_capacity must be positive"));
        }
        if spec.min_threshold < 0 || spec.min_threshold > spec.max_capacity {
            return Err(DomainError::validation(
                "min_threshold must lie within [0, max_capacity]",
            ));
        }
        if spec.initial_stock < 0 || spec.initial_stock > spec.max_capacity {
            return Err(DomainError::validation(
                "initial_stock must lie within [0, max_capacity]",
            ));
        }

        Ok(Self {
            id,
            part_number: spec.part_number,
            description: spec.description,
            category: spec.category,
            current_stock: spec.initial_stock,
            min_threshold: spec.min_threshold,
            max_capacity: spec.max_capacity,
            unit_cost_cents: spec.unit_cost_cents,
            supplier: spec.supplier,
            location: spec.location,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> PartId {
        self.id
    }

    pub fn current_stock(&self) -> i64 {
        self.current_stock
    }

    /// Availability for a requested quantity.
    pub fn status_for(&self, requested: i64) -> StockStatus {
        StockStatus::derive(self.current_stock, requested)
    }

    /// Apply a signed stock delta, enforcing `0 <= stock <= max_capacity`.
    ///
    /// Returns the previous balance. Callers must hold the part's lock; the
    /// bounds are re-checked here so a raced caller still cannot break them.
    /// Saturating arithmetic: a delta past `i64::MAX` lands on the capacity
    /// check instead of overflowing.
    pub fn apply_delta(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<i64> {
        let next = self.current_stock.saturating_add(delta);
        if next < 0 {
            return Err(DomainError::InsufficientStock {
                available: self.current_stock,
                requested: delta.saturating_neg(),
            });
        }
        if next > self.max_capacity {
            return Err(DomainError::CapacityExceeded {
                capacity: self.max_capacity,
                attempted: next,
            });
        }

        let old = self.current_stock;
        self.current_stock = next;
        self.updated_at = now;
        Ok(old)
    }
}

impl Entity for Part {
    type Id = PartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
