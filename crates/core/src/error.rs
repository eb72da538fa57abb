//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// stock invariants, lifecycle violations). These are rule violations, not
/// transient faults: retrying an unchanged call yields the same outcome.
/// `StorageUnavailable` is the one exception — it originates from the durable
/// store collaborator and is the only class eligible for caller-driven retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty actor, malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A quantity was zero or non-positive where a positive value is required.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A stock decrement exceeded the available balance.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { available: i64, requested: i64 },

    /// A stock increment would exceed the part's maximum capacity.
    #[error("capacity exceeded: attempted {attempted}, capacity {capacity}")]
    CapacityExceeded { capacity: i64, attempted: i64 },

    /// An adjustment would leave stock outside `[0, max_capacity]`.
    #[error("invalid adjustment: {0}")]
    InvalidAdjustment(String),

    /// A reservation consumption exceeded the reserved quantity.
    #[error("over-consumption: reserved {reserved}, consumed {consumed}, requested {requested}")]
    OverConsumption {
        reserved: i64,
        consumed: i64,
        requested: i64,
    },

    /// A reservation state-machine transition was not permitted.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A non-terminal reservation already exists for this (part, job order).
    #[error("duplicate active reservation for part {part_id} on job order {job_order_id}")]
    DuplicateActiveReservation {
        part_id: crate::id::PartId,
        job_order_id: crate::id::JobOrderId,
    },

    /// The alert was already acknowledged.
    #[error("alert already acknowledged")]
    AlreadyAcknowledged,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// The durable store collaborator failed (the only retryable class).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn invalid_adjustment(msg: impl Into<String>) -> Self {
        Self::InvalidAdjustment(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True for failures worth retrying at the caller (collaborator faults);
    /// false for deterministic rule violations.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
