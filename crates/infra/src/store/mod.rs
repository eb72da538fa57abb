//! Durable store boundary.
//!
//! This module defines an infrastructure-facing abstraction for persisting
//! parts, the transaction log, reservations, and alerts without making any
//! storage assumptions. Any backing store satisfying [`InventoryStore`] is
//! acceptable; the in-memory implementation serves tests/dev.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use r#trait::{InventoryStore, StoreError};
