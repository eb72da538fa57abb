//! Infrastructure layer: storage contracts, per-entity locking, and the
//! engines that compose them.
//!
//! The domain crates stay pure; everything that touches a store, a lock, or
//! the event bus lives here. Engines are `Send + Sync` and safe under
//! concurrent callers from independent threads.

pub mod alerts;
pub mod ledger;
pub mod locks;
pub mod reporter;
pub mod reservations;
pub mod store;
pub mod transaction_log;

mod integration_tests;

pub use alerts::AlertEngine;
pub use ledger::StockLedger;
pub use locks::LockRegistry;
pub use reporter::UsageReporter;
pub use reservations::ReservationManager;
pub use store::{InMemoryInventoryStore, InventoryStore, StoreError};
pub use transaction_log::TransactionLog;
