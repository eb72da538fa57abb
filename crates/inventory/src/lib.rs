//! `partledger-inventory` — pure domain model for the parts stock ledger.
//!
//! Entities, the reservation state machine, stock-status and urgency
//! derivations, and the typed domain events. No IO: every rule here is a
//! deterministic function over values, exercised by the engines in
//! `partledger-infra`.

pub mod alert;
pub mod event;
pub mod part;
pub mod report;
pub mod reservation;
pub mod transaction;

pub use alert::{LowStockAlert, Urgency};
pub use event::{AlertRaised, InventoryEvent, ReservationChanged, StockChanged};
pub use part::{NewPart, Part, StockStatus};
pub use report::{Report, ReportPeriod, UsageSummary, ValuationSummary};
pub use reservation::{Reservation, ReservationStatus};
pub use transaction::{StockTransaction, TransactionType};
