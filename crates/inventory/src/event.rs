use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partledger_core::{AlertId, PartId, ReservationId, TransactionId};
use partledger_events::Event;

use crate::alert::Urgency;
use crate::reservation::ReservationStatus;

/// Event: a part's authoritative balance changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChanged {
    pub part_id: PartId,
    pub old_stock: i64,
    pub new_stock: i64,
    /// The log entry this change committed with.
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a reservation entered a new lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationChanged {
    pub reservation_id: ReservationId,
    pub part_id: PartId,
    /// `None` on creation.
    pub old_status: Option<ReservationStatus>,
    pub new_status: ReservationStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a low-stock alert was opened or escalated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRaised {
    pub alert_id: AlertId,
    pub part_id: PartId,
    pub urgency: Urgency,
    pub occurred_at: DateTime<Utc>,
}

/// Domain events raised synchronously after a successful commit.
///
/// Delivery/fan-out to browsers, notifiers, etc. is a collaborator's concern;
/// the core only publishes on the injected bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    StockChanged(StockChanged),
    ReservationChanged(ReservationChanged),
    AlertRaised(AlertRaised),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::StockChanged(_) => "inventory.stock.changed",
            InventoryEvent::ReservationChanged(_) => "inventory.reservation.changed",
            InventoryEvent::AlertRaised(_) => "inventory.alert.raised",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::StockChanged(e) => e.occurred_at,
            InventoryEvent::ReservationChanged(e) => e.occurred_at,
            InventoryEvent::AlertRaised(e) => e.occurred_at,
        }
    }
}
