//! Low-stock alerting over ledger balance changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use partledger_core::{AlertId, DomainError, DomainResult, PartId};
use partledger_events::EventBus;
use partledger_inventory::{AlertRaised, InventoryEvent, LowStockAlert, Part, Urgency};

use crate::locks::{self, LockRegistry};
use crate::store::InventoryStore;

/// Translates ledger balance changes into [`LowStockAlert`] records.
///
/// Deduplication invariant: at most one unacknowledged alert per part. A
/// repeat breach refreshes the open record's urgency/stock snapshot instead
/// of spawning a duplicate; `AlertRaised` is published only on creation and
/// on escalation. Crossing back above threshold never auto-closes an alert —
/// the closing action is a human acknowledgement (reorder confirmed, stock
/// counted), not a transient stock bump.
#[derive(Debug)]
pub struct AlertEngine<S, B> {
    store: Arc<S>,
    bus: Arc<B>,
    /// Own per-part registry, deliberately distinct from the ledger's: the
    /// ledger calls in here while holding its part lock.
    locks: LockRegistry<PartId>,
}

impl<S, B> AlertEngine<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    pub fn new(store: Arc<S>, bus: Arc<B>) -> Self {
        Self {
            store,
            bus,
            locks: LockRegistry::new(),
        }
    }

    /// Idempotent upsert of the part's open alert for a new balance.
    ///
    /// Returns the open alert after the update, or `None` when the part is
    /// above threshold (any previously open alert is left open).
    pub fn on_balance_changed(
        &self,
        part: &Part,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<LowStockAlert>> {
        let part_id = part.id_typed();
        let stock = part.current_stock();
        let threshold = part.min_threshold;

        let Some(urgency) = Urgency::derive(stock, threshold) else {
            return Ok(self.store.load_open_alert(part_id)?);
        };

        let cell = self.locks.cell(part_id)?;
        let _guard = locks::enter(&cell)?;

        // Re-read inside the critical section: an acknowledge may have
        // closed the alert between derivation and here.
        match self.store.load_open_alert(part_id)? {
            Some(mut alert) => {
                let escalated = alert.update_snapshot(stock, threshold, urgency);
                self.store.upsert_alert(&alert)?;
                if escalated {
                    info!(part = %part_id, ?urgency, stock, "low-stock alert escalated");
                    self.publish_raised(&alert, now);
                }
                Ok(Some(alert))
            }
            None => {
                let alert =
                    LowStockAlert::new(AlertId::new(), part_id, stock, threshold, urgency, now);
                self.store.upsert_alert(&alert)?;
                info!(part = %part_id, ?urgency, stock, "low-stock alert opened");
                self.publish_raised(&alert, now);
                Ok(Some(alert))
            }
        }
    }

    /// Close an alert. Fails with `AlreadyAcknowledged` if it is not open;
    /// the record is unchanged in that case.
    pub fn acknowledge(
        &self,
        alert_id: AlertId,
        actor: impl Into<String>,
    ) -> DomainResult<LowStockAlert> {
        let actor = actor.into();
        let now = Utc::now();

        let preview = self
            .store
            .load_alert(alert_id)?
            .ok_or(DomainError::NotFound)?;

        let cell = self.locks.cell(preview.part_id)?;
        let _guard = locks::enter(&cell)?;

        // Reload under the part's alert lock; the first read may be stale.
        let mut alert = self
            .store
            .load_alert(alert_id)?
            .ok_or(DomainError::NotFound)?;
        alert.acknowledge(actor, now)?;
        self.store.upsert_alert(&alert)?;

        info!(alert = %alert_id, part = %alert.part_id, "alert acknowledged");
        Ok(alert)
    }

    /// The unacknowledged alert for a part, if one is open.
    pub fn open_alert(&self, part_id: PartId) -> DomainResult<Option<LowStockAlert>> {
        Ok(self.store.load_open_alert(part_id)?)
    }

    /// Full alert history for a part, acknowledged records included.
    pub fn alerts_for_part(&self, part_id: PartId) -> DomainResult<Vec<LowStockAlert>> {
        Ok(self.store.alerts_for_part(part_id)?)
    }

    /// Best-effort post-commit publish; the upserted alert record stands
    /// whether or not the bus accepted the event.
    fn publish_raised(&self, alert: &LowStockAlert, now: DateTime<Utc>) {
        let result = self.bus.publish(InventoryEvent::AlertRaised(AlertRaised {
            alert_id: alert.id_typed(),
            part_id: alert.part_id,
            urgency: alert.urgency,
            occurred_at: now,
        }));
        if let Err(err) = result {
            warn!(alert = %alert.id_typed(), ?err, "alert event publish failed");
        }
    }
}
