use std::collections::HashMap;
use std::sync::RwLock;

use partledger_core::{AlertId, JobOrderId, PartId, ReservationId};
use partledger_inventory::{LowStockAlert, Part, Reservation, StockTransaction};

use super::r#trait::{InventoryStore, StoreError};

/// In-memory inventory store.
///
/// Intended for tests/dev. Not optimized for performance. Paired writes
/// (`commit_stock_change`, `commit_reservation`) hold both collection locks
/// for the duration of the write, so readers observe both effects or
/// neither. Lock order is fixed (parts → transactions → reservations) to
/// stay deadlock-free.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    parts: RwLock<HashMap<PartId, Part>>,
    /// Per-part log in commit order.
    transactions: RwLock<HashMap<PartId, Vec<StockTransaction>>>,
    reservations: RwLock<HashMap<ReservationId, Reservation>>,
    alerts: RwLock<HashMap<AlertId, LowStockAlert>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(which: &str) -> StoreError {
    StoreError::Unavailable(format!("{which} lock poisoned"))
}

impl InventoryStore for InMemoryInventoryStore {
    fn insert_part(&self, part: &Part) -> Result<(), StoreError> {
        let mut parts = self.parts.write().map_err(|_| poisoned("parts"))?;

        if parts.contains_key(&part.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "part {} already registered",
                part.id_typed()
            )));
        }
        if parts.values().any(|p| p.part_number == part.part_number) {
            return Err(StoreError::Conflict(format!(
                "part number '{}' already registered",
                part.part_number
            )));
        }

        parts.insert(part.id_typed(), part.clone());
        Ok(())
    }

    fn load_part(&self, id: PartId) -> Result<Option<Part>, StoreError> {
        let parts = self.parts.read().map_err(|_| poisoned("parts"))?;
        Ok(parts.get(&id).cloned())
    }

    fn list_parts(&self) -> Result<Vec<Part>, StoreError> {
        let parts = self.parts.read().map_err(|_| poisoned("parts"))?;
        let mut all: Vec<Part> = parts.values().cloned().collect();
        all.sort_by(|a, b| a.part_number.cmp(&b.part_number));
        Ok(all)
    }

    fn commit_stock_change(
        &self,
        part: &Part,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError> {
        // Both locks held across the paired write: readers see both or neither.
        let mut parts = self.parts.write().map_err(|_| poisoned("parts"))?;
        let mut log = self
            .transactions
            .write()
            .map_err(|_| poisoned("transactions"))?;

        if !parts.contains_key(&part.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "part {} is not registered",
                part.id_typed()
            )));
        }

        parts.insert(part.id_typed(), part.clone());
        log.entry(transaction.part_id)
            .or_default()
            .push(transaction.clone());
        Ok(())
    }

    fn append_transaction(&self, transaction: &StockTransaction) -> Result<(), StoreError> {
        let mut log = self
            .transactions
            .write()
            .map_err(|_| poisoned("transactions"))?;
        log.entry(transaction.part_id)
            .or_default()
            .push(transaction.clone());
        Ok(())
    }

    fn transactions_for_part(&self, part_id: PartId) -> Result<Vec<StockTransaction>, StoreError> {
        let log = self
            .transactions
            .read()
            .map_err(|_| poisoned("transactions"))?;
        Ok(log.get(&part_id).cloned().unwrap_or_default())
    }

    fn commit_reservation(
        &self,
        reservation: &Reservation,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError> {
        let mut log = self
            .transactions
            .write()
            .map_err(|_| poisoned("transactions"))?;
        let mut reservations = self
            .reservations
            .write()
            .map_err(|_| poisoned("reservations"))?;

        if reservations.contains_key(&reservation.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "reservation {} already exists",
                reservation.id_typed()
            )));
        }

        log.entry(transaction.part_id)
            .or_default()
            .push(transaction.clone());
        reservations.insert(reservation.id_typed(), reservation.clone());
        Ok(())
    }

    fn commit_reservation_update(
        &self,
        reservation: &Reservation,
        part: &Part,
        transaction: &StockTransaction,
    ) -> Result<(), StoreError> {
        // All three locks held for the write, in the fixed order.
        let mut parts = self.parts.write().map_err(|_| poisoned("parts"))?;
        let mut log = self
            .transactions
            .write()
            .map_err(|_| poisoned("transactions"))?;
        let mut reservations = self
            .reservations
            .write()
            .map_err(|_| poisoned("reservations"))?;

        if !parts.contains_key(&part.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "part {} is not registered",
                part.id_typed()
            )));
        }
        if !reservations.contains_key(&reservation.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "reservation {} does not exist",
                reservation.id_typed()
            )));
        }

        parts.insert(part.id_typed(), part.clone());
        log.entry(transaction.part_id)
            .or_default()
            .push(transaction.clone());
        reservations.insert(reservation.id_typed(), reservation.clone());
        Ok(())
    }

    fn load_reservation(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError> {
        let reservations = self
            .reservations
            .read()
            .map_err(|_| poisoned("reservations"))?;
        Ok(reservations.get(&id).cloned())
    }

    fn save_reservation(&self, reservation: &Reservation) -> Result<(), StoreError> {
        let mut reservations = self
            .reservations
            .write()
            .map_err(|_| poisoned("reservations"))?;
        reservations.insert(reservation.id_typed(), reservation.clone());
        Ok(())
    }

    fn find_open_reservation(
        &self,
        part_id: PartId,
        job_order_id: JobOrderId,
    ) -> Result<Option<Reservation>, StoreError> {
        let reservations = self
            .reservations
            .read()
            .map_err(|_| poisoned("reservations"))?;
        Ok(reservations
            .values()
            .find(|r| {
                r.part_id == part_id
                    && r.job_order_id == job_order_id
                    && !r.status().is_terminal()
            })
            .cloned())
    }

    fn reservations_for_job_order(
        &self,
        job_order_id: JobOrderId,
    ) -> Result<Vec<Reservation>, StoreError> {
        let reservations = self
            .reservations
            .read()
            .map_err(|_| poisoned("reservations"))?;
        let mut matching: Vec<Reservation> = reservations
            .values()
            .filter(|r| r.job_order_id == job_order_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.created_at);
        Ok(matching)
    }

    fn load_open_alert(&self, part_id: PartId) -> Result<Option<LowStockAlert>, StoreError> {
        let alerts = self.alerts.read().map_err(|_| poisoned("alerts"))?;
        Ok(alerts
            .values()
            .find(|a| a.part_id == part_id && !a.is_acknowledged())
            .cloned())
    }

    fn load_alert(&self, id: AlertId) -> Result<Option<LowStockAlert>, StoreError> {
        let alerts = self.alerts.read().map_err(|_| poisoned("alerts"))?;
        Ok(alerts.get(&id).cloned())
    }

    fn upsert_alert(&self, alert: &LowStockAlert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().map_err(|_| poisoned("alerts"))?;
        alerts.insert(alert.id_typed(), alert.clone());
        Ok(())
    }

    fn alerts_for_part(&self, part_id: PartId) -> Result<Vec<LowStockAlert>, StoreError> {
        let alerts = self.alerts.read().map_err(|_| poisoned("alerts"))?;
        let mut matching: Vec<LowStockAlert> = alerts
            .values()
            .filter(|a| a.part_id == part_id)
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.created_at);
        Ok(matching)
    }
}
