use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partledger_core::{AlertId, DomainError, DomainResult, Entity, PartId};

/// Graded severity of a low-stock condition.
///
/// `Low` is part of the published schema for alert consumers but the ledger
/// derivation never produces it: anything at or under threshold is at least
/// `Medium`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Derive urgency from a balance and its threshold.
    ///
    /// `None` means the part is above threshold and no alert condition holds.
    /// Integer arithmetic: "half the threshold" is `threshold / 2` rounded
    /// down, so a threshold of 5 puts stock 2 in the `High` band.
    pub fn derive(current_stock: i64, min_threshold: i64) -> Option<Self> {
        if current_stock == 0 {
            Some(Urgency::Critical)
        } else if current_stock <= min_threshold / 2 {
            Some(Urgency::High)
        } else if current_stock <= min_threshold {
            Some(Urgency::Medium)
        } else {
            None
        }
    }
}

/// A low-stock alert record.
///
/// At most one unacknowledged alert exists per part; repeated threshold
/// breaches update the open record instead of spawning duplicates.
/// Acknowledged alerts are kept forever for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    id: AlertId,
    pub part_id: PartId,
    /// Balance at the most recent breach.
    pub stock_level: i64,
    /// Threshold at the most recent breach.
    pub threshold: i64,
    pub urgency: Urgency,
    pub created_at: DateTime<Utc>,
    acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl LowStockAlert {
    pub fn new(
        id: AlertId,
        part_id: PartId,
        stock_level: i64,
        threshold: i64,
        urgency: Urgency,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            part_id,
            stock_level,
            threshold,
            urgency,
            created_at: now,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    pub fn id_typed(&self) -> AlertId {
        self.id
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Refresh the open alert with a new breach snapshot.
    ///
    /// Returns `true` when the urgency escalated (consumers re-notify on
    /// escalation only, not on every balance wiggle under threshold).
    pub fn update_snapshot(&mut self, stock_level: i64, threshold: i64, urgency: Urgency) -> bool {
        let escalated = urgency > self.urgency;
        self.stock_level = stock_level;
        self.threshold = threshold;
        self.urgency = urgency;
        escalated
    }

    /// Close the alert. Fails if it was already acknowledged; the record is
    /// left untouched in that case.
    pub fn acknowledge(
        &mut self,
        actor: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.acknowledged {
            return Err(DomainError::AlreadyAcknowledged);
        }
        let actor = actor.into();
        if actor.trim().is_empty() {
            return Err(DomainError::validation("acknowledging actor cannot be empty"));
        }

        self.acknowledged = true;
        self.acknowledged_by = Some(actor);
        self.acknowledged_at = Some(now);
        Ok(())
    }
}

impl Entity for LowStockAlert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn urgency_bands_match_the_threshold_table() {
        assert_eq!(Urgency::derive(0, 5), Some(Urgency::Critical));
        assert_eq!(Urgency::derive(2, 5), Some(Urgency::High));
        assert_eq!(Urgency::derive(3, 5), Some(Urgency::Medium));
        assert_eq!(Urgency::derive(5, 5), Some(Urgency::Medium));
        assert_eq!(Urgency::derive(6, 5), None);
    }

    #[test]
    fn extreme_balances_do_not_overflow_the_derivation() {
        assert_eq!(Urgency::derive(i64::MAX, 5), None);
        assert_eq!(Urgency::derive(1, i64::MAX), Some(Urgency::High));
    }

    #[test]
    fn exact_half_threshold_is_high() {
        // threshold 10: stock 5 is exactly half.
        assert_eq!(Urgency::derive(5, 10), Some(Urgency::High));
        assert_eq!(Urgency::derive(6, 10), Some(Urgency::Medium));
    }

    #[test]
    fn snapshot_update_reports_escalation() {
        let mut alert = LowStockAlert::new(
            AlertId::new(),
            PartId::new(),
            4,
            5,
            Urgency::Medium,
            Utc::now(),
        );

        assert!(alert.update_snapshot(0, 5, Urgency::Critical));
        assert_eq!(alert.urgency, Urgency::Critical);

        // Same urgency again: no escalation.
        assert!(!alert.update_snapshot(0, 5, Urgency::Critical));
    }

    #[test]
    fn double_acknowledge_fails_and_preserves_state() {
        let mut alert = LowStockAlert::new(
            AlertId::new(),
            PartId::new(),
            1,
            5,
            Urgency::High,
            Utc::now(),
        );

        alert.acknowledge("storekeeper", Utc::now()).unwrap();
        let acked_by = alert.acknowledged_by.clone();

        let err = alert.acknowledge("someone-else", Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::AlreadyAcknowledged);
        assert_eq!(alert.acknowledged_by, acked_by);
    }

    proptest! {
        /// Property: urgency is monotone — less stock never yields a lower
        /// urgency for the same threshold.
        #[test]
        fn urgency_is_monotone_in_stock(stock in 0i64..200, threshold in 1i64..100) {
            let here = Urgency::derive(stock, threshold);
            let lower = Urgency::derive((stock - 1).max(0), threshold);

            match (here, lower) {
                (Some(h), Some(l)) => prop_assert!(l >= h),
                (Some(_), None) => prop_assert!(false, "less stock lost the alert condition"),
                _ => {}
            }
        }
    }
}
