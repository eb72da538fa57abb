//! Integration tests for the full ledger + reservation + alerting pipeline.
//!
//! Tests: engine call → store commit → event bus → observable state.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};

    use partledger_core::{DomainError, JobOrderId};
    use partledger_events::{EventBus, InMemoryEventBus};
    use partledger_inventory::{
        InventoryEvent, NewPart, Report, ReportPeriod, ReservationStatus, StockStatus, Urgency,
    };

    use crate::alerts::AlertEngine;
    use crate::ledger::StockLedger;
    use crate::reporter::UsageReporter;
    use crate::reservations::ReservationManager;
    use crate::store::InMemoryInventoryStore;

    type Store = InMemoryInventoryStore;
    type Bus = InMemoryEventBus<InventoryEvent>;

    struct Rig {
        ledger: Arc<StockLedger<Store, Bus>>,
        reservations: ReservationManager<Store, Bus>,
        alerts: Arc<AlertEngine<Store, Bus>>,
        reporter: UsageReporter<Store>,
        bus: Arc<Bus>,
    }

    fn setup() -> Rig {
        let store = Arc::new(InMemoryInventoryStore::new());
        let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
        let alerts = Arc::new(AlertEngine::new(Arc::clone(&store), Arc::clone(&bus)));
        let ledger = Arc::new(StockLedger::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&alerts),
        ));
        let reservations =
            ReservationManager::new(Arc::clone(&store), Arc::clone(&bus), Arc::clone(&ledger));
        let reporter = UsageReporter::new(Arc::clone(&store));

        Rig {
            ledger,
            reservations,
            alerts,
            reporter,
            bus,
        }
    }

    fn bearing(initial_stock: i64, min_threshold: i64, max_capacity: i64) -> NewPart {
        NewPart {
            part_number: format!("BRG-{}", uuid_suffix()),
            description: "Deep groove ball bearing".to_string(),
            category: "bearings".to_string(),
            initial_stock,
            min_threshold,
            max_capacity,
            unit_cost_cents: 450,
            supplier: "SKF".to_string(),
            location: "A-03-2".to_string(),
        }
    }

    fn uuid_suffix() -> String {
        // The leading chars of a v7 uuid are timestamp bits and collide within
        // the same test; the trailing chars are random.
        let s = partledger_core::PartId::new().to_string();
        s[s.len() - 8..].to_string()
    }

    #[test]
    fn ledger_balance_always_matches_reconstruction_from_the_log() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 2, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        rig.ledger.restock(id, 30, "buyer").unwrap();
        rig.ledger.consume(id, 7, "mechanic", Some(job)).unwrap();
        rig.ledger.adjust(id, -2, "storekeeper", "damaged in bin").unwrap();
        rig.ledger.return_stock(id, 1, "mechanic", Some(job)).unwrap();
        rig.reservations.reserve(id, job, 5, "planner").unwrap();

        let log = rig.ledger.transaction_log();
        let current = rig.ledger.part(id).unwrap().current_stock();
        assert_eq!(current, 10 + 30 - 7 - 2 + 1);
        // The ledger's stored balance and the log must never disagree.
        assert_eq!(log.reconstruct_balance(id).unwrap(), current);
    }

    #[test]
    fn restock_beyond_capacity_is_rejected_not_clamped() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(90, 5, 100), "storekeeper").unwrap();

        let err = rig.ledger.restock(part.id_typed(), 20, "buyer").unwrap_err();
        assert_eq!(
            err,
            DomainError::CapacityExceeded {
                capacity: 100,
                attempted: 110
            }
        );
        assert_eq!(rig.ledger.part(part.id_typed()).unwrap().current_stock(), 90);
        // Nothing was logged for the failed call; only the opening balance
        // entry from registration exists.
        let entries = rig
            .ledger
            .transaction_log()
            .transactions_for_part(part.id_typed())
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stock_delta(), 90);
    }

    #[test]
    fn stock_status_derivation() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(4, 2, 100), "storekeeper").unwrap();
        let id = part.id_typed();

        assert_eq!(rig.ledger.stock_status(id, 3).unwrap(), StockStatus::Available);
        assert_eq!(rig.ledger.stock_status(id, 9).unwrap(), StockStatus::Partial);

        rig.ledger.consume(id, 4, "mechanic", None).unwrap();
        assert_eq!(rig.ledger.stock_status(id, 1).unwrap(), StockStatus::Backorder);
    }

    #[test]
    fn threshold_crossing_escalates_the_same_alert_without_duplicates() {
        let rig = setup();
        // currentStock=10, minThreshold=5.
        let part = rig.ledger.register_part(bearing(10, 5, 100), "storekeeper").unwrap();
        let id = part.id_typed();

        rig.ledger.consume(id, 6, "mechanic", None).unwrap();
        let open = rig.alerts.open_alert(id).unwrap().unwrap();
        assert_eq!(open.urgency, Urgency::Medium);
        assert_eq!(open.stock_level, 4);

        rig.ledger.consume(id, 4, "mechanic", None).unwrap();
        let escalated = rig.alerts.open_alert(id).unwrap().unwrap();
        assert_eq!(escalated.id_typed(), open.id_typed());
        assert_eq!(escalated.urgency, Urgency::Critical);
        assert_eq!(escalated.stock_level, 0);

        assert_eq!(rig.alerts.alerts_for_part(id).unwrap().len(), 1);
    }

    #[test]
    fn recovering_above_threshold_leaves_the_alert_open_until_acknowledged() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(6, 5, 100), "storekeeper").unwrap();
        let id = part.id_typed();

        rig.ledger.consume(id, 3, "mechanic", None).unwrap();
        let open = rig.alerts.open_alert(id).unwrap().unwrap();

        // Stock bounces back above threshold; the alert stays open.
        rig.ledger.restock(id, 40, "buyer").unwrap();
        let still_open = rig.alerts.open_alert(id).unwrap().unwrap();
        assert_eq!(still_open.id_typed(), open.id_typed());

        let acked = rig
            .alerts
            .acknowledge(open.id_typed(), "storekeeper")
            .unwrap();
        assert!(acked.is_acknowledged());
        assert!(rig.alerts.open_alert(id).unwrap().is_none());

        let err = rig
            .alerts
            .acknowledge(open.id_typed(), "storekeeper")
            .unwrap_err();
        assert_eq!(err, DomainError::AlreadyAcknowledged);
    }

    #[test]
    fn reservation_partial_then_completed() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        let reservation = rig.reservations.reserve(id, job, 5, "planner").unwrap();
        assert_eq!(reservation.status(), ReservationStatus::Active);
        // Soft hold: the balance is untouched by the reserve.
        assert_eq!(rig.ledger.part(id).unwrap().current_stock(), 10);

        let after_three = rig
            .reservations
            .consume_from_reservation(reservation.id_typed(), 3, "mechanic")
            .unwrap();
        assert_eq!(after_three.status(), ReservationStatus::Partial);
        assert_eq!(after_three.quantity_consumed(), 3);
        assert_eq!(rig.ledger.part(id).unwrap().current_stock(), 7);

        let done = rig
            .reservations
            .consume_from_reservation(reservation.id_typed(), 2, "mechanic")
            .unwrap();
        assert_eq!(done.status(), ReservationStatus::Completed);
        assert_eq!(rig.ledger.part(id).unwrap().current_stock(), 5);
    }

    #[test]
    fn reserve_with_insufficient_stock_creates_no_record() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(3, 0, 100), "storekeeper").unwrap();
        let job = JobOrderId::new();

        let err = rig
            .reservations
            .reserve(part.id_typed(), job, 5, "planner")
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 3,
                requested: 5
            }
        );
        assert!(rig
            .reservations
            .reservations_for_job_order(job)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn second_active_reservation_for_same_part_and_job_is_rejected() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(20, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        rig.reservations.reserve(id, job, 5, "planner").unwrap();
        let err = rig.reservations.reserve(id, job, 2, "planner").unwrap_err();
        assert!(matches!(err, DomainError::DuplicateActiveReservation { .. }));

        // A different job order may still hold the same part.
        rig.reservations
            .reserve(id, JobOrderId::new(), 2, "planner")
            .unwrap();
    }

    #[test]
    fn cancel_completed_reservation_is_an_invalid_transition() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let job = JobOrderId::new();

        let reservation = rig
            .reservations
            .reserve(part.id_typed(), job, 2, "planner")
            .unwrap();
        rig.reservations
            .consume_from_reservation(reservation.id_typed(), 2, "mechanic")
            .unwrap();

        let err = rig
            .reservations
            .cancel(reservation.id_typed(), "planner")
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn cancel_releases_the_hold_without_moving_stock() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        let reservation = rig.reservations.reserve(id, job, 5, "planner").unwrap();
        rig.reservations
            .consume_from_reservation(reservation.id_typed(), 2, "mechanic")
            .unwrap();

        let cancelled = rig
            .reservations
            .cancel(reservation.id_typed(), "planner")
            .unwrap();
        assert_eq!(cancelled.status(), ReservationStatus::Cancelled);
        // Consumed stock stays consumed; nothing returns to the pool.
        assert_eq!(rig.ledger.part(id).unwrap().current_stock(), 8);

        // The terminal reservation frees the (part, job) slot.
        rig.reservations.reserve(id, job, 1, "planner").unwrap();
    }

    #[test]
    fn return_unused_moves_stock_back_and_shrinks_the_hold() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        let reservation = rig.reservations.reserve(id, job, 5, "planner").unwrap();
        rig.reservations
            .consume_from_reservation(reservation.id_typed(), 2, "mechanic")
            .unwrap();
        assert_eq!(rig.ledger.part(id).unwrap().current_stock(), 8);

        let returned = rig
            .reservations
            .return_unused(reservation.id_typed(), 3, "mechanic")
            .unwrap();
        // Hold shrank to the consumed quantity: the reservation is complete.
        assert_eq!(returned.status(), ReservationStatus::Completed);
        assert_eq!(rig.ledger.part(id).unwrap().current_stock(), 11);
    }

    #[test]
    fn over_consumption_leaves_reservation_and_stock_untouched() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let job = JobOrderId::new();

        let reservation = rig
            .reservations
            .reserve(part.id_typed(), job, 3, "planner")
            .unwrap();

        let err = rig
            .reservations
            .consume_from_reservation(reservation.id_typed(), 4, "mechanic")
            .unwrap_err();
        assert!(matches!(err, DomainError::OverConsumption { .. }));

        let unchanged = rig.reservations.reservation(reservation.id_typed()).unwrap();
        assert_eq!(unchanged.quantity_consumed(), 0);
        assert_eq!(rig.ledger.part(part.id_typed()).unwrap().current_stock(), 10);
    }

    #[test]
    fn ledger_failure_during_reserved_consumption_propagates_without_side_effects() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        let reservation = rig.reservations.reserve(id, job, 8, "planner").unwrap();

        // The pool drains underneath the soft hold (documented policy:
        // reservations do not pin stock).
        rig.ledger.adjust(id, -9, "storekeeper", "cycle count").unwrap();

        let err = rig
            .reservations
            .consume_from_reservation(reservation.id_typed(), 5, "mechanic")
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 1,
                requested: 5
            }
        );

        let unchanged = rig.reservations.reservation(reservation.id_typed()).unwrap();
        assert_eq!(unchanged.quantity_consumed(), 0);
        assert_eq!(unchanged.status(), ReservationStatus::Active);
    }

    #[test]
    fn concurrent_consumers_never_oversubscribe_stock() {
        let rig = setup();
        // S = 10, Q = 3, N = 8: exactly floor(10/3) = 3 successes.
        let part = rig.ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let ledger = Arc::clone(&rig.ledger);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.consume(id, 3, "mechanic", None).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        let final_stock = rig.ledger.part(id).unwrap().current_stock();
        assert_eq!(final_stock, 10 - 3 * 3);
        assert_eq!(
            rig.ledger.transaction_log().reconstruct_balance(id).unwrap(),
            final_stock
        );
    }

    #[test]
    fn committed_mutations_publish_domain_events() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(10, 5, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        // Subscribe after registration; the opening balance publishes its
        // own StockChanged (covered separately).
        let subscription = rig.bus.subscribe();

        rig.reservations.reserve(id, job, 4, "planner").unwrap();
        rig.ledger.consume(id, 6, "mechanic", None).unwrap();

        let mut stock_changed = 0;
        let mut reservation_changed = 0;
        let mut alert_raised = 0;
        while let Ok(event) = subscription.try_recv() {
            match event {
                InventoryEvent::StockChanged(e) => {
                    stock_changed += 1;
                    assert_eq!(e.part_id, id);
                    assert_eq!(e.old_stock, 10);
                    assert_eq!(e.new_stock, 4);
                }
                InventoryEvent::ReservationChanged(e) => {
                    reservation_changed += 1;
                    assert_eq!(e.old_status, None);
                    assert_eq!(e.new_status, ReservationStatus::Active);
                }
                InventoryEvent::AlertRaised(e) => {
                    alert_raised += 1;
                    assert_eq!(e.urgency, Urgency::Medium);
                }
            }
        }
        assert_eq!(stock_changed, 1);
        assert_eq!(reservation_changed, 1);
        assert_eq!(alert_raised, 1);
    }

    #[test]
    fn registration_evaluates_the_opening_balance_for_alerts() {
        let rig = setup();
        let subscription = rig.bus.subscribe();

        // Opening balance already in the High band (2 <= 5 / 2).
        let part = rig.ledger.register_part(bearing(2, 5, 100), "storekeeper").unwrap();
        let open = rig.alerts.open_alert(part.id_typed()).unwrap().unwrap();
        assert_eq!(open.urgency, Urgency::High);
        assert_eq!(open.stock_level, 2);

        // The opening balance publishes like any other restock.
        let got_opening_event = std::iter::from_fn(|| subscription.try_recv().ok()).any(|event| {
            matches!(
                event,
                InventoryEvent::StockChanged(e)
                    if e.part_id == part.id_typed() && e.old_stock == 0 && e.new_stock == 2
            )
        });
        assert!(got_opening_event);

        // A part registered empty is critical from the start.
        let empty = rig.ledger.register_part(bearing(0, 5, 100), "storekeeper").unwrap();
        let open = rig.alerts.open_alert(empty.id_typed()).unwrap().unwrap();
        assert_eq!(open.urgency, Urgency::Critical);
        assert_eq!(open.stock_level, 0);
    }

    #[test]
    fn publish_failure_never_unwinds_or_splits_committed_state() {
        struct DeadBus;

        impl EventBus<InventoryEvent> for DeadBus {
            type Error = &'static str;

            fn publish(&self, _message: InventoryEvent) -> Result<(), Self::Error> {
                Err("bus down")
            }

            fn subscribe(&self) -> partledger_events::Subscription<InventoryEvent> {
                let (_tx, rx) = std::sync::mpsc::channel();
                partledger_events::Subscription::new(rx)
            }
        }

        let store = Arc::new(InMemoryInventoryStore::new());
        let bus = Arc::new(DeadBus);
        let alerts = Arc::new(AlertEngine::new(Arc::clone(&store), Arc::clone(&bus)));
        let ledger = Arc::new(StockLedger::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&alerts),
        ));
        let reservations =
            ReservationManager::new(Arc::clone(&store), Arc::clone(&bus), Arc::clone(&ledger));

        let part = ledger.register_part(bearing(10, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        let reservation = reservations.reserve(id, job, 5, "planner").unwrap();
        let consumed = reservations
            .consume_from_reservation(reservation.id_typed(), 3, "mechanic")
            .unwrap();

        // Ledger and hold moved together despite every publish failing.
        assert_eq!(consumed.quantity_consumed(), 3);
        assert_eq!(ledger.part(id).unwrap().current_stock(), 7);
        assert_eq!(
            reservations
                .reservation(reservation.id_typed())
                .unwrap()
                .quantity_consumed(),
            3
        );
        assert_eq!(
            ledger.transaction_log().reconstruct_balance(id).unwrap(),
            7
        );
    }

    #[test]
    fn usage_report_aggregates_the_period() {
        let rig = setup();
        let part = rig.ledger.register_part(bearing(20, 0, 100), "storekeeper").unwrap();
        let id = part.id_typed();
        let job = JobOrderId::new();

        rig.reservations.reserve(id, job, 6, "planner").unwrap();
        rig.reservations
            .consume_from_reservation(
                rig.reservations.reservations_for_job_order(job).unwrap()[0].id_typed(),
                5,
                "mechanic",
            )
            .unwrap();
        rig.ledger.return_stock(id, 1, "mechanic", Some(job)).unwrap();

        let period = ReportPeriod::new(
            Utc::now() - TimeDelta::hours(1),
            Utc::now() + TimeDelta::hours(1),
        );
        let Report::Usage(summary) = rig.reporter.summarize(id, period).unwrap() else {
            panic!("expected a usage report");
        };

        assert_eq!(summary.quantity_consumed, 5);
        assert_eq!(summary.quantity_returned, 1);
        assert_eq!(summary.quantity_reserved, 6);
        // Net includes the in-period opening restock of 20.
        assert_eq!(summary.net_stock_movement, 20 - 5 + 1);
        assert_eq!(summary.consumption_cost_cents, 5 * 450);

        let Report::Valuation(valuation) = rig.reporter.valuation(id).unwrap() else {
            panic!("expected a valuation report");
        };
        assert_eq!(valuation.quantity, 16);
        assert_eq!(valuation.total_value_cents, 16 * 450);
    }
}
