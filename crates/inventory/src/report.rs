use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partledger_core::PartId;

use crate::part::Part;
use crate::transaction::{StockTransaction, TransactionType};

/// Half-open reporting window `[from, to)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportPeriod {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at < self.to
    }
}

/// Per-part consumption summary over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub part_id: PartId,
    pub period: ReportPeriod,
    /// Units drawn from stock (positive).
    pub quantity_consumed: i64,
    /// Units physically returned to the pool (positive).
    pub quantity_returned: i64,
    /// Units placed under soft holds (audit quantity, no balance effect).
    pub quantity_reserved: i64,
    /// Net balance movement across all entry kinds, restocks and
    /// adjustments included.
    pub net_stock_movement: i64,
    pub transaction_count: usize,
    /// `quantity_consumed × unit_cost_cents` at the part's current unit cost.
    pub consumption_cost_cents: u64,
}

impl UsageSummary {
    /// Aggregate a part's log entries over the period. Pure; the caller
    /// supplies the (already part-scoped) transaction sequence.
    pub fn from_transactions<'a>(
        part: &Part,
        period: ReportPeriod,
        transactions: impl IntoIterator<Item = &'a StockTransaction>,
    ) -> Self {
        let mut consumed = 0i64;
        let mut returned = 0i64;
        let mut reserved = 0i64;
        let mut net = 0i64;
        let mut count = 0usize;

        for tx in transactions {
            if !period.contains(tx.occurred_at) {
                continue;
            }
            count += 1;
            net += tx.stock_delta();
            match tx.kind {
                TransactionType::Consume => consumed += -tx.quantity,
                TransactionType::Return => returned += tx.quantity,
                TransactionType::Reserve => reserved += tx.quantity,
                TransactionType::Adjust | TransactionType::Restock => {}
            }
        }

        Self {
            part_id: part.id_typed(),
            period,
            quantity_consumed: consumed,
            quantity_returned: returned,
            quantity_reserved: reserved,
            net_stock_movement: net,
            transaction_count: count,
            consumption_cost_cents: (consumed.max(0) as u64).saturating_mul(part.unit_cost_cents),
        }
    }
}

/// Point-in-time valuation of a part's on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub part_id: PartId,
    pub part_number: String,
    pub quantity: i64,
    pub unit_cost_cents: u64,
    /// `quantity × unit_cost_cents`.
    pub total_value_cents: u64,
}

impl ValuationSummary {
    pub fn for_part(part: &Part) -> Self {
        let quantity = part.current_stock();
        Self {
            part_id: part.id_typed(),
            part_number: part.part_number.clone(),
            quantity,
            unit_cost_cents: part.unit_cost_cents,
            total_value_cents: (quantity.max(0) as u64).saturating_mul(part.unit_cost_cents),
        }
    }
}

/// Tagged report payload: every report kind has an explicit schema, no
/// open-ended payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Report {
    Usage(UsageSummary),
    Valuation(ValuationSummary),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::NewPart;
    use chrono::TimeDelta;
    use partledger_core::JobOrderId;

    fn test_part() -> Part {
        Part::new(
            PartId::new(),
            NewPart {
                part_number: "FLT-220".to_string(),
                description: "Hydraulic filter".to_string(),
                category: "filters".to_string(),
                initial_stock: 40,
                min_threshold: 10,
                max_capacity: 80,
                unit_cost_cents: 1250,
                supplier: "Parker".to_string(),
                location: "B-11-4".to_string(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn usage_summary_totals_by_kind_within_the_period() {
        let part = test_part();
        let id = part.id_typed();
        let now = Utc::now();
        let job = JobOrderId::new();

        let txs = vec![
            StockTransaction::restock(id, 20, "buyer", now).unwrap(),
            StockTransaction::reserve(id, 8, "planner", job, now).unwrap(),
            StockTransaction::consume(id, 6, "mechanic", Some(job), now).unwrap(),
            StockTransaction::return_stock(id, 2, "mechanic", Some(job), now).unwrap(),
            StockTransaction::adjust(id, -1, "storekeeper", "damaged", now).unwrap(),
            // Outside the window; must be ignored.
            StockTransaction::consume(id, 99, "mechanic", None, now - TimeDelta::days(30)).unwrap(),
        ];

        let period = ReportPeriod::new(now - TimeDelta::days(7), now + TimeDelta::days(1));
        let summary = UsageSummary::from_transactions(&part, period, &txs);

        assert_eq!(summary.quantity_consumed, 6);
        assert_eq!(summary.quantity_returned, 2);
        assert_eq!(summary.quantity_reserved, 8);
        assert_eq!(summary.net_stock_movement, 20 - 6 + 2 - 1);
        assert_eq!(summary.transaction_count, 5);
        assert_eq!(summary.consumption_cost_cents, 6 * 1250);
    }

    #[test]
    fn valuation_is_quantity_times_unit_cost() {
        let part = test_part();
        let valuation = ValuationSummary::for_part(&part);
        assert_eq!(valuation.quantity, 40);
        assert_eq!(valuation.total_value_cents, 40 * 1250);
    }

    #[test]
    fn report_json_carries_the_kind_tag() {
        let part = test_part();
        let report = Report::Valuation(ValuationSummary::for_part(&part));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "valuation");
        assert_eq!(json["part_number"], "FLT-220");
        assert_eq!(json["total_value_cents"], 50_000);

        let back: Report = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
