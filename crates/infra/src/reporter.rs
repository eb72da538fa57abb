//! Read-only usage/valuation reporting over the transaction log.

use std::sync::Arc;

use partledger_core::{DomainError, DomainResult, PartId};
use partledger_inventory::{Report, ReportPeriod, UsageSummary, ValuationSummary};

use crate::store::InventoryStore;
use crate::transaction_log::TransactionLog;

/// Purely derived summaries; no state of its own.
#[derive(Debug)]
pub struct UsageReporter<S> {
    store: Arc<S>,
    log: TransactionLog<S>,
}

impl<S: InventoryStore> UsageReporter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            log: TransactionLog::new(Arc::clone(&store)),
            store,
        }
    }

    /// Per-part consumption summary over a period.
    pub fn summarize(&self, part_id: PartId, period: ReportPeriod) -> DomainResult<Report> {
        let part = self
            .store
            .load_part(part_id)?
            .ok_or(DomainError::NotFound)?;
        let transactions = self.log.transactions_for_part(part_id)?;
        Ok(Report::Usage(UsageSummary::from_transactions(
            &part,
            period,
            &transactions,
        )))
    }

    /// Point-in-time valuation of a part's on-hand stock.
    pub fn valuation(&self, part_id: PartId) -> DomainResult<Report> {
        let part = self
            .store
            .load_part(part_id)?
            .ok_or(DomainError::NotFound)?;
        Ok(Report::Valuation(ValuationSummary::for_part(&part)))
    }
}
