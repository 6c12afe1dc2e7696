//! Bill lifecycle: create, edit, read, list and delete, always for one owner.

use crate::models::{Bill, LineItem, ListBillsFilter};
use crate::services::ledger::{self, Settlement};
use crate::services::metrics;
use crate::services::numbering::SequenceAllocator;
use crate::services::store::BillStore;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;

/// Validated bill contents as entered on the form. Items are already priced
/// and stripped of empty rows.
#[derive(Debug, Clone)]
pub struct BillDraft {
    pub customer_name: String,
    pub customer_address: String,
    pub bill_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub advance_payment: Decimal,
}

#[derive(Clone)]
pub struct BillService {
    bills: Arc<dyn BillStore>,
    allocator: Arc<SequenceAllocator>,
}

fn apply(bill: &mut Bill, settlement: Settlement) {
    bill.subtotal = settlement.subtotal;
    bill.advance_payment = settlement.advance_payment;
    bill.additional_payment = settlement.additional_payment;
    bill.total_paid = settlement.total_paid;
    bill.remaining_amount = settlement.remaining_amount;
}

fn not_found(bill_id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Bill {} not found", bill_id))
}

impl BillService {
    pub fn new(bills: Arc<dyn BillStore>, allocator: Arc<SequenceAllocator>) -> Self {
        Self { bills, allocator }
    }

    pub fn allocator(&self) -> &SequenceAllocator {
        &self.allocator
    }

    #[tracing::instrument(skip(self, draft), fields(items = draft.items.len()))]
    pub async fn create(&self, owner_id: &str, draft: BillDraft) -> Result<Bill, AppError> {
        let items = ledger::retain_billable(draft.items);
        let settlement = ledger::settle(&items, draft.advance_payment, Decimal::ZERO, Decimal::ZERO);
        let bill_number = self.allocator.allocate_next(owner_id).await;
        let now = Utc::now();

        let mut bill = Bill {
            id: None,
            bill_id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            bill_number: bill_number.into_string(),
            customer_name: draft.customer_name,
            customer_address: draft.customer_address,
            bill_date: draft.bill_date,
            items,
            subtotal: Decimal::ZERO,
            advance_payment: Decimal::ZERO,
            additional_payment: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            created_utc: now,
            updated_utc: now,
        };
        apply(&mut bill, settlement);

        if let Err(e) = self.bills.insert(&bill).await {
            metrics::record_bill_operation("create", "error");
            return Err(e);
        }

        metrics::record_bill_operation("create", "success");
        tracing::info!(bill_id = %bill.bill_id, bill_number = %bill.bill_number, "Bill created");
        Ok(bill)
    }

    /// Replace a bill's contents and fold `new_payment` into its accumulated
    /// additional payment. The bill number never changes. Returns the updated
    /// bill and the payment actually applied.
    #[tracing::instrument(skip(self, draft))]
    pub async fn update(
        &self,
        owner_id: &str,
        bill_id: &str,
        draft: BillDraft,
        new_payment: Decimal,
    ) -> Result<(Bill, Decimal), AppError> {
        let mut bill = self
            .bills
            .find(owner_id, bill_id)
            .await?
            .ok_or_else(|| not_found(bill_id))?;

        let items = ledger::retain_billable(draft.items);
        let settlement = ledger::settle(
            &items,
            draft.advance_payment,
            bill.additional_payment,
            new_payment,
        );
        let applied = settlement.additional_payment - ledger::money(bill.additional_payment);

        bill.customer_name = draft.customer_name;
        bill.customer_address = draft.customer_address;
        bill.bill_date = draft.bill_date;
        bill.items = items;
        bill.updated_utc = Utc::now();
        apply(&mut bill, settlement);

        // A concurrent delete between the read and the write surfaces as 404.
        if !self.bills.replace(&bill).await? {
            metrics::record_bill_operation("update", "not_found");
            return Err(not_found(bill_id));
        }

        metrics::record_bill_operation("update", "success");
        tracing::info!(
            bill_number = %bill.bill_number,
            new_payment = %applied,
            remaining = %bill.remaining_amount,
            "Bill updated"
        );
        Ok((bill, applied))
    }

    pub async fn get(&self, owner_id: &str, bill_id: &str) -> Result<Bill, AppError> {
        self.bills
            .find(owner_id, bill_id)
            .await?
            .ok_or_else(|| not_found(bill_id))
    }

    pub async fn list(&self, owner_id: &str, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError> {
        self.bills.list(owner_id, filter).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, owner_id: &str, bill_id: &str) -> Result<(), AppError> {
        if !self.bills.delete(owner_id, bill_id).await? {
            metrics::record_bill_operation("delete", "not_found");
            return Err(not_found(bill_id));
        }
        metrics::record_bill_operation("delete", "success");
        tracing::info!("Bill deleted");
        Ok(())
    }
}
