//! Wire types for the `/bills` routes.
//!
//! Amount fields arrive as whatever the form sends (number, numeric string,
//! empty string) and go through `ledger::coerce_amount`. Money goes out as
//! decimal strings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use validator::Validate;

use crate::models::{Bill, CatalogItem, LineItem};
use crate::services::ledger;
use crate::services::numbering::MAX_START_FROM;
use crate::services::BillDraft;
use crate::utils::not_blank;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub item_name: String,
    #[serde(default)]
    pub custom_item: Option<String>,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default)]
    pub rate: Value,
}

/// Body of `POST /bills` and `PUT /bills/:id`.
#[derive(Debug, Deserialize, Validate)]
pub struct BillRequest {
    #[validate(custom(function = "not_blank"))]
    pub customer_name: String,

    #[serde(default)]
    pub customer_address: String,

    /// Defaults to today (UTC).
    #[serde(default)]
    pub bill_date: Option<NaiveDate>,

    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<LineItemRequest>,

    #[serde(default)]
    pub advance_payment: Value,

    /// Payment received during this edit. Ignored on create.
    #[serde(default)]
    pub new_payment: Value,
}

impl LineItemRequest {
    fn into_line_item(self, position: usize) -> Result<LineItem, AppError> {
        let item_name = CatalogItem::from_name(&self.item_name).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Item {}: unknown item '{}'",
                position + 1,
                self.item_name
            ))
        })?;

        let custom_item = self.custom_item.filter(|c| !c.trim().is_empty());
        if item_name == CatalogItem::Other && custom_item.is_none() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Item {}: a name is required for 'Other'",
                position + 1
            )));
        }

        Ok(ledger::price_line(
            item_name,
            custom_item,
            ledger::coerce_amount(&self.quantity),
            ledger::coerce_amount(&self.rate),
        ))
    }
}

impl BillRequest {
    /// Price the items, drop empty rows and coerce payments. Returns the draft
    /// and the coerced new payment.
    pub fn into_draft(self) -> Result<(BillDraft, Decimal), AppError> {
        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(position, item)| item.into_line_item(position))
            .collect::<Result<Vec<_>, _>>()?;

        let items = ledger::retain_billable(items);
        if items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "At least one item needs a quantity or a rate"
            )));
        }

        let draft = BillDraft {
            customer_name: self.customer_name.trim().to_string(),
            customer_address: self.customer_address.trim().to_string(),
            bill_date: self.bill_date.unwrap_or_else(|| Utc::now().date_naive()),
            items,
            advance_payment: ledger::coerce_amount(&self.advance_payment),
        };

        Ok((draft, ledger::coerce_amount(&self.new_payment)))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListBillsQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetCounterRequest {
    #[serde(default)]
    #[validate(range(
        min = 0,
        max = MAX_START_FROM,
        message = "start_from must be between 0 and 999999999"
    ))]
    pub start_from: i64,
}

#[derive(Debug, Serialize)]
pub struct NextNumberResponse {
    pub bill_number: String,
}

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub item_name: CatalogItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_item: Option<String>,
    pub display_name: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        Self {
            display_name: item.display_name().to_string(),
            item_name: item.item_name,
            custom_item: item.custom_item,
            quantity: item.quantity,
            rate: item.rate,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillResponse {
    pub bill_id: String,
    pub bill_number: String,
    pub customer_name: String,
    pub customer_address: String,
    pub bill_date: NaiveDate,
    pub items: Vec<LineItemResponse>,
    pub subtotal: Decimal,
    pub advance_payment: Decimal,
    pub additional_payment: Decimal,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Bill> for BillResponse {
    fn from(bill: Bill) -> Self {
        Self {
            bill_id: bill.bill_id,
            bill_number: bill.bill_number,
            customer_name: bill.customer_name,
            customer_address: bill.customer_address,
            bill_date: bill.bill_date,
            items: bill.items.into_iter().map(Into::into).collect(),
            subtotal: bill.subtotal,
            advance_payment: bill.advance_payment,
            additional_payment: bill.additional_payment,
            total_paid: bill.total_paid,
            remaining_amount: bill.remaining_amount,
            created_at: bill.created_utc,
            updated_at: bill.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateBillResponse {
    #[serde(flatten)]
    pub bill: BillResponse,
    pub new_payment_applied: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ListBillsResponse {
    pub bills: Vec<BillResponse>,
    pub count: usize,
    pub limit: i64,
    pub offset: u64,
}
