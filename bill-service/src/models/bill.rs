//! Bill model for bill-service.

use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Items the shop rents out. `Other` carries a free-text name on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogItem {
    Mandap,
    Table,
    #[serde(rename = "LED Light")]
    LedLight,
    Carpet,
    Stage,
    #[serde(rename = "Side Partition")]
    SidePartition,
    Gate,
    Other,
}

impl CatalogItem {
    pub const ALL: [CatalogItem; 8] = [
        CatalogItem::Mandap,
        CatalogItem::Table,
        CatalogItem::LedLight,
        CatalogItem::Carpet,
        CatalogItem::Stage,
        CatalogItem::SidePartition,
        CatalogItem::Gate,
        CatalogItem::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogItem::Mandap => "Mandap",
            CatalogItem::Table => "Table",
            CatalogItem::LedLight => "LED Light",
            CatalogItem::Carpet => "Carpet",
            CatalogItem::Stage => "Stage",
            CatalogItem::SidePartition => "Side Partition",
            CatalogItem::Gate => "Gate",
            CatalogItem::Other => "Other",
        }
    }

    /// Exact catalog names only; case and surrounding whitespace are forgiven.
    pub fn from_name(s: &str) -> Option<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|item| item.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl std::fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a bill. `amount` is always `quantity * rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_name: CatalogItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_item: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

impl LineItem {
    /// Name printed on the bill.
    pub fn display_name(&self) -> &str {
        match (&self.item_name, &self.custom_item) {
            (CatalogItem::Other, Some(custom)) if !custom.trim().is_empty() => custom.trim(),
            (item, _) => item.as_str(),
        }
    }
}

/// Bill document as stored in the `bills` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub bill_id: String,
    pub owner_id: String,
    pub bill_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_address: String,
    pub bill_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub advance_payment: Decimal,
    #[serde(default)]
    pub additional_payment: Decimal,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

/// Filter parameters for listing bills.
#[derive(Debug, Clone, Default)]
pub struct ListBillsFilter {
    /// Case-insensitive literal match against customer name or bill number.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: u64,
}
