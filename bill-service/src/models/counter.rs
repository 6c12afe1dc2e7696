//! Per-owner sequence counters.

use serde::{Deserialize, Serialize};

/// What a counter numbers. Only bills are numbered today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterType {
    #[serde(rename = "billNumber")]
    BillNumber,
}

impl CounterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterType::BillNumber => "billNumber",
        }
    }
}

impl std::fmt::Display for CounterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter document as stored in the `counters` collection, one per
/// (owner_id, counter_type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub owner_id: String,
    pub counter_type: CounterType,
    #[serde(default)]
    pub sequence: i64,
}
