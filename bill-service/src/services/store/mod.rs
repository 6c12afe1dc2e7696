//! Persistence seams.
//!
//! Handlers and the sequence allocator only see these traits. MongoDB backs
//! them in production; the in-memory variants back tests and
//! `STORAGE_BACKEND=memory`.

mod memory;
mod mongo;

pub use memory::{MemoryBillStore, MemoryCounterStore, MemoryUserStore};
pub use mongo::BillDb;

use crate::models::{Bill, CounterType, ListBillsFilter, User};
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;

/// Per-owner sequence counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add one to the counter, creating it at zero first, and
    /// return the new value.
    async fn increment(&self, owner_id: &str, counter_type: CounterType) -> Result<i64, AppError>;

    /// Current value, `None` when the counter has never been touched.
    async fn current(
        &self,
        owner_id: &str,
        counter_type: CounterType,
    ) -> Result<Option<i64>, AppError>;

    /// Set the counter to `sequence`, creating it if needed.
    async fn overwrite(
        &self,
        owner_id: &str,
        counter_type: CounterType,
        sequence: i64,
    ) -> Result<(), AppError>;
}

/// Bills, always scoped to their owner.
#[async_trait]
pub trait BillStore: Send + Sync {
    async fn insert(&self, bill: &Bill) -> Result<(), AppError>;

    async fn find(&self, owner_id: &str, bill_id: &str) -> Result<Option<Bill>, AppError>;

    /// Replace the stored bill with the same `bill_id` and `owner_id`.
    /// Returns `false` when no such bill exists.
    async fn replace(&self, bill: &Bill) -> Result<bool, AppError>;

    /// Returns `false` when no such bill exists.
    async fn delete(&self, owner_id: &str, bill_id: &str) -> Result<bool, AppError>;

    /// Newest first.
    async fn list(&self, owner_id: &str, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// User accounts. Usernames are unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn insert(&self, user: &User) -> Result<(), AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

/// The three stores a running service needs.
#[derive(Clone)]
pub struct Stores {
    pub counters: Arc<dyn CounterStore>,
    pub bills: Arc<dyn BillStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn mongo(db: BillDb) -> Self {
        let db = Arc::new(db);
        Self {
            counters: db.clone(),
            bills: db.clone(),
            users: db,
        }
    }

    pub fn memory() -> Self {
        Self {
            counters: Arc::new(MemoryCounterStore::new()),
            bills: Arc::new(MemoryBillStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

/// Case-insensitive literal match used by the in-memory list search.
pub(crate) fn matches_search(bill: &Bill, term: &str) -> bool {
    let term = term.to_lowercase();
    bill.customer_name.to_lowercase().contains(&term)
        || bill.bill_number.to_lowercase().contains(&term)
}
