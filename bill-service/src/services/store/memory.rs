use super::{matches_search, BillStore, CounterStore, UserStore};
use crate::models::{Bill, CounterType, ListBillsFilter, User};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use service_core::error::AppError;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryCounterStore {
    counters: DashMap<(String, CounterType), i64>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, owner_id: &str, counter_type: CounterType) -> Result<i64, AppError> {
        // The entry guard holds the shard lock across the read-modify-write.
        let mut sequence = self
            .counters
            .entry((owner_id.to_string(), counter_type))
            .or_insert(0);
        let next = sequence.checked_add(1).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Bill number counter exhausted"))
        })?;
        *sequence = next;
        Ok(next)
    }

    async fn current(
        &self,
        owner_id: &str,
        counter_type: CounterType,
    ) -> Result<Option<i64>, AppError> {
        Ok(self
            .counters
            .get(&(owner_id.to_string(), counter_type))
            .map(|sequence| *sequence))
    }

    async fn overwrite(
        &self,
        owner_id: &str,
        counter_type: CounterType,
        sequence: i64,
    ) -> Result<(), AppError> {
        self.counters
            .insert((owner_id.to_string(), counter_type), sequence);
        Ok(())
    }
}

/// Bills keyed by `bill_id`. The insertion sequence breaks ties between bills
/// created in the same instant.
#[derive(Default)]
pub struct MemoryBillStore {
    bills: DashMap<String, (u64, Bill)>,
    next_seq: AtomicU64,
}

impl MemoryBillStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillStore for MemoryBillStore {
    async fn insert(&self, bill: &Bill) -> Result<(), AppError> {
        match self.bills.entry(bill.bill_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(anyhow::anyhow!(
                "Bill {} already exists",
                bill.bill_id
            ))),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, bill.clone()));
                Ok(())
            }
        }
    }

    async fn find(&self, owner_id: &str, bill_id: &str) -> Result<Option<Bill>, AppError> {
        Ok(self
            .bills
            .get(bill_id)
            .filter(|stored| stored.1.owner_id == owner_id)
            .map(|stored| stored.1.clone()))
    }

    async fn replace(&self, bill: &Bill) -> Result<bool, AppError> {
        match self.bills.get_mut(&bill.bill_id) {
            Some(mut stored) if stored.1.owner_id == bill.owner_id => {
                stored.1 = bill.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, owner_id: &str, bill_id: &str) -> Result<bool, AppError> {
        Ok(self
            .bills
            .remove_if(bill_id, |_, stored| stored.1.owner_id == owner_id)
            .is_some())
    }

    async fn list(&self, owner_id: &str, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError> {
        let mut bills: Vec<(u64, Bill)> = self
            .bills
            .iter()
            .filter(|stored| stored.1.owner_id == owner_id)
            .filter(|stored| match filter.search.as_deref() {
                Some(term) => matches_search(&stored.1, term),
                None => true,
            })
            .map(|stored| stored.value().clone())
            .collect();

        bills.sort_by(|a, b| {
            b.1.created_utc
                .cmp(&a.1.created_utc)
                .then_with(|| b.0.cmp(&a.0))
        });

        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(bills
            .into_iter()
            .skip(filter.offset as usize)
            .take(limit)
            .map(|(_, bill)| bill)
            .collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Users keyed by username.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(anyhow::anyhow!(
                "Username already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(username).map(|user| user.clone()))
    }
}
