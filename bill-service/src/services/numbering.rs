//! Bill number allocation.
//!
//! Numbers are `BILL-` followed by the owner's counter value, zero-padded to
//! four digits. When the counter store cannot be reached the allocator does
//! not fail the request; it hands out `BILL-<epoch millis>` instead.

use crate::models::CounterType;
use crate::services::metrics;
use crate::services::store::CounterStore;
use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const PREFIX: &str = "BILL-";

/// Highest counter value `reset` accepts.
pub const MAX_START_FROM: i64 = 999_999_999;

/// Human-facing bill number. The text form is a public contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BillNumber(String);

impl BillNumber {
    pub fn sequential(sequence: i64) -> Self {
        Self(format!("{PREFIX}{sequence:04}"))
    }

    fn fallback(epoch_millis: i64) -> Self {
        Self(format!("{PREFIX}{epoch_millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for BillNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out per-owner bill numbers backed by a [`CounterStore`].
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
    last_fallback: AtomicI64,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            last_fallback: AtomicI64::new(0),
        }
    }

    /// Consume the next number for `owner_id`. Never fails.
    #[tracing::instrument(skip(self))]
    pub async fn allocate_next(&self, owner_id: &str) -> BillNumber {
        match self.store.increment(owner_id, CounterType::BillNumber).await {
            Ok(sequence) => {
                metrics::record_allocation("sequential");
                BillNumber::sequential(sequence)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Counter store unavailable, using timestamp bill number");
                metrics::record_allocation("fallback");
                self.fallback()
            }
        }
    }

    /// The number [`allocate_next`](Self::allocate_next) would hand out now,
    /// without consuming it. May be stale under concurrent allocation.
    #[tracing::instrument(skip(self))]
    pub async fn peek_next(&self, owner_id: &str) -> BillNumber {
        match self.store.current(owner_id, CounterType::BillNumber).await {
            Ok(current) => match current.unwrap_or(0).checked_add(1) {
                Some(next) => BillNumber::sequential(next),
                None => {
                    tracing::warn!("Bill number counter exhausted, previewing timestamp bill number");
                    self.fallback()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Counter store unavailable, previewing timestamp bill number");
                self.fallback()
            }
        }
    }

    /// Restart numbering so the next allocation is `start_from + 1`.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, owner_id: &str, start_from: i64) -> Result<(), AppError> {
        if !(0..=MAX_START_FROM).contains(&start_from) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "start_from must be between 0 and {}",
                MAX_START_FROM
            )));
        }
        self.store
            .overwrite(owner_id, CounterType::BillNumber, start_from)
            .await?;
        tracing::info!(start_from, "Bill number counter reset");
        Ok(())
    }

    /// Current epoch millis, bumped past the previous fallback so two calls in
    /// the same millisecond still differ.
    fn fallback(&self) -> BillNumber {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_fallback
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        BillNumber::fallback(now.max(previous + 1))
    }
}
