//! Domain models for bill-service.

mod bill;
mod counter;
mod user;

pub use bill::{Bill, CatalogItem, LineItem, ListBillsFilter};
pub use counter::{Counter, CounterType};
pub use user::User;
