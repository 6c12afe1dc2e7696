pub mod bills;
pub mod jwt;
pub mod ledger;
pub mod metrics;
pub mod numbering;
pub mod store;

pub use bills::{BillDraft, BillService};
pub use jwt::{AccessTokenClaims, JwtService};
pub use metrics::{get_metrics, init_metrics};
pub use numbering::{BillNumber, SequenceAllocator};
pub use store::{BillDb, BillStore, CounterStore, Stores, UserStore};
