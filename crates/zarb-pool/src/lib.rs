//! The transaction pool (§4.6): admission, broadcast, query-on-miss, and
//! post-commit recheck, kept decoupled from the executor/sandbox it
//! checks against via the `TxChecker` capability (see spec §9's note on
//! breaking the State ↔ Pool ↔ Executor ownership cycle).

pub mod checker;
pub mod config;
pub mod error;
pub mod message;
pub mod pool;

pub use checker::TxChecker;
pub use error::PoolError;
pub use message::BroadcastMessage;
pub use pool::TransactionPool;
