//! The pool's admission capability. Rather than the pool owning an
//! executor/sandbox directly — which would cycle State ↔ Pool ↔ Executor
//! (see spec §9) — the pool is handed a `TxChecker` capability by whoever
//! assembles it (`zarb-state`), and calls through it to admission-check a
//! transaction against a speculative sandbox over the current committed
//! state.

use async_trait::async_trait;
use zarb_types::Transaction;

use crate::error::PoolError;

#[async_trait]
pub trait TxChecker: Send + Sync {
    /// Runs the transaction through the same per-kind validation the state
    /// machine would apply, against a speculative sandbox. Must not mutate
    /// any persisted state.
    async fn check(&self, tx: &Transaction) -> Result<(), PoolError>;

    /// Resets the checker's sandbox to reflect the latest committed state.
    /// Called once at the start of every `recheck()` pass.
    async fn reset(&self);
}

/// Lets the node keep its own handle to a checker (e.g. to call methods
/// beyond the `TxChecker` trait, like `StateChecker::refresh`) while the
/// same instance is handed to the pool by `Arc`, rather than the pool
/// owning the only reference.
#[async_trait]
impl<T: TxChecker + ?Sized> TxChecker for std::sync::Arc<T> {
    async fn check(&self, tx: &Transaction) -> Result<(), PoolError> {
        (**self).check(tx).await
    }

    async fn reset(&self) {
        (**self).reset().await
    }
}
