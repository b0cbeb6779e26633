//! The transaction pool (§4.6): a bounded, insertion-ordered map keyed by
//! transaction ID. Admission deduplicates and checks against a speculative
//! sandbox via the injected `TxChecker` capability; broadcast is
//! fire-and-forget; `query_tx` serves out-of-band waiters with a per-ID
//! one-shot channel rather than the single pool-wide channel the original
//! implementation used (spec §9's resolution of that open question).

use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use zarb_types::{Transaction, TxId};

use crate::checker::TxChecker;
use crate::config::{DEFAULT_MAX_SIZE, DEFAULT_WAITING_TIMEOUT};
use crate::error::PoolError;
use crate::message::BroadcastMessage;

struct PoolInner {
    txs: IndexMap<TxId, Transaction>,
    waiters: HashMap<TxId, oneshot::Sender<Transaction>>,
}

pub struct TransactionPool<C: TxChecker> {
    inner: RwLock<PoolInner>,
    checker: C,
    broadcast_tx: mpsc::UnboundedSender<BroadcastMessage>,
    max_size: usize,
    waiting_timeout: Duration,
}

impl<C: TxChecker> TransactionPool<C> {
    pub fn new(checker: C, broadcast_tx: mpsc::UnboundedSender<BroadcastMessage>) -> Self {
        Self::with_config(checker, broadcast_tx, DEFAULT_MAX_SIZE, DEFAULT_WAITING_TIMEOUT)
    }

    pub fn with_config(
        checker: C,
        broadcast_tx: mpsc::UnboundedSender<BroadcastMessage>,
        max_size: usize,
        waiting_timeout: Duration,
    ) -> Self {
        TransactionPool {
            inner: RwLock::new(PoolInner {
                txs: IndexMap::new(),
                waiters: HashMap::new(),
            }),
            checker,
            broadcast_tx,
            max_size,
            waiting_timeout,
        }
    }

    /// Idempotent if the ID is already present. Otherwise admission-checks
    /// against the speculative sandbox and, on success, appends to the
    /// back of the pool, evicting the oldest entry if over capacity.
    pub async fn append_tx(&self, tx: Transaction) -> Result<(), PoolError> {
        let id = tx.id()?;

        if self.inner.read().await.txs.contains_key(&id) {
            log::trace!("transaction {id} is already in the pool");
            return Ok(());
        }

        self.checker
            .check(&tx)
            .await
            .map_err(|e| PoolError::CheckFailed(e.to_string()))?;

        let mut guard = self.inner.write().await;
        guard.txs.insert(id, tx.clone());
        if guard.txs.len() > self.max_size {
            guard.txs.shift_remove_index(0);
        }
        log::trace!("transaction {id} appended into pool");

        if let Some(waiter) = guard.waiters.remove(&id) {
            let _ = waiter.send(tx);
        }

        Ok(())
    }

    /// Same as `append_tx` but also fire-and-forget broadcasts the
    /// transaction. Admission never blocks on the broadcast send.
    pub async fn append_and_broadcast(&self, tx: Transaction) -> Result<(), PoolError> {
        self.append_tx(tx.clone()).await?;
        let _ = self.broadcast_tx.send(BroadcastMessage::Transactions(vec![tx]));
        Ok(())
    }

    /// Returns immediately if present; otherwise queries the network and
    /// waits up to the configured timeout for a matching `append_tx`.
    pub async fn query_tx(&self, id: TxId) -> Option<Transaction> {
        if let Some(tx) = self.inner.read().await.txs.get(&id).cloned() {
            return Some(tx);
        }

        let (tx_waiter, rx_waiter) = oneshot::channel();
        {
            let mut guard = self.inner.write().await;
            // A second concurrent miss on the same ID replaces the earlier
            // waiter; only one outstanding waiter slot exists per ID.
            guard.waiters.insert(id, tx_waiter);
        }

        log::debug!("querying transaction {id} from peers");
        let _ = self
            .broadcast_tx
            .send(BroadcastMessage::QueryTransactions(vec![id]));

        match tokio::time::timeout(self.waiting_timeout, rx_waiter).await {
            Ok(Ok(tx)) => Some(tx),
            _ => {
                log::warn!("no transaction received for {id} after {:?}", self.waiting_timeout);
                self.inner.write().await.waiters.remove(&id);
                None
            }
        }
    }

    /// Resets the checker's sandbox to the latest committed state, then
    /// removes every pool entry that no longer passes admission, in
    /// insertion order, preserving the relative order of survivors.
    pub async fn recheck(&self) {
        log::debug!("rechecking transactions");
        self.checker.reset().await;

        let mut guard = self.inner.write().await;
        let ids: Vec<TxId> = guard.txs.keys().copied().collect();
        for id in ids {
            let Some(tx) = guard.txs.get(&id).cloned() else {
                continue;
            };
            if self.checker.check(&tx).await.is_err() {
                log::debug!("transaction {id} is invalid after rechecking");
                guard.txs.shift_remove(&id);
            }
        }
    }

    pub async fn remove(&self, id: &TxId) {
        self.inner.write().await.txs.shift_remove(id);
    }

    pub async fn has_tx(&self, id: &TxId) -> bool {
        self.inner.read().await.txs.contains_key(id)
    }

    pub async fn size(&self) -> usize {
        self.inner.read().await.txs.len()
    }

    pub async fn all_transactions(&self) -> Vec<Transaction> {
        self.inner.read().await.txs.values().cloned().collect()
    }

    /// A cheap diagnostic string for logging: the pool's current size.
    pub async fn fingerprint(&self) -> String {
        format!("{{{}}}", self.size().await)
    }
}
