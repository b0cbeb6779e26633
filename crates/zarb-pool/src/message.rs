use zarb_types::{Transaction, TxId};

/// Sent on the pool's broadcast channel; the network task is the only
/// consumer. Fire-and-forget — the pool never waits on delivery.
#[derive(Clone, Debug)]
pub enum BroadcastMessage {
    Transactions(Vec<Transaction>),
    QueryTransactions(Vec<TxId>),
}
