/// Minimum fee accepted for any non-Subsidy transaction.
pub const MIN_FEE: i64 = 1;

/// Per-block coinbase paid to the proposer via the mandatory first
/// Subsidy transaction, before accumulated fees are added on top.
pub const BLOCK_REWARD: i64 = 1_000_000;
