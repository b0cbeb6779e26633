use std::time::Duration;

/// Default bounded pool capacity; oldest entry evicted on overflow.
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default `query_tx` wait before giving up on an out-of-band reply.
pub const DEFAULT_WAITING_TIMEOUT: Duration = Duration::from_secs(3);
