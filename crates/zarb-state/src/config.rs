//! State machine parameters, in the style of `daemon/src/config.rs`'s
//! `pub const` blocks: fixed per spec §3/§4.5 unless noted, with
//! operator-tunable values (where the spec allows a "default") exposed by
//! `zarb-node` through its CLI.

/// Blocks must land on a multiple of this period, strictly after the
/// previous block's time (§3, §9 — mandatory, not merely test-only).
pub const BLOCK_PERIOD_SECS: u64 = 10;

/// Fixed committee size (§4.5's "default size 21").
pub const DEFAULT_COMMITTEE_SIZE: u32 = 21;

/// Maximum sortition winners admitted to the committee per block (§4.5
/// step 1). Kept small so a single block cannot flood the committee.
pub const DEFAULT_JOIN_LIMIT: usize = 1;

/// A freshly admitted committee member must hold its seat at least this
/// many blocks before it becomes eligible for eviction (§3's "minimum
/// tenure" invariant), enforced by biasing eviction toward
/// `last_joined_height`; rotation never evicts a member admitted within
/// the last `MIN_TENURE_BLOCKS` blocks unless every member is that new.
pub const MIN_TENURE_BLOCKS: u32 = 1;
