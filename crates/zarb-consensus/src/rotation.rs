//! Committee rotation (§4.5): admits validators that won sortition this
//! block, evicts the oldest member(s) if the committee grows past its
//! fixed size, and advances the proposer position by the certified round.

use zarb_crypto::Address;
use zarb_types::{Committee, Validator};

/// Admits up to `join_limit` sortition winners (rejecting any already a
/// member), evicts members with the smallest `last_joined_height` (ties
/// broken by ascending validator number) until the committee is back down
/// to `committee.size`, then advances the proposer by `round + 1` slots.
///
/// `height` stamps the `last_joined_height` of newly admitted members so
/// they are the least eligible for eviction immediately after joining.
/// Eviction respects `min_tenure_blocks` (§3's "minimum tenure before
/// eviction" invariant): a member admitted fewer than `min_tenure_blocks`
/// ago is skipped unless every member is that new, in which case the
/// tenure floor is waived rather than leaving the committee oversized.
pub fn rotate(
    committee: &mut Committee,
    joiners: &[Validator],
    join_limit: usize,
    height: u32,
    round: u16,
    min_tenure_blocks: u32,
) {
    let mut admitted = 0usize;
    for joiner in joiners {
        if admitted >= join_limit {
            break;
        }
        if committee.contains_address(&joiner.address) {
            continue;
        }
        let mut member = joiner.clone();
        member.last_joined_height = height;
        committee.members.push(member);
        admitted += 1;
    }

    while committee.members.len() as u32 > committee.size {
        evict_oldest(committee, height, min_tenure_blocks);
    }

    let size = committee.members.len().max(1) as u32;
    committee.proposer_position = (committee.proposer_position + round as u32 + 1) % size;
}

fn evict_oldest(committee: &mut Committee, height: u32, min_tenure_blocks: u32) {
    let tenured = committee
        .members
        .iter()
        .enumerate()
        .filter(|(_, v)| height.saturating_sub(v.last_joined_height) >= min_tenure_blocks)
        .min_by_key(|(_, v)| (v.last_joined_height, v.number));

    let candidate = tenured.or_else(|| {
        committee
            .members
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| (v.last_joined_height, v.number))
    });

    let Some((index, _)) = candidate else {
        return;
    };
    committee.members.remove(index);
}

/// Whether `address` already has a pending or seated slot in `committee`.
pub fn is_member(committee: &Committee, address: &Address) -> bool {
    committee.contains_address(address)
}
