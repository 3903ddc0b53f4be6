//! Last-write-wins conflict resolution across unwrapped envelopes
//!
//! Pure and side-effect free: the resolver consumes already-unwrapped
//! candidates and picks one winner per address. It never fetches, decrypts,
//! or publishes; those belong to the transport and the wrap engine.
//!
//! Ordering is total: greatest rumor `created_at` wins, exact ties go to the
//! lexicographically greater outer record id. Candidates for different
//! addresses never compete.

use crate::address::Address;
use crate::wrap::Unwrapped;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Select the current envelope per address.
///
/// A winner with an empty bundle means the address is tombstoned; an absent
/// address means it was never written.
pub fn resolve_current(candidates: impl IntoIterator<Item = Unwrapped>) -> HashMap<Address, Unwrapped> {
    let mut current: HashMap<Address, Unwrapped> = HashMap::new();

    for candidate in candidates {
        match current.entry(candidate.address.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                if beats(&candidate, slot.get()) {
                    slot.insert(candidate);
                }
            }
        }
    }

    current
}

/// Resolve a single address from a candidate set, ignoring all others.
pub fn resolve_address(
    candidates: impl IntoIterator<Item = Unwrapped>,
    address: &Address,
) -> Option<Unwrapped> {
    resolve_current(
        candidates
            .into_iter()
            .filter(|c| &c.address == address),
    )
    .remove(address)
}

fn beats(challenger: &Unwrapped, holder: &Unwrapped) -> bool {
    (challenger.created_at, challenger.wrap_id.as_str())
        > (holder.created_at, holder.wrap_id.as_str())
}
