//! Logical deletion: tombstone envelopes and advisory deletion requests
//!
//! A tombstone is a normal envelope carrying the empty bundle; it changes
//! what conflict resolution reports as current without erasing history, and
//! a later real write supersedes it.
//!
//! The deletion request is a separate, public record kind listing retracted
//! record ids. It is advisory metadata for well-behaved relays and does not
//! guarantee removal from any store.

use crate::address::Address;
use crate::error::{CachetError, CachetResult};
use crate::event::{Event, KIND_DELETION};
use crate::keys::Keypair;
use crate::wrap::{self, SecretBundle};

/// Wrap the empty bundle at an address.
///
/// Structurally indistinguishable from a normal write.
pub fn create_tombstone(keypair: &Keypair, address: &Address) -> CachetResult<(Event, Event)> {
    wrap::wrap(&SecretBundle::new(), keypair, address)
}

/// [`create_tombstone`] with an explicit clock.
pub fn create_tombstone_at(
    keypair: &Keypair,
    address: &Address,
    now: i64,
) -> CachetResult<(Event, Event)> {
    wrap::wrap_at(&SecretBundle::new(), keypair, address, now)
}

/// Build a public retraction notice for previously published record ids.
///
/// Signed by the real key and intentionally not encrypted; the optional
/// reason lands in the cleartext content field.
pub fn create_deletion_request(
    keypair: &Keypair,
    retracted_ids: &[String],
    reason: Option<&str>,
) -> CachetResult<Event> {
    create_deletion_request_at(
        keypair,
        retracted_ids,
        reason,
        chrono::Utc::now().timestamp(),
    )
}

/// [`create_deletion_request`] with an explicit clock.
pub fn create_deletion_request_at(
    keypair: &Keypair,
    retracted_ids: &[String],
    reason: Option<&str>,
    now: i64,
) -> CachetResult<Event> {
    if retracted_ids.is_empty() {
        return Err(CachetError::Validation(
            "Deletion request must retract at least one record".to_string(),
        ));
    }

    let tags = retracted_ids
        .iter()
        .map(|id| vec!["e".to_string(), id.clone()])
        .collect();

    Ok(Event::signed(
        keypair,
        now,
        KIND_DELETION,
        tags,
        reason.unwrap_or_default().to_string(),
    ))
}
