//! Gift Wrap Engine: three nested layers around a secret bundle
//!
//! ```text
//! GiftWrap (published, kind 1059):
//! ┌───────────────────────────────────────────────────────────┐
//! │  pubkey: ephemeral key     - fresh per wrap, never reused │
//! │  created_at: now - jitter  - randomized, up to ~2 days    │
//! │  tags: [p recipient][t ..] - cleartext routing metadata   │
//! │  content: sealed ──────────┐                              │
//! ├────────────────────────────┼──────────────────────────────┤
//! │  Seal (kind 13):           ▼                              │
//! │    pubkey: real sender     - authenticates the sender     │
//! │    created_at: true time   - hidden by the outer layer    │
//! │    content: sealed ────────┐                              │
//! ├────────────────────────────┼──────────────────────────────┤
//! │  Rumor (kind 30078, unsigned):                            │
//! │    tags: [d project|env]   - the address, never cleartext │
//! │    content: secret bundle JSON                            │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the public type tag and recipient tag are cleartext on the outer
//! record. The outer signer is a throwaway key, so published envelopes are
//! not linkable to the real sender.
//!
//! Wrapping is deliberately non-deterministic: a fresh ephemeral key, nonce,
//! and timestamp jitter mean two wraps of the same bundle never share an id
//! or ciphertext.

use crate::address::Address;
use crate::crypto;
use crate::error::{CachetError, CachetResult};
use crate::event::{
    Event, Filter, KIND_GIFT_WRAP, KIND_SEAL, KIND_SECRETS, TYPE_TAG_SECRETS,
};
use crate::keys::{Keypair, PublicKey};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::trace;

/// A bundle of named secrets. Names are non-empty; values are arbitrary
/// strings. The empty bundle is the tombstone state.
pub type SecretBundle = BTreeMap<String, String>;

/// Upper bound on outer-envelope timestamp jitter (~2 days).
///
/// A privacy heuristic, not a protocol guarantee; treat the distribution as
/// a tunable.
pub const TIMESTAMP_JITTER_SECS: i64 = 2 * 24 * 60 * 60;

/// Everything recovered from one successfully unwrapped secret envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped {
    /// The decrypted bundle (`{}` for a tombstone)
    pub secrets: SecretBundle,
    /// Address recovered from the rumor's `d` tag
    pub address: Address,
    /// The rumor's true creation time (not the jittered outer timestamp)
    pub created_at: i64,
    /// Authenticated real sender
    pub sender: PublicKey,
    /// Id of the published outer record, used as the conflict tie-breaker
    pub wrap_id: String,
}

impl Unwrapped {
    /// Whether this envelope carries the logical-deletion state.
    pub fn is_tombstone(&self) -> bool {
        self.secrets.is_empty()
    }
}

/// Wrap a secret bundle for the sender's own key space at the given address.
///
/// Returns the publishable outer envelope and the inner rumor. The rumor is
/// for the caller's own bookkeeping; it must never be published.
pub fn wrap(
    bundle: &SecretBundle,
    keypair: &Keypair,
    address: &Address,
) -> CachetResult<(Event, Event)> {
    wrap_at(bundle, keypair, address, chrono::Utc::now().timestamp())
}

/// [`wrap`] with an explicit clock.
pub fn wrap_at(
    bundle: &SecretBundle,
    keypair: &Keypair,
    address: &Address,
    now: i64,
) -> CachetResult<(Event, Event)> {
    if bundle.keys().any(|name| name.is_empty()) {
        return Err(CachetError::Validation(
            "Secret names must be non-empty".to_string(),
        ));
    }

    let content = serde_json::to_string(bundle)
        .map_err(|e| CachetError::Serialization(format!("Failed to serialize bundle: {}", e)))?;
    let tags = vec![vec!["d".to_string(), address.tag()]];

    wrap_payload(
        content,
        KIND_SECRETS,
        tags,
        keypair,
        &keypair.public_key(),
        TYPE_TAG_SECRETS,
        now,
    )
}

/// Wrap an arbitrary rumor payload from `sender` to `recipient`.
///
/// Shared by secret bundles, audit records, and access tokens; only the
/// inner kind, tags, and public type tag differ.
pub(crate) fn wrap_payload(
    content: String,
    kind: u32,
    tags: Vec<Vec<String>>,
    sender: &Keypair,
    recipient: &PublicKey,
    type_tag: &str,
    now: i64,
) -> CachetResult<(Event, Event)> {
    // Rumor: unsigned, carries the true timestamp and the address tag
    let rumor = Event::new_unsigned(sender.public_key().to_hex(), now, kind, tags, content);
    let rumor_json = rumor.to_json()?;

    // Seal: encrypted to the recipient, signed by the real sender. Its
    // timestamp is the true one; the outer layer hides it.
    let sealed_rumor = crypto::seal_to(rumor_json.as_bytes(), sender, recipient)?;
    let seal = Event::signed(sender, now, KIND_SEAL, vec![], sealed_rumor);
    let seal_json = seal.to_json()?;

    // Gift wrap: fresh ephemeral signer, jittered timestamp, public routing
    // tags only
    let ephemeral = Keypair::generate();
    let sealed_seal = crypto::seal_to(seal_json.as_bytes(), &ephemeral, recipient)?;
    let jitter = rand::rng().random_range(0..TIMESTAMP_JITTER_SECS);
    let wrap = Event::signed(
        &ephemeral,
        now - jitter,
        KIND_GIFT_WRAP,
        vec![
            vec!["p".to_string(), recipient.to_hex()],
            vec!["t".to_string(), type_tag.to_string()],
        ],
        sealed_seal,
    );

    Ok((wrap, rumor))
}

/// Open an envelope down to its rumor, authenticating every layer.
///
/// Returns the rumor and the authenticated real sender. Callers check the
/// rumor kind and parse the content for their own payload type.
pub(crate) fn open_wrap(event: &Event, recipient: &Keypair) -> CachetResult<(Event, PublicKey)> {
    if event.kind != KIND_GIFT_WRAP {
        return Err(CachetError::MalformedRecord(format!(
            "Expected kind {}, found {}",
            KIND_GIFT_WRAP, event.kind
        )));
    }

    if !event.verify() {
        return Err(CachetError::DecryptionFailed(
            "Outer signature does not verify".to_string(),
        ));
    }

    let ephemeral = PublicKey::from_hex(&event.pubkey)
        .map_err(|_| CachetError::DecryptionFailed("Outer pubkey is not a valid key".to_string()))?;

    let seal_bytes = crypto::open_from(&event.content, recipient, &ephemeral)?;
    let seal: Event = serde_json::from_slice(&seal_bytes)
        .map_err(|_| CachetError::MalformedRecord("Decrypted seal is not a record".to_string()))?;

    if seal.kind != KIND_SEAL {
        return Err(CachetError::MalformedRecord(format!(
            "Expected seal kind {}, found {}",
            KIND_SEAL, seal.kind
        )));
    }
    if !seal.verify() {
        return Err(CachetError::DecryptionFailed(
            "Seal signature does not match claimed sender".to_string(),
        ));
    }

    let sender = PublicKey::from_hex(&seal.pubkey)
        .map_err(|_| CachetError::MalformedRecord("Seal pubkey is not a valid key".to_string()))?;

    let rumor_bytes = crypto::open_from(&seal.content, recipient, &sender)?;
    let rumor: Event = serde_json::from_slice(&rumor_bytes)
        .map_err(|_| CachetError::MalformedRecord("Decrypted rumor is not a record".to_string()))?;

    Ok((rumor, sender))
}

/// Unwrap a secret envelope, returning the bundle alone.
pub fn unwrap(event: &Event, keypair: &Keypair) -> CachetResult<SecretBundle> {
    unwrap_gift_wrap(event, keypair).map(|u| u.secrets)
}

/// Unwrap a secret envelope, keeping the address and timing metadata.
pub fn unwrap_gift_wrap(event: &Event, keypair: &Keypair) -> CachetResult<Unwrapped> {
    let (rumor, sender) = open_wrap(event, keypair)?;

    if rumor.kind != KIND_SECRETS {
        return Err(CachetError::MalformedRecord(format!(
            "Expected secrets kind {}, found {}",
            KIND_SECRETS, rumor.kind
        )));
    }

    let address = rumor
        .tag_value("d")
        .and_then(Address::parse)
        .ok_or_else(|| {
            CachetError::MalformedRecord("Rumor is missing a valid address tag".to_string())
        })?;

    let secrets: SecretBundle = serde_json::from_str(&rumor.content).map_err(|_| {
        CachetError::MalformedRecord("Rumor content is not a secret bundle".to_string())
    })?;

    Ok(Unwrapped {
        secrets,
        address,
        created_at: rumor.created_at,
        sender,
        wrap_id: event.id.clone(),
    })
}

/// Decrypt-and-filter over a feed of candidate records.
///
/// Yields only the envelopes that unwrap for `keypair`, in input order.
/// Records that fail for any reason (not addressed to us, foreign kinds,
/// corrupted ciphertext) are discarded, not faults.
pub fn unwrap_feed<'a>(
    events: impl IntoIterator<Item = &'a Event> + 'a,
    keypair: &'a Keypair,
) -> impl Iterator<Item = Unwrapped> + 'a {
    events
        .into_iter()
        .filter_map(move |event| match unwrap_gift_wrap(event, keypair) {
            Ok(unwrapped) => Some(unwrapped),
            Err(err) => {
                trace!(id = %event.id, %err, "discarding record that does not unwrap");
                None
            }
        })
}

/// Relay filter matching this recipient's secret envelopes.
pub fn secrets_filter(recipient: &PublicKey, since: Option<i64>) -> Filter {
    Filter::for_recipient(recipient, TYPE_TAG_SECRETS, since)
}
