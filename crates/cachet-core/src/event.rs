//! Signed record structure shared with the relay network
//!
//! Every published structure rides on the same record shape:
//!
//! ```text
//! { id, pubkey, created_at, kind, tags, content, sig }
//! ```
//!
//! `id` is the BLAKE3 hash of the canonical JSON serialization of
//! `[0, pubkey, created_at, kind, tags, content]`, and `sig` is an Ed25519
//! signature over the raw id bytes. Rumors use the same shape with an empty
//! `sig`; they are never published directly.

use crate::error::{CachetError, CachetResult};
use crate::keys::{Keypair, PublicKey};
use serde::{Deserialize, Serialize};

/// Kind reserved for the middle (seal) layer of an envelope
pub const KIND_SEAL: u32 = 13;

/// Kind reserved for published sealed envelopes (the only kind that ever
/// leaves the building)
pub const KIND_GIFT_WRAP: u32 = 1059;

/// Kind of the advisory deletion-request record
pub const KIND_DELETION: u32 = 5;

/// Inner kind carried by secret-bundle rumors
pub const KIND_SECRETS: u32 = 30078;

/// Inner kind carried by audit-record rumors
pub const KIND_AUDIT: u32 = 30079;

/// Inner kind carried by access-token rumors
pub const KIND_ACCESS_TOKEN: u32 = 30080;

/// Public type tag on secret envelopes
pub const TYPE_TAG_SECRETS: &str = "cachet-secrets";

/// Public type tag on audit envelopes
pub const TYPE_TAG_AUDIT: &str = "cachet-audit";

/// Public type tag on access-token envelopes
pub const TYPE_TAG_ACCESS: &str = "cachet-access";

/// A record in the fixed relay wire shape.
///
/// Hex encoding throughout: `id` is 64 chars, `pubkey` 64 chars, `sig` 128
/// chars (empty for rumors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// BLAKE3 hash of the canonical serialization, hex encoded
    pub id: String,
    /// Author public key, hex encoded
    pub pubkey: String,
    /// Unix timestamp in seconds
    pub created_at: i64,
    /// Record kind
    pub kind: u32,
    /// Tag list; each tag is `[key, value, ...]`
    pub tags: Vec<Vec<String>>,
    /// Payload; ciphertext for sealed layers, cleartext otherwise
    pub content: String,
    /// Ed25519 signature over the id bytes, hex encoded
    pub sig: String,
}

impl Event {
    /// Build an unsigned record (a rumor). The id is computed, `sig` stays
    /// empty.
    pub fn new_unsigned(
        pubkey: String,
        created_at: i64,
        kind: u32,
        tags: Vec<Vec<String>>,
        content: String,
    ) -> Self {
        let id = compute_id(&pubkey, created_at, kind, &tags, &content);
        Self {
            id,
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig: String::new(),
        }
    }

    /// Build and sign a record with the given keypair.
    pub fn signed(
        keypair: &Keypair,
        created_at: i64,
        kind: u32,
        tags: Vec<Vec<String>>,
        content: String,
    ) -> Self {
        let pubkey = keypair.public_key().to_hex();
        let id = compute_id(&pubkey, created_at, kind, &tags, &content);
        let id_bytes = hex::decode(&id).expect("id is valid hex");
        let sig = hex::encode(keypair.sign(&id_bytes).to_bytes());
        Self {
            id,
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig,
        }
    }

    /// Verify this record: the id must match the canonical hash and the
    /// signature must verify against the embedded pubkey.
    pub fn verify(&self) -> bool {
        let expected = compute_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        );
        if expected != self.id {
            return false;
        }

        let Ok(pubkey) = PublicKey::from_hex(&self.pubkey) else {
            return false;
        };
        let Ok(id_bytes) = hex::decode(&self.id) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(&self.sig) else {
            return false;
        };

        pubkey.verify(&id_bytes, &sig_bytes)
    }

    /// First value of the first tag with the given key.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(key))
            .and_then(|tag| tag.get(1))
            .map(String::as_str)
    }

    /// Serialize to the wire JSON string.
    pub fn to_json(&self) -> CachetResult<String> {
        serde_json::to_string(self)
            .map_err(|e| CachetError::Serialization(format!("Failed to serialize record: {}", e)))
    }

    /// Parse from wire JSON.
    pub fn from_json(json: &str) -> CachetResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CachetError::Serialization(format!("Failed to parse record: {}", e)))
    }
}

/// Canonical record id: BLAKE3 over the JSON array
/// `[0, pubkey, created_at, kind, tags, content]`.
pub fn compute_id(
    pubkey: &str,
    created_at: i64,
    kind: u32,
    tags: &[Vec<String>],
    content: &str,
) -> String {
    let canonical = serde_json::to_string(&(0, pubkey, created_at, kind, tags, content))
        .expect("canonical fields serialize");
    hex::encode(blake3::hash(canonical.as_bytes()).as_bytes())
}

/// Relay query filter for sealed envelopes.
///
/// Data shape only; executing the query is the transport collaborator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Record kinds to match
    pub kinds: Vec<u32>,
    /// Recipient tag values (`p` tags), hex pubkeys
    #[serde(rename = "#p", default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    /// Type tag values (`t` tags)
    #[serde(rename = "#t", default, skip_serializing_if = "Vec::is_empty")]
    pub type_tags: Vec<String>,
    /// Only records created at or after this unix timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
}

impl Filter {
    /// Filter for all sealed envelopes addressed to `recipient` carrying the
    /// given type tag.
    pub fn for_recipient(recipient: &PublicKey, type_tag: &str, since: Option<i64>) -> Self {
        Self {
            kinds: vec![KIND_GIFT_WRAP],
            recipients: vec![recipient.to_hex()],
            type_tags: vec![type_tag.to_string()],
            since,
        }
    }
}
