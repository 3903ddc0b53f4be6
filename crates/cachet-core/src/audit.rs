//! Self-addressed audit envelopes
//!
//! Audit events reuse the wrap engine with sender = recipient, so only the
//! acting identity can ever read its own action history. Scanning a mixed
//! feed routinely hits records that are not ours; audit decryption failure
//! is therefore "not applicable", never a fault.

use crate::error::{CachetError, CachetResult};
use crate::event::{Event, Filter, KIND_AUDIT, TYPE_TAG_AUDIT};
use crate::keys::{Keypair, PublicKey};
use crate::wrap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Closed set of auditable actions.
///
/// Unknown action strings are a construction-time error, never a silent
/// pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "secret:create")]
    SecretCreate,
    #[serde(rename = "secret:update")]
    SecretUpdate,
    #[serde(rename = "secret:delete")]
    SecretDelete,
    #[serde(rename = "secret:read")]
    SecretRead,
    #[serde(rename = "subscription:start")]
    SubscriptionStart,
    #[serde(rename = "subscription:renew")]
    SubscriptionRenew,
    #[serde(rename = "subscription:cancel")]
    SubscriptionCancel,
}

impl AuditAction {
    /// The wire label for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecretCreate => "secret:create",
            Self::SecretUpdate => "secret:update",
            Self::SecretDelete => "secret:delete",
            Self::SecretRead => "secret:read",
            Self::SubscriptionStart => "subscription:start",
            Self::SubscriptionRenew => "subscription:renew",
            Self::SubscriptionCancel => "subscription:cancel",
        }
    }
}

impl FromStr for AuditAction {
    type Err = CachetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secret:create" => Ok(Self::SecretCreate),
            "secret:update" => Ok(Self::SecretUpdate),
            "secret:delete" => Ok(Self::SecretDelete),
            "secret:read" => Ok(Self::SecretRead),
            "subscription:start" => Ok(Self::SubscriptionStart),
            "subscription:renew" => Ok(Self::SubscriptionRenew),
            "subscription:cancel" => Ok(Self::SubscriptionCancel),
            other => Err(CachetError::Validation(format!(
                "Unknown audit action: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional structured detail attached to an audit record.
///
/// A fixed variant set so serialization stays deterministic across
/// implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditDetails {
    /// Free-text note
    Note { text: String },
    /// The project/environment the action touched
    Address {
        project_id: String,
        environment: String,
    },
    /// Detail sealed separately by the caller; carried opaquely
    Encrypted { payload: String },
}

/// One entry in an identity's private action history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: AuditAction,
    pub target: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AuditDetails>,
}

/// Wrap an audit record addressed to its own author.
pub fn create_audit_event(
    keypair: &Keypair,
    action: AuditAction,
    target: &str,
    details: Option<AuditDetails>,
) -> CachetResult<(Event, AuditRecord)> {
    create_audit_event_at(keypair, action, target, details, chrono::Utc::now().timestamp())
}

/// [`create_audit_event`] with an explicit clock.
pub fn create_audit_event_at(
    keypair: &Keypair,
    action: AuditAction,
    target: &str,
    details: Option<AuditDetails>,
    now: i64,
) -> CachetResult<(Event, AuditRecord)> {
    let record = AuditRecord {
        action,
        target: target.to_string(),
        timestamp: now,
        details,
    };

    let content = serde_json::to_string(&record).map_err(|e| {
        CachetError::Serialization(format!("Failed to serialize audit record: {}", e))
    })?;

    let (envelope, _rumor) = wrap::wrap_payload(
        content,
        KIND_AUDIT,
        vec![],
        keypair,
        &keypair.public_key(),
        TYPE_TAG_AUDIT,
        now,
    )?;

    Ok((envelope, record))
}

/// Try to read an envelope as one of our audit events.
///
/// Returns `None` for anything that does not decrypt, is not an audit
/// rumor, or does not parse. Callers scanning mixed feeds branch on the
/// option, never on an error.
pub fn unwrap_audit_event(event: &Event, keypair: &Keypair) -> Option<AuditRecord> {
    let (rumor, _sender) = match wrap::open_wrap(event, keypair) {
        Ok(opened) => opened,
        Err(err) => {
            trace!(id = %event.id, %err, "record is not one of our audit events");
            return None;
        }
    };

    if rumor.kind != KIND_AUDIT {
        return None;
    }

    serde_json::from_str(&rumor.content).ok()
}

/// Relay filter matching this identity's audit envelopes.
///
/// Data shaping only; execution belongs to the query collaborator.
pub fn audit_event_filter(pubkey: &PublicKey, since: Option<i64>) -> Filter {
    Filter::for_recipient(pubkey, TYPE_TAG_AUDIT, since)
}
