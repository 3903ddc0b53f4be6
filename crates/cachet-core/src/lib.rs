//! Cachet Core Library
//!
//! Sealed secret envelopes over untrusted, append-only relay networks.
//!
//! ## Overview
//!
//! Cachet turns a plaintext key/value bundle into an opaque, signed,
//! publishable record that no relay can read, tamper with, or silently
//! revoke. Confidentiality comes entirely from encryption: every relay that
//! stores an envelope can serve it to anyone, and only the recipient key can
//! open it.
//!
//! ## Core Principles
//!
//! - **Three nested layers**: rumor (plaintext) → seal (authenticated) →
//!   gift wrap (published, signed by a throwaway key)
//! - **Last-write-wins**: many relays converge on "the current secrets" for
//!   a `project|environment` address without coordination
//! - **No key recovery**: losing the private key is unrecoverable by design
//!
//! ## Quick Start
//!
//! ```
//! use cachet_core::{wrap, unwrap, Address, Keypair, SecretBundle};
//!
//! let keys = Keypair::generate();
//! let address = Address::new("my-api", "prod")?;
//!
//! let mut secrets = SecretBundle::new();
//! secrets.insert("API_KEY".to_string(), "x".to_string());
//!
//! // Wrap for publishing; hand the envelope to your relay transport
//! let (envelope, _rumor) = wrap(&secrets, &keys, &address)?;
//!
//! // Later, unwrap what the relays delivered
//! let recovered = unwrap(&envelope, &keys)?;
//! assert_eq!(recovered, secrets);
//! # Ok::<(), cachet_core::CachetError>(())
//! ```
//!
//! Publishing, subscribing, and persistence are external collaborators;
//! nothing in this crate performs I/O.

pub mod address;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod event;
pub mod keys;
pub mod ratelimit;
pub mod resolve;
pub mod token;
pub mod tombstone;
pub mod webhook;
pub mod wrap;

// Re-exports
pub use address::Address;
pub use audit::{
    audit_event_filter, create_audit_event, unwrap_audit_event, AuditAction, AuditDetails,
    AuditRecord,
};
pub use config::OperatorConfig;
pub use error::{CachetError, CachetResult};
pub use event::{Event, Filter, KIND_DELETION, KIND_GIFT_WRAP, KIND_SEAL};
pub use keys::{Keypair, PublicKey};
pub use ratelimit::{
    CounterStore, MemoryCounterStore, RateLimitConfig, RateLimitDecision, RateLimitPreset,
    RateLimiter,
};
pub use resolve::{resolve_address, resolve_current};
pub use token::{
    create_access_token, days_until_expiry, is_token_expired, validate_access_token, AccessToken,
    Tier,
};
pub use tombstone::{create_deletion_request, create_tombstone};
pub use webhook::{sign_webhook, verify_webhook};
pub use wrap::{
    secrets_filter, unwrap, unwrap_feed, unwrap_gift_wrap, wrap, SecretBundle, Unwrapped,
};
