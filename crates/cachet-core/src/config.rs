//! Operator-side configuration
//!
//! The token issuer and webhook verifier need the operator signing key and
//! the shared webhook secret. Both load from the environment; a missing or
//! invalid value is a [`CachetError::Configuration`].

use crate::error::{CachetError, CachetResult};
use crate::keys::{Keypair, PublicKey};

/// Environment variable holding the operator's `csec` key text
pub const OPERATOR_KEY_ENV: &str = "CACHET_OPERATOR_KEY";

/// Environment variable holding the webhook shared secret
pub const WEBHOOK_SECRET_ENV: &str = "CACHET_WEBHOOK_SECRET";

/// Configuration for the service-operator role.
pub struct OperatorConfig {
    operator_keys: Keypair,
    webhook_secret: String,
}

impl OperatorConfig {
    /// Build from explicit values. The webhook secret must be non-empty.
    pub fn new(operator_keys: Keypair, webhook_secret: impl Into<String>) -> CachetResult<Self> {
        let webhook_secret = webhook_secret.into();
        if webhook_secret.is_empty() {
            return Err(CachetError::Configuration(
                "Webhook secret must be non-empty".to_string(),
            ));
        }
        Ok(Self {
            operator_keys,
            webhook_secret,
        })
    }

    /// Load from `CACHET_OPERATOR_KEY` and `CACHET_WEBHOOK_SECRET`.
    pub fn from_env() -> CachetResult<Self> {
        let key_text = std::env::var(OPERATOR_KEY_ENV).map_err(|_| {
            CachetError::Configuration(format!("{} is not set", OPERATOR_KEY_ENV))
        })?;
        let operator_keys = Keypair::from_bech32(&key_text).map_err(|e| {
            CachetError::Configuration(format!("{} is invalid: {}", OPERATOR_KEY_ENV, e))
        })?;

        let webhook_secret = std::env::var(WEBHOOK_SECRET_ENV).map_err(|_| {
            CachetError::Configuration(format!("{} is not set", WEBHOOK_SECRET_ENV))
        })?;

        Self::new(operator_keys, webhook_secret)
    }

    pub fn operator_keys(&self) -> &Keypair {
        &self.operator_keys
    }

    pub fn operator_public(&self) -> PublicKey {
        self.operator_keys.public_key()
    }

    pub fn webhook_secret(&self) -> &[u8] {
        self.webhook_secret.as_bytes()
    }
}

impl std::fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("operator_public", &self.operator_public().to_hex())
            .field("webhook_secret", &"<redacted>")
            .finish()
    }
}
