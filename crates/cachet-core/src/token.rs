//! Access tokens: operator-issued, subject-addressed capability records
//!
//! The operator wraps a token to the subject's key with the same envelope
//! machinery as secrets. Successful decryption alone does not authenticate
//! the claimed tier; validation additionally checks the seal's signer
//! against the known operator key, then the expiry window.
//!
//! Failure modes stay distinguishable so callers can branch between
//! "renew", "contact support", and "not a token at all".

use crate::error::{CachetError, CachetResult};
use crate::event::{Event, KIND_ACCESS_TOKEN, TYPE_TAG_ACCESS};
use crate::keys::{Keypair, PublicKey};
use crate::wrap;
use serde::{Deserialize, Serialize};

/// Token validity: a 30-day billing period plus renewal grace.
pub const TOKEN_VALIDITY_SECS: i64 = 33 * 24 * 60 * 60;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Closed set of paid capability tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Pro,
    Team,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pro => "pro",
            Self::Team => "team",
        }
    }
}

/// An operator-signed access credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Hex pubkey of the paying subject
    pub subject: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub tier: Tier,
    /// Reference into the payments collaborator's ledger
    pub invoice_ref: String,
}

/// Issue a token for `subject`, sealed and signed by the operator.
pub fn create_access_token(
    subject: &PublicKey,
    operator: &Keypair,
    tier: Tier,
    invoice_ref: &str,
) -> CachetResult<(Event, AccessToken)> {
    create_access_token_at(
        subject,
        operator,
        tier,
        invoice_ref,
        chrono::Utc::now().timestamp(),
    )
}

/// [`create_access_token`] with an explicit clock.
pub fn create_access_token_at(
    subject: &PublicKey,
    operator: &Keypair,
    tier: Tier,
    invoice_ref: &str,
    now: i64,
) -> CachetResult<(Event, AccessToken)> {
    let token = AccessToken {
        subject: subject.to_hex(),
        issued_at: now,
        expires_at: now + TOKEN_VALIDITY_SECS,
        tier,
        invoice_ref: invoice_ref.to_string(),
    };

    let content = serde_json::to_string(&token)
        .map_err(|e| CachetError::Serialization(format!("Failed to serialize token: {}", e)))?;

    let (envelope, _rumor) = wrap::wrap_payload(
        content,
        KIND_ACCESS_TOKEN,
        vec![],
        operator,
        subject,
        TYPE_TAG_ACCESS,
        now,
    )?;

    Ok((envelope, token))
}

/// Validate a token envelope held by the subject.
///
/// Distinguishes the failure modes:
/// - [`CachetError::DecryptionFailed`] / [`CachetError::MalformedRecord`]:
///   undecryptable or not a token
/// - [`CachetError::WrongIssuer`]: sealed by a key other than the operator
/// - [`CachetError::Validation`]: a token, but for a different subject
/// - [`CachetError::TokenExpired`]: well-formed but past `expires_at`
pub fn validate_access_token(
    envelope: &Event,
    operator: &PublicKey,
    subject_keys: &Keypair,
) -> CachetResult<AccessToken> {
    validate_access_token_at(envelope, operator, subject_keys, chrono::Utc::now().timestamp())
}

/// [`validate_access_token`] with an explicit clock.
pub fn validate_access_token_at(
    envelope: &Event,
    operator: &PublicKey,
    subject_keys: &Keypair,
    now: i64,
) -> CachetResult<AccessToken> {
    let (rumor, sender) = wrap::open_wrap(envelope, subject_keys)?;

    if rumor.kind != KIND_ACCESS_TOKEN {
        return Err(CachetError::MalformedRecord(format!(
            "Expected token kind {}, found {}",
            KIND_ACCESS_TOKEN, rumor.kind
        )));
    }

    let token: AccessToken = serde_json::from_str(&rumor.content).map_err(|_| {
        CachetError::MalformedRecord("Rumor content is not an access token".to_string())
    })?;

    // The seal signature already authenticated `sender`; the authority check
    // is that the sender is the operator we expect.
    if sender != *operator {
        return Err(CachetError::WrongIssuer(sender.to_hex()));
    }

    if token.subject != subject_keys.public_key().to_hex() {
        return Err(CachetError::Validation(
            "Token subject does not match holder".to_string(),
        ));
    }

    if now > token.expires_at {
        return Err(CachetError::TokenExpired {
            expired_at: token.expires_at,
        });
    }

    Ok(token)
}

/// Whether the token is past its expiry.
pub fn is_token_expired(token: &AccessToken) -> bool {
    is_token_expired_at(token, chrono::Utc::now().timestamp())
}

/// [`is_token_expired`] with an explicit clock.
pub fn is_token_expired_at(token: &AccessToken, now: i64) -> bool {
    now > token.expires_at
}

/// Whole days until expiry; negative once expired.
pub fn days_until_expiry(token: &AccessToken) -> i64 {
    days_until_expiry_at(token, chrono::Utc::now().timestamp())
}

/// [`days_until_expiry`] with an explicit clock.
pub fn days_until_expiry_at(token: &AccessToken, now: i64) -> i64 {
    (token.expires_at - now).div_euclid(SECS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_token_issue_validate_roundtrip() {
        let operator = Keypair::generate();
        let subject = Keypair::generate();

        let (envelope, issued) = create_access_token_at(
            &subject.public_key(),
            &operator,
            Tier::Pro,
            "inv_123",
            NOW,
        )
        .expect("Should issue");

        let validated =
            validate_access_token_at(&envelope, &operator.public_key(), &subject, NOW + 60)
                .expect("Should validate");

        assert_eq!(validated, issued);
        assert_eq!(validated.tier, Tier::Pro);
        assert_eq!(validated.invoice_ref, "inv_123");
        assert_eq!(validated.expires_at, NOW + TOKEN_VALIDITY_SECS);
    }

    #[test]
    fn test_expired_token_rejected() {
        let operator = Keypair::generate();
        let subject = Keypair::generate();

        let (envelope, token) = create_access_token_at(
            &subject.public_key(),
            &operator,
            Tier::Pro,
            "inv_123",
            NOW,
        )
        .expect("Should issue");

        let at = token.expires_at + 1;
        let result = validate_access_token_at(&envelope, &operator.public_key(), &subject, at);

        assert!(
            matches!(result, Err(CachetError::TokenExpired { expired_at }) if expired_at == token.expires_at)
        );
    }

    #[test]
    fn test_wrong_issuer_rejected_despite_clean_decryption() {
        let operator = Keypair::generate();
        let impostor = Keypair::generate();
        let subject = Keypair::generate();

        // Sealed by the impostor: decryption succeeds for the subject
        let (envelope, _) = create_access_token_at(
            &subject.public_key(),
            &impostor,
            Tier::Team,
            "inv_999",
            NOW,
        )
        .expect("Should issue");

        let result =
            validate_access_token_at(&envelope, &operator.public_key(), &subject, NOW + 60);

        assert!(
            matches!(result, Err(CachetError::WrongIssuer(signer)) if signer == impostor.public_key().to_hex())
        );
    }

    #[test]
    fn test_wrong_subject_rejected() {
        let operator = Keypair::generate();
        let subject = Keypair::generate();
        let holder = Keypair::generate();

        let (envelope, _) = create_access_token_at(
            &subject.public_key(),
            &operator,
            Tier::Pro,
            "inv_1",
            NOW,
        )
        .expect("Should issue");

        // Not addressed to the holder at all: decryption-layer failure
        let result =
            validate_access_token_at(&envelope, &operator.public_key(), &holder, NOW + 60);
        assert!(matches!(result, Err(CachetError::DecryptionFailed(_))));
    }

    #[test]
    fn test_expiry_helpers() {
        let token = AccessToken {
            subject: "ab".repeat(32),
            issued_at: NOW,
            expires_at: NOW + 3 * 24 * 60 * 60,
            tier: Tier::Pro,
            invoice_ref: "inv".to_string(),
        };

        assert!(!is_token_expired_at(&token, token.expires_at));
        assert!(is_token_expired_at(&token, token.expires_at + 1));

        assert_eq!(days_until_expiry_at(&token, NOW), 3);
        assert_eq!(days_until_expiry_at(&token, NOW + 24 * 60 * 60), 2);
        assert!(days_until_expiry_at(&token, token.expires_at + SECS_PER_DAY) < 0);
    }

    #[test]
    fn test_token_expired_exactly_one_second_ago() {
        let token = AccessToken {
            subject: "cd".repeat(32),
            issued_at: NOW - 100,
            expires_at: NOW - 1,
            tier: Tier::Team,
            invoice_ref: "inv".to_string(),
        };

        assert!(is_token_expired_at(&token, NOW));
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Pro).unwrap(), "\"pro\"");
        assert_eq!(serde_json::to_string(&Tier::Team).unwrap(), "\"team\"");
        assert_eq!(Tier::Pro.as_str(), "pro");
    }
}
