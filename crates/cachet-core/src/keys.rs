//! Identity keys and their human-readable text encoding
//!
//! A Cachet identity is a single Ed25519 keypair. The verifying key is the
//! durable identifier used for all addressing; the same key material drives
//! the X25519 exchange used by the sealing layer via the Ed25519 to X25519
//! birational map.
//!
//! ## Text Encoding
//!
//! Keys are exchanged as bech32 strings with reserved prefixes:
//!
//! | Prefix | Content |
//! |--------|---------|
//! | `csec` | 32-byte private seed |
//! | `cpub` | 32-byte public key |
//!
//! Decoding rejects a mismatched checksum, a wrong prefix, or any payload
//! that is not exactly 32 bytes.

use crate::error::{CachetError, CachetResult};
use bech32::{FromBase32, ToBase32, Variant};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as ExchangePublicKey, StaticSecret};

/// Human-readable prefix for private key text
pub const SECRET_KEY_HRP: &str = "csec";

/// Human-readable prefix for public key text
pub const PUBLIC_KEY_HRP: &str = "cpub";

/// An identity keypair.
///
/// Holds the Ed25519 signing key. The private half is never serialized by
/// any protocol structure; losing it is unrecoverable by design.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    ///
    /// Uses getrandom directly for the seed to avoid rand version conflicts.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).expect("Failed to get random bytes");
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// Create a keypair from a 32-byte private seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a keypair from `csec` bech32 text.
    ///
    /// Fails with a [`CachetError::Validation`] on a wrong prefix, broken
    /// checksum, or wrong payload length.
    pub fn from_bech32(text: &str) -> CachetResult<Self> {
        let seed = decode_key(SECRET_KEY_HRP, text)?;
        Ok(Self::from_seed(&seed))
    }

    /// Encode the private seed as `csec` bech32 text.
    pub fn to_bech32(&self) -> String {
        encode_key(SECRET_KEY_HRP, &self.secret_bytes())
    }

    /// Get the public key for this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key())
    }

    /// Sign a message, returning the raw Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing.sign(message)
    }

    /// Get the raw 32-byte private seed.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing.to_bytes()
    }

    /// X25519 secret for the sealing layer's key exchange.
    ///
    /// Derived from the Ed25519 scalar, so the exchange key is pinned to the
    /// same identity as the signing key.
    pub(crate) fn exchange_secret(&self) -> StaticSecret {
        StaticSecret::from(self.signing.to_scalar_bytes())
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self {
            signing: SigningKey::from_bytes(&self.signing.to_bytes()),
        }
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}

/// An identity public key.
///
/// Wire representation is lowercase hex (64 chars); user-facing
/// representation is `cpub` bech32 text.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parse a public key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> CachetResult<Self> {
        let key = VerifyingKey::from_bytes(bytes)
            .map_err(|_| CachetError::Validation("Invalid public key bytes".to_string()))?;
        Ok(Self(key))
    }

    /// Parse a public key from 64 hex characters.
    pub fn from_hex(hex_str: &str) -> CachetResult<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|_| CachetError::Validation("Invalid public key hex".to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CachetError::Validation("Public key must be 32 bytes".to_string()))?;
        Self::from_bytes(&arr)
    }

    /// Parse a public key from `cpub` bech32 text.
    pub fn from_bech32(text: &str) -> CachetResult<Self> {
        let bytes = decode_key(PUBLIC_KEY_HRP, text)?;
        Self::from_bytes(&bytes)
    }

    /// Encode as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Encode as `cpub` bech32 text.
    pub fn to_bech32(&self) -> String {
        encode_key(PUBLIC_KEY_HRP, self.0.as_bytes())
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Verify an Ed25519 signature over a message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        self.0.verify(message, &signature).is_ok()
    }

    /// X25519 public key for the sealing layer's key exchange.
    ///
    /// Montgomery form of the Ed25519 point; the counterpart of
    /// [`Keypair::exchange_secret`].
    pub(crate) fn exchange_key(&self) -> ExchangePublicKey {
        ExchangePublicKey::from(self.0.to_montgomery().to_bytes())
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_bytes().hash(state);
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}

fn encode_key(hrp: &str, bytes: &[u8; 32]) -> String {
    bech32::encode(hrp, bytes.to_base32(), Variant::Bech32).expect("valid HRP")
}

fn decode_key(expected_hrp: &str, text: &str) -> CachetResult<[u8; 32]> {
    let (hrp, data, variant) = bech32::decode(text)
        .map_err(|e| CachetError::Validation(format!("Invalid key text: {}", e)))?;

    if variant != Variant::Bech32 {
        return Err(CachetError::Validation(
            "Invalid key text: wrong bech32 variant".to_string(),
        ));
    }

    if hrp != expected_hrp {
        return Err(CachetError::Validation(format!(
            "Key type mismatch: expected '{}', found '{}'",
            expected_hrp, hrp
        )));
    }

    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| CachetError::Validation(format!("Invalid key payload: {}", e)))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        CachetError::Validation(format!("Key must decode to 32 bytes, found {}", v.len()))
    })?;

    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let keypair1 = Keypair::generate();
        let keypair2 = Keypair::generate();

        assert_ne!(keypair1.public_key(), keypair2.public_key());
        assert_eq!(keypair1.public_key().as_bytes().len(), 32);
    }

    #[test]
    fn test_keypair_from_seed_deterministic() {
        let seed = [7u8; 32];
        let keypair1 = Keypair::from_seed(&seed);
        let keypair2 = Keypair::from_seed(&seed);

        assert_eq!(keypair1.public_key(), keypair2.public_key());
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = Keypair::generate();
        let message = b"sealed and delivered";

        let signature = keypair.sign(message);
        assert!(keypair
            .public_key()
            .verify(message, &signature.to_bytes()));
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let keypair1 = Keypair::generate();
        let keypair2 = Keypair::generate();
        let message = b"test message";

        let signature = keypair1.sign(message);
        assert!(!keypair2
            .public_key()
            .verify(message, &signature.to_bytes()));
    }

    #[test]
    fn test_secret_key_bech32_roundtrip() {
        let keypair = Keypair::generate();
        let text = keypair.to_bech32();

        assert!(text.starts_with(SECRET_KEY_HRP));

        let recovered = Keypair::from_bech32(&text).expect("Should decode");
        assert_eq!(recovered.secret_bytes(), keypair.secret_bytes());
    }

    #[test]
    fn test_public_key_bech32_roundtrip() {
        let keypair = Keypair::generate();
        let text = keypair.public_key().to_bech32();

        assert!(text.starts_with(PUBLIC_KEY_HRP));

        let recovered = PublicKey::from_bech32(&text).expect("Should decode");
        assert_eq!(recovered, keypair.public_key());
    }

    #[test]
    fn test_bech32_checksum_rejected() {
        let keypair = Keypair::generate();
        let mut text = keypair.to_bech32();

        // Flip the last character to break the checksum
        let last = text.pop().unwrap();
        let replacement = if last == 'q' { 'p' } else { 'q' };
        text.push(replacement);

        let result = Keypair::from_bech32(&text);
        assert!(matches!(result, Err(CachetError::Validation(_))));
    }

    #[test]
    fn test_bech32_type_mismatch_rejected() {
        let keypair = Keypair::generate();

        // Public text through the private decoder
        let public_text = keypair.public_key().to_bech32();
        let result = Keypair::from_bech32(&public_text);
        assert!(matches!(result, Err(CachetError::Validation(msg)) if msg.contains("mismatch")));

        // Private text through the public decoder
        let secret_text = keypair.to_bech32();
        let result = PublicKey::from_bech32(&secret_text);
        assert!(matches!(result, Err(CachetError::Validation(msg)) if msg.contains("mismatch")));
    }

    #[test]
    fn test_bech32_decodes_to_32_bytes() {
        let keypair = Keypair::generate();
        let text = keypair.to_bech32();

        let (_, data, _) = bech32::decode(&text).expect("Should decode");
        let bytes = Vec::<u8>::from_base32(&data).expect("Should convert");
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let keypair = Keypair::generate();
        let hex_str = keypair.public_key().to_hex();

        assert_eq!(hex_str.len(), 64);

        let recovered = PublicKey::from_hex(&hex_str).expect("Should parse");
        assert_eq!(recovered, keypair.public_key());
    }

    #[test]
    fn test_public_key_hex_rejects_bad_input() {
        assert!(PublicKey::from_hex("not hex").is_err());
        assert!(PublicKey::from_hex("abcd").is_err());
    }

    #[test]
    fn test_exchange_keys_agree() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        let alice_shared = alice
            .exchange_secret()
            .diffie_hellman(&bob.public_key().exchange_key());
        let bob_shared = bob
            .exchange_secret()
            .diffie_hellman(&alice.public_key().exchange_key());

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_keypair_debug_hides_secret() {
        let keypair = Keypair::generate();
        let debug = format!("{:?}", keypair);

        assert!(debug.contains(&keypair.public_key().to_hex()));
        assert!(!debug.contains(&hex::encode(keypair.secret_bytes())));
    }

    #[test]
    fn test_public_key_serde_roundtrip() {
        let keypair = Keypair::generate();
        let public = keypair.public_key();

        let json = serde_json::to_string(&public).expect("Should serialize");
        let recovered: PublicKey = serde_json::from_str(&json).expect("Should deserialize");

        assert_eq!(public, recovered);
    }
}
