//! Sealing primitive: versioned AEAD keyed by an X25519 exchange
//!
//! Both envelope layers use the same construction. The conversation key is
//! derived from a Diffie-Hellman exchange between one party's secret and the
//! other's public key, expanded through HKDF-SHA256 with a domain-separation
//! label.
//!
//! ## Wire Format
//!
//! ```text
//! base64( [version (1 byte)] + [nonce (12 bytes)] + [ciphertext + tag (16 bytes)] )
//! ```
//!
//! A random nonce is generated per sealing operation, so sealing the same
//! plaintext twice produces different ciphertext every time.

use crate::error::{CachetError, CachetResult};
use crate::keys::{Keypair, PublicKey};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey as ExchangePublicKey, StaticSecret};

/// Current sealing construction version
pub const SEALING_VERSION: u8 = 1;

/// Nonce size for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Domain separation label for conversation key derivation
const CONVERSATION_KEY_INFO: &[u8] = b"cachet-conversation-key-v1";

/// Derive the 32-byte conversation key shared between two identities.
fn conversation_key(
    secret: &StaticSecret,
    public: &ExchangePublicKey,
) -> CachetResult<[u8; 32]> {
    let shared = secret.diffie_hellman(public);
    if !shared.was_contributory() {
        return Err(CachetError::Crypto(
            "Non-contributory key exchange".to_string(),
        ));
    }

    let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; 32];
    hkdf.expand(CONVERSATION_KEY_INFO, &mut key)
        .expect("HKDF expand should never fail with 32-byte output");
    Ok(key)
}

/// Seal plaintext from `sender` to `recipient`.
///
/// Returns the base64 text that goes into a record's `content` field.
pub fn seal_to(
    plaintext: &[u8],
    sender: &Keypair,
    recipient: &PublicKey,
) -> CachetResult<String> {
    let key = conversation_key(&sender.exchange_secret(), &recipient.exchange_key())?;
    let cipher = ChaCha20Poly1305::new(&key.into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CachetError::Crypto(format!("Encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
    blob.push(SEALING_VERSION);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(blob))
}

/// Open sealed text addressed to `recipient` from `sender`.
///
/// Fails with [`CachetError::DecryptionFailed`] on wrong keys, tampering, or
/// a malformed blob, and [`CachetError::UnsupportedVersion`] on an unknown
/// version byte.
pub fn open_from(
    sealed: &str,
    recipient: &Keypair,
    sender: &PublicKey,
) -> CachetResult<Vec<u8>> {
    let blob = BASE64
        .decode(sealed)
        .map_err(|_| CachetError::DecryptionFailed("Payload is not valid base64".to_string()))?;

    if blob.len() < 1 + NONCE_SIZE {
        return Err(CachetError::DecryptionFailed(
            "Payload too short to contain version and nonce".to_string(),
        ));
    }

    let version = blob[0];
    if version != SEALING_VERSION {
        return Err(CachetError::UnsupportedVersion(version));
    }

    let nonce = Nonce::from_slice(&blob[1..1 + NONCE_SIZE]);
    let ciphertext = &blob[1 + NONCE_SIZE..];

    let key = conversation_key(&recipient.exchange_secret(), &sender.exchange_key())?;
    let cipher = ChaCha20Poly1305::new(&key.into());

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CachetError::DecryptionFailed("AEAD open failed".to_string()))
}
