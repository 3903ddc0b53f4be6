//! HMAC verification for payment webhook deliveries
//!
//! The payments collaborator signs each delivery with
//! `sha256=<hex(HMAC-SHA256(secret, raw_body))>`. Verification recomputes
//! the MAC over the raw body and compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header prefix on every webhook signature
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for a payload.
pub fn sign_webhook(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `sha256=<hex>` signature header against the raw request body.
///
/// Returns `false` for a missing prefix, non-hex payload, or MAC mismatch.
pub fn verify_webhook(secret: &[u8], body: &[u8], signature_header: &str) -> bool {
    let Some(signature_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
