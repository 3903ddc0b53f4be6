//! Error types for the Cachet protocol core

use thiserror::Error;

/// Main error type for Cachet protocol operations
#[derive(Error, Debug)]
pub enum CachetError {
    /// Input precondition violated before any cryptography ran
    /// (bad address format, bad key text, empty secret name)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Decryption or signature verification failed at any envelope layer.
    ///
    /// Always recoverable by the caller: a record that does not decrypt is
    /// indistinguishable from a record addressed to someone else.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Decryption succeeded but the payload does not match the expected
    /// structure (missing address tag, wrong kind, unparseable content)
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Sealing-construction version not supported
    #[error("Sealing version {0} is not supported")]
    UnsupportedVersion(u8),

    /// Access token is well-formed but past its expiry
    #[error("Token expired at {expired_at}")]
    TokenExpired { expired_at: i64 },

    /// Access token decrypted and parsed but was not sealed by the
    /// expected operator key
    #[error("Token issuer mismatch: sealed by {0}")]
    WrongIssuer(String),

    /// Required operator configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cryptographic operation failed
    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Result type alias using CachetError
pub type CachetResult<T> = Result<T, CachetError>;
