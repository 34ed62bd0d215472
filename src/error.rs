//! Error types for the store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Storage Error ==
/// Failure reported by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would exceed the backend's byte quota
    #[error("Quota exceeded: write needs {required} bytes but quota is {quota} bytes")]
    QuotaExceeded { required: usize, quota: usize },

    /// The backing file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not contain a valid key-value map
    #[error("Corrupt storage file: {0}")]
    Corrupt(#[source] serde_json::Error),
}

// == Cipher Error ==
/// Failure reported by the cipher boundary.
#[derive(Error, Debug)]
pub enum CipherError {
    /// Token is not valid base64 or is too short to hold salt and nonce
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Key derivation rejected its inputs
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Authentication failed: wrong key or tampered token
    #[error("Decryption failed")]
    Decrypt,

    /// Encryption failed
    #[error("Encryption failed")]
    Encrypt,

    /// Decrypted bytes are not UTF-8
    #[error("Plaintext is not valid UTF-8")]
    InvalidUtf8,
}

// == Codec Errors ==
/// Failure turning a value into a physical record.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Value cannot be represented as JSON
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Cipher refused the plaintext
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Failure turning a physical record back into a value.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Record could not be decrypted
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Record text is not an envelope of the requested type
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

// == Store Error ==
/// Error surfaced by [`crate::JsonStore`] operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Invalid configuration, raised at construction
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The selected storage backend could not be opened
    #[error("Storage unavailable: {0}")]
    Unavailable(#[source] StorageError),

    /// The storage backend rejected a write or delete
    #[error("Failed to write item for key \"{key}\": {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: StorageError,
    },

    /// A record exists but cannot be decoded
    #[error("Failed to retrieve item for key \"{key}\": {source}")]
    Retrieval {
        key: String,
        #[source]
        source: DecodeError,
    },

    /// The value could not be encoded
    #[error("Failed to encode item for key \"{key}\": {source}")]
    Encode {
        key: String,
        #[source]
        source: EncodeError,
    },
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
