//! Envelope Codec
//!
//! Wraps a value with its expiration, serializes it to JSON and optionally
//! routes the text through the cipher boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::Cipher;
use crate::error::{DecodeError, EncodeError};

// == Envelope ==
/// Wire shape of every stored value: `{"data": .., "expiresAt": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    /// Unix milliseconds after which the value is gone, None = never
    #[serde(
        rename = "expiresAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<i64>,
}

impl<T> Envelope<T> {
    /// Expired once the current time is strictly past `expires_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at < now_ms)
    }
}

/// Cipher plus the passphrase it is keyed with.
#[derive(Clone, Copy)]
pub struct CipherBinding<'a> {
    pub cipher: &'a dyn Cipher,
    pub key: &'a str,
}

/// Output of [`encode`].
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    /// Text to hand to the storage backend
    pub text: String,
    pub expires_at: Option<i64>,
}

/// Output of [`decode`].
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub value: Value,
    pub expires_at: Option<i64>,
    pub expired: bool,
}

// == Encode ==
/// Builds the physical record for `value`.
///
/// A nonzero `ttl_override` wins over a nonzero `default_ttl_ms`; with
/// neither, the record never expires.
pub fn encode(
    value: &Value,
    ttl_override: Option<u64>,
    default_ttl_ms: u64,
    cipher: Option<CipherBinding<'_>>,
) -> Result<EncodedRecord, EncodeError> {
    let ttl = ttl_override
        .filter(|ttl| *ttl > 0)
        .or(Some(default_ttl_ms).filter(|ttl| *ttl > 0));
    let expires_at =
        ttl.map(|ttl| current_timestamp_ms().saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX)));

    let text = serde_json::to_string(&Envelope {
        data: value,
        expires_at,
    })?;
    let text = match cipher {
        Some(binding) => binding.cipher.encrypt(&text, binding.key)?,
        None => text,
    };

    Ok(EncodedRecord { text, expires_at })
}

// == Decode ==
/// Parses a physical record, reporting whether it has expired.
pub fn decode(text: &str, cipher: Option<CipherBinding<'_>>) -> Result<DecodedRecord, DecodeError> {
    let envelope: Envelope<Value> = match cipher {
        Some(binding) => serde_json::from_str(&binding.cipher.decrypt(text, binding.key)?)?,
        None => serde_json::from_str(text)?,
    };
    let expired = envelope.is_expired_at(current_timestamp_ms());

    Ok(DecodedRecord {
        value: envelope.data,
        expires_at: envelope.expires_at,
        expired,
    })
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
