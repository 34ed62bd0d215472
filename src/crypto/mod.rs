//! Crypto Module
//!
//! The cipher boundary: records are handed over as text and come back as an
//! opaque token whose layout belongs entirely to the cipher.

mod aes;

use crate::error::CipherError;

pub use aes::{AesGcmCipher, KdfParams};

// == Cipher ==
/// Symmetric text cipher keyed by a passphrase.
///
/// `decrypt` must fail on a wrong key or a tampered token rather than
/// return garbage.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &str, key: &str) -> Result<String, CipherError>;

    fn decrypt(&self, token: &str, key: &str) -> Result<String, CipherError>;
}
