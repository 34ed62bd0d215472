//! AES-256-GCM cipher with Argon2id key derivation.
//!
//! Token layout: `base64(salt || nonce || ciphertext+tag)`. A fresh salt and
//! nonce are drawn for every token, so the key is re-derived per call.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

use super::Cipher;
use crate::error::CipherError;

const SALT_LENGTH: usize = 16;
const NONCE_LENGTH: usize = 12;
const KEY_LENGTH: usize = 32;

// == KDF Params ==
/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

// == AES-GCM Cipher ==
#[derive(Debug, Clone, Default)]
pub struct AesGcmCipher {
    kdf: KdfParams,
}

impl AesGcmCipher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kdf_params(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    fn derive_key(
        &self,
        passphrase: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LENGTH]>, CipherError> {
        let params = Params::new(
            self.kdf.memory_kib,
            self.kdf.iterations,
            self.kdf.parallelism,
            Some(KEY_LENGTH),
        )
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str, key: &str) -> Result<String, CipherError> {
        let mut salt = [0u8; SALT_LENGTH];
        let mut nonce = [0u8; NONCE_LENGTH];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let derived = self.derive_key(key, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&derived[..])
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut token = Vec::with_capacity(SALT_LENGTH + NONCE_LENGTH + ciphertext.len());
        token.extend_from_slice(&salt);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(token))
    }

    fn decrypt(&self, token: &str, key: &str) -> Result<String, CipherError> {
        let bytes = STANDARD
            .decode(token)
            .map_err(|e| CipherError::MalformedToken(e.to_string()))?;
        if bytes.len() < SALT_LENGTH + NONCE_LENGTH {
            return Err(CipherError::MalformedToken(format!(
                "token is {} bytes, shorter than salt and nonce",
                bytes.len()
            )));
        }

        let (salt, rest) = bytes.split_at(SALT_LENGTH);
        let (nonce, ciphertext) = rest.split_at(NONCE_LENGTH);

        let derived = self.derive_key(key, salt)?;
        let cipher = Aes256Gcm::new_from_slice(&derived[..])
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}
