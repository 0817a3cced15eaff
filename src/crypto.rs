//! At-rest encryption of secret material.
//!
//! TSIG keys and account secrets are stored encrypted. The algebra is a
//! two-method capability so the rest of the crate never names a cipher:
//! the zone model calls it when transitioning connection keys to and from
//! their persisted form, and the authenticator calls it to materialize an
//! account secret for signature verification.
//!
//! Two implementations ship: [`NoOpCrypto`] (identity, for test
//! configurations) and [`Aes256GcmCrypto`] (AES-256-GCM with a random
//! 96-bit nonce prepended to the ciphertext, base64-wrapped).

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;

use crate::config::CryptoConfig;
use crate::error::Error;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Reversible encryption of secret strings.
///
/// Implementations must be stateless (or stateless plus key material) and
/// safe for concurrent use; a single instance is shared by every in-flight
/// request.
pub trait CryptoAlgebra: Send + Sync {
    /// Encrypts a plaintext secret into its stored form.
    fn encrypt(&self, value: &str) -> Result<String, Error>;

    /// Decrypts a stored secret back to plaintext.
    fn decrypt(&self, value: &str) -> Result<String, Error>;
}

/// Identity algebra for test configurations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCrypto;

impl CryptoAlgebra for NoOpCrypto {
    fn encrypt(&self, value: &str) -> Result<String, Error> {
        Ok(value.to_string())
    }

    fn decrypt(&self, value: &str) -> Result<String, Error> {
        Ok(value.to_string())
    }
}

/// AES-256-GCM algebra.
///
/// The stored form is `base64(nonce || ciphertext)` with a fresh random
/// nonce per encryption, so encrypting the same secret twice yields
/// different stored values.
pub struct Aes256GcmCrypto {
    cipher: Aes256Gcm,
}

impl Aes256GcmCrypto {
    /// Creates an algebra from a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        if key.len() != 32 {
            return Err(Error::Crypto(format!(
                "AES-256 key must be 32 bytes, got {}",
                key.len()
            )));
        }
        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        })
    }

    /// Creates an algebra from a base64-encoded 32-byte key.
    pub fn from_base64_key(key: &str) -> Result<Self, Error> {
        let raw = BASE64
            .decode(key)
            .map_err(|e| Error::Crypto(format!("key is not valid base64: {e}")))?;
        Self::new(&raw)
    }
}

impl CryptoAlgebra for Aes256GcmCrypto {
    fn encrypt(&self, value: &str) -> Result<String, Error> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, value.as_bytes())
            .map_err(|_| Error::Crypto("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    fn decrypt(&self, value: &str) -> Result<String, Error> {
        let raw = BASE64
            .decode(value)
            .map_err(|e| Error::Crypto(format!("stored secret is not valid base64: {e}")))?;
        if raw.len() < NONCE_LEN {
            return Err(Error::Crypto("stored secret is truncated".to_string()));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Crypto("decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::Crypto("decrypted secret is not UTF-8".to_string()))
    }
}

/// Selects the configured algebra.
pub fn from_config(config: &CryptoConfig) -> Result<Arc<dyn CryptoAlgebra>, Error> {
    match config {
        CryptoConfig::NoOp => Ok(Arc::new(NoOpCrypto)),
        CryptoConfig::Aes256Gcm { key } => Ok(Arc::new(Aes256GcmCrypto::from_base64_key(key)?)),
    }
}
