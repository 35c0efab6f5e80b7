//! AES-256-GCM encryption for stored third-party credentials.
//!
//! Ciphertext layout is `nonce (12 bytes) || ciphertext+tag`, base64
//! encoded for storage in text columns. The key is derived from the
//! application secret with HMAC-SHA256 over a fixed context string.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use abdullahhub_core::error::{AppError, ErrorKind};

type HmacSha256 = Hmac<Sha256>;

const KEY_CONTEXT: &[u8] = b"abdullahhub/stored-credentials/aes-256-gcm/v1";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Errors raised while encrypting or decrypting credentials.
#[derive(Error, Debug)]
pub enum CipherError {
    /// The HMAC key could not be initialised.
    #[error("Key derivation failed")]
    KeyDerivation,

    /// Stored value is not valid base64.
    #[error("Invalid ciphertext encoding")]
    Encoding,

    /// Stored value is shorter than nonce plus tag.
    #[error("Invalid ciphertext: too short")]
    CiphertextTooShort,

    /// Authentication failed or the key is wrong.
    #[error("Decryption failed: corrupted data or wrong key")]
    DecryptionFailed,

    /// The AEAD refused to encrypt.
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Plaintext is not UTF-8.
    #[error("Decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

impl From<CipherError> for AppError {
    fn from(err: CipherError) -> Self {
        AppError::with_source(ErrorKind::Internal, "Credential encryption error", err)
    }
}

/// Encrypts and decrypts credential strings under one derived key.
#[derive(Clone)]
pub struct CredentialCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Derive the cipher key from the application secret.
    pub fn from_secret(secret: &str) -> Result<Self, CipherError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
            .map_err(|_| CipherError::KeyDerivation)?;
        mac.update(KEY_CONTEXT);
        Ok(Self {
            key: mac.finalize().into_bytes().into(),
        })
    }

    /// Encrypt a credential and return the base64 storage form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CipherError::KeyDerivation)?;

        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CipherError::Encoding)?;
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::CiphertextTooShort);
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CipherError::KeyDerivation)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_then_decrypt() {
        let cipher = CredentialCipher::from_secret("test-secret").expect("cipher");
        let stored = cipher.encrypt("rbg_live_abcdef123456").expect("encrypt");
        assert_ne!(stored, "rbg_live_abcdef123456");
        assert_eq!(cipher.decrypt(&stored).expect("decrypt"), "rbg_live_abcdef123456");
    }

    #[test]
    fn test_nonce_is_random() {
        let cipher = CredentialCipher::from_secret("test-secret").expect("cipher");
        assert_ne!(
            cipher.encrypt("same").expect("encrypt"),
            cipher.encrypt("same").expect("encrypt")
        );
    }

    #[test]
    fn test_wrong_secret_fails() {
        let stored = CredentialCipher::from_secret("one")
            .expect("cipher")
            .encrypt("value")
            .expect("encrypt");
        let result = CredentialCipher::from_secret("two")
            .expect("cipher")
            .decrypt(&stored);
        assert!(matches!(result, Err(CipherError::DecryptionFailed)));
    }

    #[test]
    fn test_short_and_malformed_input() {
        let cipher = CredentialCipher::from_secret("s").expect("cipher");
        assert!(matches!(
            cipher.decrypt(&STANDARD.encode([0u8; 10])),
            Err(CipherError::CiphertextTooShort)
        ));
        assert!(matches!(cipher.decrypt("%%%"), Err(CipherError::Encoding)));
    }
}
