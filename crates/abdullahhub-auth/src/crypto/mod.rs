//! Credential encryption and API key helpers.

pub mod cipher;
pub mod keys;

pub use cipher::{CipherError, CredentialCipher};
pub use keys::{ApiKeyHasher, generate_api_key, generate_api_secret, key_hint, mask_api_key};
