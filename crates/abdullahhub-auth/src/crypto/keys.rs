//! API key generation, keyed hashing, and masking.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::cipher::CipherError;

type HmacSha256 = Hmac<Sha256>;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const MASK: &str = "********";
const VISIBLE_CHARS: usize = 4;

/// Hashes plain API keys for lookup without storing them in the clear.
#[derive(Clone)]
pub struct ApiKeyHasher {
    mac: HmacSha256,
}

impl std::fmt::Debug for ApiKeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyHasher").finish_non_exhaustive()
    }
}

impl ApiKeyHasher {
    /// Build a hasher keyed with `secret`.
    pub fn new(secret: &str) -> Result<Self, CipherError> {
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
            .map_err(|_| CipherError::KeyDerivation)?;
        Ok(Self { mac })
    }

    /// Hex HMAC-SHA256 of `api_key`.
    pub fn hash(&self, api_key: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(api_key.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// 32 random alphanumeric characters.
pub fn generate_api_key() -> String {
    let mut key = String::with_capacity(32);
    while key.len() < 32 {
        for byte in rand::random::<[u8; 32]>() {
            // 248 = 4 * 62; rejecting the tail keeps the draw uniform.
            if byte < 248 && key.len() < 32 {
                key.push(char::from(ALPHANUMERIC[usize::from(byte % 62)]));
            }
        }
    }
    key
}

/// 64 random hex characters.
pub fn generate_api_secret() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// `********` followed by the last four characters, or only the mask for
/// keys shorter than eight characters.
pub fn mask_api_key(api_key: &str) -> String {
    if api_key.chars().count() < 8 {
        return MASK.to_string();
    }
    format!("{MASK}{}", key_hint(api_key))
}

/// The trailing characters shown in masked views.
pub fn key_hint(api_key: &str) -> String {
    let count = api_key.chars().count();
    api_key.chars().skip(count.saturating_sub(VISIBLE_CHARS)).collect()
}
