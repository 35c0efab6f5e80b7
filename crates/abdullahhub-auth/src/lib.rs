//! # abdullahhub-auth
//!
//! Identity and secret handling for AbdullahHub:
//!
//! - Argon2id password hashing and the password policy
//! - HS256 bearer tokens
//! - AES-256-GCM encryption of stored third-party credentials
//! - API key generation, keyed hashing, and masking

pub mod crypto;
pub mod jwt;
pub mod password;

pub use crypto::{CipherError, CredentialCipher};
pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::{PasswordHasher, PasswordValidator};
