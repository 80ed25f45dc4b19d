//! Field-level protection for PII at rest.
//!
//! - AES-256-GCM authenticated encryption of individual string fields
//! - SHA-256 blind indexes for equality lookups on encrypted fields
//! - Argon2id password hashing
//! - Whole-record helpers for workflow documents

pub mod field;
pub mod password;
pub mod vault;
pub mod workflow;

use thiserror::Error;

pub use field::SealedField;
pub use password::{hash_password, verify_password};
pub use vault::{is_ciphertext, CryptoVault, DECRYPTION_FAILED, KEY_SIZE};
pub use workflow::WorkflowCrypto;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be 64 hex characters (256 bits)")]
    InvalidKey,

    #[error("encryption key is not configured (ENCRYPTION_KEY)")]
    MissingKey,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("malformed ciphertext")]
    MalformedCiphertext,

    #[error("ciphertext authentication failed")]
    AuthenticationFailed,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}
