use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use super::CryptoError;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// Returned by [`CryptoVault::decrypt`] when a value has the ciphertext shape
/// but cannot be opened. Never persist it back over the original field.
pub const DECRYPTION_FAILED: &str = "[Error al desencriptar]";

/// Field-level authenticated encryption plus blind indexing.
///
/// Ciphertexts are stored as `<hex nonce>:<hex tag>:<hex ciphertext>`.
#[derive(Clone)]
pub struct CryptoVault {
    cipher: Aes256Gcm,
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for CryptoVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoVault").finish_non_exhaustive()
    }
}

impl CryptoVault {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
            key,
        }
    }

    /// Build a vault from the 64-character hex key in configuration.
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| CryptoError::InvalidKey)?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self::new(key))
    }

    pub fn generate_key_hex() -> String {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }

    /// Encrypt a plaintext value. Empty input has nothing to protect and
    /// yields `None`.
    pub fn encrypt(&self, plaintext: &str) -> Result<Option<String>, CryptoError> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        // aes-gcm appends the tag to the ciphertext
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

        Ok(Some(format!(
            "{}:{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(ciphertext)
        )))
    }

    /// Encrypt, keeping empty values empty.
    pub fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(self.encrypt(plaintext)?.unwrap_or_default())
    }

    /// Decrypt a stored field.
    ///
    /// Values that are not in the ciphertext format were written before
    /// encryption existed and come back unchanged. Values that look like
    /// ciphertext but fail to open yield [`DECRYPTION_FAILED`].
    pub fn decrypt(&self, field: &str) -> String {
        let Some((nonce_hex, tag_hex, ciphertext_hex)) = split_ciphertext(field) else {
            return field.to_string();
        };

        match self.open(nonce_hex, tag_hex, ciphertext_hex) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!("Field decryption failed: {}", e);
                DECRYPTION_FAILED.to_string()
            }
        }
    }

    fn open(&self, nonce_hex: &str, tag_hex: &str, ciphertext_hex: &str) -> Result<String, CryptoError> {
        let nonce = hex::decode(nonce_hex).map_err(|_| CryptoError::MalformedCiphertext)?;
        let tag = hex::decode(tag_hex).map_err(|_| CryptoError::MalformedCiphertext)?;
        let mut sealed = hex::decode(ciphertext_hex).map_err(|_| CryptoError::MalformedCiphertext)?;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_ref())
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::MalformedCiphertext)
    }

    pub fn is_decryption_failure(value: &str) -> bool {
        value == DECRYPTION_FAILED
    }

    /// Deterministic equality-search surrogate for an encrypted field.
    pub fn blind_index(text: &str) -> Option<String> {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }

    /// Fingerprint of the active key for log lines; never the key itself.
    pub fn key_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.key);
        hex::encode(&digest[..4])
    }
}

/// True when `value` has the `nonce:tag:ciphertext` shape.
pub fn is_ciphertext(value: &str) -> bool {
    split_ciphertext(value).is_some()
}

fn split_ciphertext(value: &str) -> Option<(&str, &str, &str)> {
    let mut parts = value.split(':');
    let nonce = parts.next()?;
    let tag = parts.next()?;
    let ciphertext = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let is_hex = |s: &str| s.chars().all(|c| c.is_ascii_hexdigit());
    if nonce.len() != NONCE_SIZE * 2 || tag.len() != TAG_SIZE * 2 || !is_hex(nonce) || !is_hex(tag) {
        return None;
    }
    Some((nonce, tag, ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CryptoVault {
        CryptoVault::new([7u8; KEY_SIZE])
    }

    #[test]
    fn round_trips_plaintext() {
        let vault = vault();
        for s in ["Juan Perez", "juan@example.com", "ñandú · 漢字", "a:b:c"] {
            let sealed = vault.encrypt(s).unwrap().unwrap();
            assert_eq!(vault.decrypt(&sealed), s);
        }
    }

    #[test]
    fn ciphertext_has_three_hex_parts() {
        let sealed = vault().encrypt("secret").unwrap().unwrap();
        let parts: Vec<&str> = sealed.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), NONCE_SIZE * 2);
        assert_eq!(parts[1].len(), TAG_SIZE * 2);
        assert!(is_ciphertext(&sealed));
    }

    #[test]
    fn nonces_are_fresh_per_call() {
        let vault = vault();
        let a = vault.encrypt("same").unwrap().unwrap();
        let b = vault.encrypt("same").unwrap().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_input_is_no_value() {
        assert_eq!(vault().encrypt("").unwrap(), None);
        assert_eq!(vault().seal("").unwrap(), "");
    }

    #[test]
    fn legacy_plaintext_passes_through() {
        let vault = vault();
        assert_eq!(vault.decrypt("Gerencia"), "Gerencia");
        assert_eq!(vault.decrypt("10:30"), "10:30");
        assert_eq!(vault.decrypt(""), "");
    }

    #[test]
    fn wrong_key_yields_sentinel() {
        let sealed = vault().encrypt("secret").unwrap().unwrap();
        let other = CryptoVault::new([9u8; KEY_SIZE]);
        let result = other.decrypt(&sealed);
        assert_eq!(result, DECRYPTION_FAILED);
        assert!(CryptoVault::is_decryption_failure(&result));
    }

    #[test]
    fn tampered_ciphertext_yields_sentinel() {
        let vault = vault();
        let sealed = vault.encrypt("secret").unwrap().unwrap();
        let mut tampered = sealed.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert_eq!(vault.decrypt(&tampered), DECRYPTION_FAILED);
    }

    #[test]
    fn from_hex_validates_key_length() {
        assert!(CryptoVault::from_hex(&"ab".repeat(32)).is_ok());
        assert!(matches!(CryptoVault::from_hex("abcd"), Err(CryptoError::InvalidKey)));
        assert!(matches!(CryptoVault::from_hex(&"zz".repeat(32)), Err(CryptoError::InvalidKey)));
        assert_eq!(CryptoVault::generate_key_hex().len(), KEY_SIZE * 2);
    }

    #[test]
    fn blind_index_ignores_case_and_whitespace() {
        let a = CryptoVault::blind_index("Juan@Example.com").unwrap();
        let b = CryptoVault::blind_index("  juan@example.COM \n").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(!a.contains("juan"));
        assert_eq!(CryptoVault::blind_index("   "), None);
    }
}
