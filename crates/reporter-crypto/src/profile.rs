//! Encryption profile: one keyed hasher plus one symmetric cipher.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

/// A pair of secrets bound to a source name.
///
/// The hash key drives deterministic HMAC-SHA256 hashing of filter values so
/// equality lookups hit the backend's search index without ever seeing
/// plaintext. The encrypt key is the AES-256-GCM key for field payloads,
/// supplied as 64 hex characters.
pub struct EncryptionProfile {
    name: String,
    hash_key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("EncryptionProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EncryptionProfile {
    /// Read both keys for `name` from the environment
    /// (`CRYPTO_HASH_SECRET_KEY_<NAME>`, `CRYPTO_ENCRYPT_SECRET_KEY_<NAME>`).
    pub fn from_env(name: &str) -> Result<Self, CryptoError> {
        let upper = name.to_uppercase();
        let hash_var = format!("CRYPTO_HASH_SECRET_KEY_{upper}");
        let encrypt_var = format!("CRYPTO_ENCRYPT_SECRET_KEY_{upper}");

        let hash_key = std::env::var(&hash_var).map_err(|_| CryptoError::KeyMissing {
            profile: name.to_string(),
            variable: hash_var.clone(),
        })?;
        let encrypt_key = std::env::var(&encrypt_var).map_err(|_| CryptoError::KeyMissing {
            profile: name.to_string(),
            variable: encrypt_var.clone(),
        })?;

        Self::from_keys(name, hash_key.as_bytes(), &encrypt_key, &encrypt_var)
    }

    /// Build a profile from key material directly (tests, alternate loaders).
    pub fn from_keys(
        name: &str,
        hash_key: &[u8],
        encrypt_key_hex: &str,
        encrypt_variable: &str,
    ) -> Result<Self, CryptoError> {
        let key_bytes = hex::decode(encrypt_key_hex.trim()).map_err(|err| {
            CryptoError::InvalidKey {
                profile: name.to_string(),
                variable: encrypt_variable.to_string(),
                reason: format!("not valid hex: {err}"),
            }
        })?;
        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKey {
                profile: name.to_string(),
                variable: encrypt_variable.to_string(),
                reason: format!("expected 32 bytes, got {}", key_bytes.len()),
            });
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        Ok(Self {
            name: name.to_string(),
            hash_key: hash_key.to_vec(),
            cipher,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deterministic keyed hash of a filter value, hex-encoded.
    pub fn hash(&self, value: &str) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hash_key)
            .expect("hmac accepts any key length");
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Encrypt a field payload; the random nonce is prepended and the whole
    /// buffer base64-encoded for transport.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed {
                reason: "cipher rejected the payload".to_string(),
            })?;
        let mut buffer = nonce.to_vec();
        buffer.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(buffer))
    }

    /// Decrypt one field payload; `field` names the value in diagnostics.
    pub fn decrypt(&self, payload: &str, field: &str) -> Result<String, CryptoError> {
        let raw = BASE64
            .decode(payload)
            .map_err(|err| CryptoError::DecryptionFailed {
                field: field.to_string(),
                reason: format!("invalid base64: {err}"),
            })?;
        if raw.len() <= NONCE_LEN {
            return Err(CryptoError::DecryptionFailed {
                field: field.to_string(),
                reason: "payload shorter than nonce".to_string(),
            });
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed {
                field: field.to_string(),
                reason: "authentication failure".to_string(),
            })?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed {
            field: field.to_string(),
            reason: "plaintext is not utf-8".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> EncryptionProfile {
        EncryptionProfile::from_keys(
            "onboarding",
            b"hash-secret",
            &"ab".repeat(32),
            "CRYPTO_ENCRYPT_SECRET_KEY_ONBOARDING",
        )
        .unwrap()
    }

    #[test]
    fn test_hash_is_deterministic_and_keyed() {
        let p = profile();
        assert_eq!(p.hash("12345678901"), p.hash("12345678901"));
        assert_ne!(p.hash("12345678901"), p.hash("12345678902"));

        let other = EncryptionProfile::from_keys(
            "onboarding",
            b"other-secret",
            &"ab".repeat(32),
            "CRYPTO_ENCRYPT_SECRET_KEY_ONBOARDING",
        )
        .unwrap();
        assert_ne!(p.hash("12345678901"), other.hash("12345678901"));
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let p = profile();
        let payload = p.encrypt("12345678901").unwrap();
        assert_ne!(payload, "12345678901");
        assert_eq!(p.decrypt(&payload, "document").unwrap(), "12345678901");
    }

    #[test]
    fn test_decrypt_failure_names_field() {
        let p = profile();
        let err = p.decrypt("not-base64!!!", "holders.document").unwrap_err();
        assert!(err.to_string().contains("holders.document"));

        let err = p.decrypt(&BASE64.encode(b"tiny"), "name").unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_rejects_short_encrypt_key() {
        let err = EncryptionProfile::from_keys("p", b"h", "abcd", "VAR").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
        let err = EncryptionProfile::from_keys("p", b"h", "zz", "VAR").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }
}
