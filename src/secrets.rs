//! Secret loading and credential encryption
//!
//! Secrets are loaded from the 1Password CLI first and fall back to
//! environment variables only when the configuration allows it. Every loaded
//! secret lives in a `Zeroizing` buffer.
//!
//! Broker passwords and pass keys are stored encrypted with AES-256-GCM using
//! a 16-byte random IV, serialized as `base64(iv):base64(tag):base64(ciphertext)`.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use std::env;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

/// AES-256-GCM with a 128-bit IV
type CredentialCipher = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// 1Password reference of the credential master key, overridable per deployment
pub const MASTER_KEY_OP_REFERENCE: &str = "op://StarMF/gateway/credential_encryption_key";
pub const MASTER_KEY_ENV: &str = "CREDENTIAL_ENCRYPTION_KEY";

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("1Password CLI error: {0}")]
    OnePasswordError(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Secret validation failed: {0}")]
    ValidationFailed(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

#[derive(Debug, Clone)]
pub struct SecretConfig {
    /// Permit the environment-variable fallback. Off in release builds.
    pub allow_env_vars: bool,
    pub require_op_cli: bool,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            allow_env_vars: cfg!(debug_assertions),
            require_op_cli: false,
        }
    }
}

impl SecretConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            allow_env_vars: env::var("ALLOW_ENV_SECRETS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.allow_env_vars),
            require_op_cli: env::var("REQUIRE_OP_CLI")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.require_op_cli),
        }
    }
}

/// Load a secret from 1Password, falling back to `env_var_name` when allowed
pub fn load_secret(
    op_reference: &str,
    env_var_name: &str,
    config: &SecretConfig,
) -> Result<Zeroizing<String>, SecretError> {
    match load_from_op_cli(op_reference) {
        Ok(secret) => {
            info!("Loaded {} from 1Password CLI", env_var_name);
            return Ok(secret);
        }
        Err(e) => {
            if config.require_op_cli {
                error!("1Password CLI required but failed: {}", e);
                return Err(e);
            }
            warn!("1Password CLI not available: {}", e);
        }
    }

    if config.allow_env_vars {
        warn!(
            "Loading {} from environment variable (not for production)",
            env_var_name
        );
        load_from_env(env_var_name)
    } else {
        error!(
            "1Password CLI unavailable and env vars disabled for {}",
            env_var_name
        );
        Err(SecretError::NotFound(env_var_name.to_string()))
    }
}

fn load_from_op_cli(reference: &str) -> Result<Zeroizing<String>, SecretError> {
    use std::process::Command;

    let output = Command::new("op")
        .arg("read")
        .arg(reference)
        .output()
        .map_err(|e| SecretError::OnePasswordError(format!("Failed to execute 'op': {}", e)))?;

    if !output.status.success() {
        return Err(SecretError::OnePasswordError(format!(
            "op read failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = Zeroizing::new(output.stdout);
    let secret = std::str::from_utf8(&stdout)
        .map_err(|e| SecretError::OnePasswordError(format!("Invalid UTF-8 from 1Password: {}", e)))?
        .trim();

    if secret.is_empty() {
        return Err(SecretError::OnePasswordError(
            "1Password returned empty secret".to_string(),
        ));
    }

    Ok(Zeroizing::new(secret.to_string()))
}

fn load_from_env(env_var_name: &str) -> Result<Zeroizing<String>, SecretError> {
    env::var(env_var_name)
        .map(Zeroizing::new)
        .map_err(|_| SecretError::EnvVarNotSet(env_var_name.to_string()))
}

/// Symmetric cipher for credentials at rest
pub struct SecretCipher {
    key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").field("key", &"***").finish()
    }
}

impl SecretCipher {
    pub fn new(key: &[u8]) -> Result<Self, SecretError> {
        if key.len() != KEY_LEN {
            return Err(SecretError::ValidationFailed(format!(
                "Encryption key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
        })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let key = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| SecretError::ValidationFailed(format!("Encryption key is not base64: {}", e)))?,
        );
        Self::new(&key)
    }

    /// Load the master key through the secret loader
    pub fn load(config: &SecretConfig) -> Result<Self, SecretError> {
        let op_reference = env::var("CREDENTIAL_ENCRYPTION_KEY_OP_REF")
            .unwrap_or_else(|_| MASTER_KEY_OP_REFERENCE.to_string());
        let encoded = load_secret(&op_reference, MASTER_KEY_ENV, config)?;
        Self::from_base64(&encoded)
    }

    fn cipher(&self) -> Result<CredentialCipher, SecretError> {
        CredentialCipher::new_from_slice(&self.key)
            .map_err(|e| SecretError::ValidationFailed(format!("Invalid key: {}", e)))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut sealed = self
            .cipher()?
            .encrypt(Nonce::<U16>::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| SecretError::Encryption("AES-GCM seal failed".to_string()))?;

        // aes-gcm appends the tag to the ciphertext
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}:{}:{}",
            STANDARD.encode(iv),
            STANDARD.encode(tag),
            STANDARD.encode(&sealed)
        ))
    }

    pub fn decrypt(&self, stored: &str) -> Result<Zeroizing<String>, SecretError> {
        let mut parts = stored.split(':');
        let (iv, tag, ciphertext) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(iv), Some(tag), Some(ct), None) => (iv, tag, ct),
            _ => {
                return Err(SecretError::Decryption(
                    "expected iv:authTag:ciphertext".to_string(),
                ))
            }
        };

        let decode = |label: &str, value: &str| {
            STANDARD
                .decode(value)
                .map_err(|e| SecretError::Decryption(format!("{} is not base64: {}", label, e)))
        };
        let iv = decode("iv", iv)?;
        let tag = decode("authTag", tag)?;
        let mut sealed = decode("ciphertext", ciphertext)?;

        if iv.len() != IV_LEN || tag.len() != TAG_LEN {
            return Err(SecretError::Decryption(
                "unexpected iv or authTag length".to_string(),
            ));
        }
        sealed.extend_from_slice(&tag);

        let plaintext = Zeroizing::new(
            self.cipher()?
                .decrypt(Nonce::<U16>::from_slice(&iv), sealed.as_slice())
                .map_err(|_| SecretError::Decryption("authentication failed".to_string()))?,
        );

        let text = std::str::from_utf8(&plaintext)
            .map_err(|e| SecretError::Decryption(format!("plaintext is not UTF-8: {}", e)))?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> SecretCipher {
        SecretCipher::new(&[7u8; KEY_LEN]).unwrap()
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let cipher = cipher();
        let stored = cipher.encrypt("broker-password").unwrap();
        assert_eq!(stored.split(':').count(), 3);
        assert!(!stored.contains("broker-password"));
        assert_eq!(cipher.decrypt(&stored).unwrap().as_str(), "broker-password");
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let cipher = cipher();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let cipher = cipher();
        let stored = cipher.encrypt("secret").unwrap();
        let parts: Vec<&str> = stored.split(':').collect();
        let mut ct = STANDARD.decode(parts[2]).unwrap();
        ct[0] ^= 0xff;
        let tampered = format!("{}:{}:{}", parts[0], parts[1], STANDARD.encode(ct));

        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(SecretError::Decryption(_))
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let stored = cipher().encrypt("secret").unwrap();
        let other = SecretCipher::new(&[9u8; KEY_LEN]).unwrap();
        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn test_malformed_layout() {
        assert!(cipher().decrypt("onlyone").is_err());
        assert!(cipher().decrypt("a:b:c:d").is_err());
    }

    #[test]
    fn test_key_length_enforced() {
        assert!(SecretCipher::new(&[1u8; 16]).is_err());
        assert!(SecretCipher::from_base64(&STANDARD.encode([1u8; 32])).is_ok());
        assert!(SecretCipher::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_load_from_env() {
        env::set_var("STARMF_TEST_SECRET", "value-123");
        let result = load_from_env("STARMF_TEST_SECRET");
        assert_eq!(result.unwrap().as_str(), "value-123");
        env::remove_var("STARMF_TEST_SECRET");

        assert!(load_from_env("STARMF_TEST_SECRET_MISSING").is_err());
    }
}
