//! Key derivation: Argon2id(secret, per-file salt) → 256-bit file key

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use ovault_core::config::CryptoConfig;
use ovault_core::{KdfDescriptor, VaultError, VaultResult};

use crate::{KEY_SIZE, SALT_SIZE};

/// A 256-bit file key derived from a secret via Argon2id.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct VaultKey {
    bytes: [u8; KEY_SIZE],
}

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for VaultKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheapest useful costs. Only for tests and benchmarks.
    pub fn minimal() -> Self {
        Self {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

impl From<&CryptoConfig> for KdfParams {
    fn from(cfg: &CryptoConfig) -> Self {
        Self {
            mem_cost_kib: cfg.argon2_mem_cost_kib,
            time_cost: cfg.argon2_time_cost,
            parallelism: cfg.argon2_parallelism,
        }
    }
}

/// Generate a random Argon2id salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive a 256-bit key from a secret and salt using Argon2id.
pub fn derive_key(
    secret: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> VaultResult<VaultKey> {
    if secret.expose_secret().is_empty() {
        return Err(VaultError::Crypto("secret must not be empty".into()));
    }

    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| VaultError::Crypto(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(secret.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| VaultError::Crypto(format!("Argon2id KDF failed: {e}")))?;

    Ok(VaultKey::from_bytes(key))
}

/// Stateless key material provider.
///
/// Holds the cost parameters applied to new files; existing files are always
/// re-derived with the parameters recorded in their [`KdfDescriptor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyProvider {
    params: KdfParams,
}

impl KeyProvider {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Fresh descriptor (new random salt, current costs) for a new file.
    pub fn new_descriptor(&self) -> KdfDescriptor {
        KdfDescriptor {
            salt: STANDARD.encode(generate_salt()),
            mem_cost_kib: self.params.mem_cost_kib,
            time_cost: self.params.time_cost,
            parallelism: self.params.parallelism,
        }
    }

    /// Derive the file key described by `descriptor` from `secret`.
    pub fn derive_key(
        &self,
        secret: &SecretString,
        descriptor: &KdfDescriptor,
    ) -> VaultResult<VaultKey> {
        let salt = decode_salt(&descriptor.salt)?;
        let params = KdfParams {
            mem_cost_kib: descriptor.mem_cost_kib,
            time_cost: descriptor.time_cost,
            parallelism: descriptor.parallelism,
        };
        derive_key(secret, &salt, &params)
    }
}

fn decode_salt(encoded: &str) -> VaultResult<[u8; SALT_SIZE]> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| VaultError::Crypto(format!("salt is not valid base64: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        VaultError::Crypto(format!("salt must be {SALT_SIZE} bytes, got {}", b.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovault_core::ErrorKind;

    #[test]
    fn test_not_a_padded_passphrase() {
        // A 32-char passphrase must not become the key verbatim
        let raw = "0123456789abcdef0123456789abcdef";
        let key = derive_key(
            &SecretString::from(raw),
            &[0u8; SALT_SIZE],
            &KdfParams::minimal(),
        )
        .unwrap();
        assert_ne!(key.as_bytes(), raw.as_bytes());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let err = derive_key(
            &SecretString::from(""),
            &[0u8; SALT_SIZE],
            &KdfParams::minimal(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = KdfParams {
            mem_cost_kib: 1,
            time_cost: 0,
            parallelism: 1,
        };
        let err = derive_key(&SecretString::from("pw"), &[0u8; SALT_SIZE], &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }

    #[test]
    fn test_provider_descriptor_roundtrip() {
        let provider = KeyProvider::new(KdfParams::minimal());
        let secret = SecretString::from("pw1");

        let descriptor = provider.new_descriptor();
        assert_eq!(descriptor.mem_cost_kib, 1024);

        let a = provider.derive_key(&secret, &descriptor).unwrap();
        let b = provider.derive_key(&secret, &descriptor).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let other = provider
            .derive_key(&SecretString::from("pw2"), &descriptor)
            .unwrap();
        assert_ne!(a.as_bytes(), other.as_bytes());
    }

    #[test]
    fn test_provider_fresh_salt_per_descriptor() {
        let provider = KeyProvider::new(KdfParams::minimal());
        let d1 = provider.new_descriptor();
        let d2 = provider.new_descriptor();
        assert_ne!(d1.salt, d2.salt);
    }

    #[test]
    fn test_provider_uses_recorded_params() {
        // A descriptor written under other costs still derives the same key
        let old = KeyProvider::new(KdfParams::minimal());
        let new = KeyProvider::new(KdfParams {
            mem_cost_kib: 2048,
            time_cost: 2,
            parallelism: 1,
        });
        let secret = SecretString::from("pw");
        let descriptor = old.new_descriptor();

        let a = old.derive_key(&secret, &descriptor).unwrap();
        let b = new.derive_key(&secret, &descriptor).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_bad_salt_rejected() {
        let provider = KeyProvider::new(KdfParams::minimal());
        let mut descriptor = provider.new_descriptor();
        descriptor.salt = "AAAA".into();
        let err = provider
            .derive_key(&SecretString::from("pw"), &descriptor)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Crypto);

        descriptor.salt = "not base64!".into();
        assert!(provider
            .derive_key(&SecretString::from("pw"), &descriptor)
            .is_err());
    }

    #[test]
    fn test_key_debug_redacted() {
        let key = VaultKey::from_bytes([0xAB; KEY_SIZE]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("171"));
    }
}
