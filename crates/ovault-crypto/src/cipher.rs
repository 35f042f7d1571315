//! XChaCha20-Poly1305 payload encryption/decryption
//!
//! Encrypted payload format (binary):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use ovault_core::{VaultError, VaultResult};

use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

fn cipher_for(key: &[u8]) -> VaultResult<XChaCha20Poly1305> {
    if key.len() != KEY_SIZE {
        return Err(VaultError::Crypto(format!(
            "key must be {KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }
    XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| VaultError::Crypto(format!("cipher init failed: {e}")))
}

/// Encrypt `plaintext` under a 256-bit key with a fresh random nonce.
///
/// Returns: `[24-byte nonce][ciphertext][16-byte tag]`
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Crypto(format!("encryption failed: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt a payload produced by [`encrypt`].
///
/// Any verification failure, including a payload too short to hold a nonce
/// and tag, is reported as [`VaultError::Authentication`]; no plaintext is
/// returned in that case.
pub fn decrypt(payload: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    let cipher = cipher_for(key)?;

    if payload.len() < NONCE_SIZE + TAG_SIZE {
        tracing::debug!(
            len = payload.len(),
            min = NONCE_SIZE + TAG_SIZE,
            "payload truncated"
        );
        return Err(VaultError::Authentication);
    }

    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::Authentication)
}
