//! ovault-crypto: client-side encryption for the file vault
//!
//! Payload format and key derivation:
//! ```text
//! secret ──Argon2id(salt, m, t, p)──▶ 256-bit file key
//! payload = [24-byte nonce][ciphertext][16-byte Poly1305 tag]   (XChaCha20-Poly1305)
//! ```
//!
//! A fresh salt is drawn for every upload and stored in the file record, so
//! no key material is ever persisted.

pub mod cipher;
pub mod kdf;

pub use cipher::{decrypt, encrypt};
pub use kdf::{generate_salt, KdfParams, KeyProvider, VaultKey};

/// Size of a file key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of an Argon2id salt
pub const SALT_SIZE: usize = 16;
