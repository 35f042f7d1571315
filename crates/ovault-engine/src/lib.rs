//! ovault-engine: the vault orchestrator
//!
//!   - `Vault::upload`: validate → Argon2id key → encrypt → put blob → insert record
//!   - `Vault::download`: read record → get blob → re-derive key → decrypt
//!   - `Vault::delete`: read record → delete blob (tolerated) → delete record
//!   - `Vault::storage_usage`: fold over the owner's records
//!
//! Callers never reach the blob or metadata store directly.

pub mod paths;
pub mod policy;
pub mod vault;

pub use policy::{UploadPolicy, UploadWarning};
pub use vault::{Vault, DEFAULT_PREFIX};
