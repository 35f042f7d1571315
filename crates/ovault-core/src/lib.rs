//! ovault-core: shared types, config schema, and the vault error taxonomy

pub mod config;
pub mod error;
pub mod types;

pub use error::{ErrorKind, VaultError, VaultResult};
pub use types::{
    format_file_size, FileRecord, KdfDescriptor, NewFileRecord, StorageUsage, DEFAULT_FILE_TYPE,
};
