//! ovault-storage: blob store (OpenDAL) and metadata store clients

pub mod blob;
pub mod health;
pub mod json_store;
pub mod metadata;
pub mod operator;

pub use blob::{BlobStore, OpendalBlobStore, StoredRef};
pub use health::check_health;
pub use json_store::JsonMetadataStore;
pub use metadata::{MemoryMetadataStore, MetadataStore};
pub use operator::{build_from_core_config, S3Credentials};
