//! Vault orchestrator: the only component that writes to both stores.
//!
//! Write ordering keeps metadata a subset of reachable blobs:
//!   - upload: encrypt → put blob → insert record (blob removed if insert fails)
//!   - delete: read record → delete blob (failure tolerated) → delete record
//!
//! Nothing here is retried; transport retries belong to the store clients.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info, warn};

use ovault_core::config::VaultConfig;
use ovault_core::types::now_millis;
use ovault_core::{
    FileRecord, NewFileRecord, StorageUsage, VaultError, VaultResult, DEFAULT_FILE_TYPE,
};
use ovault_crypto::{KdfParams, KeyProvider};
use ovault_storage::{BlobStore, MetadataStore};

use crate::paths::fresh_blob_path;
use crate::policy::{UploadPolicy, UploadWarning};

/// Default prefix of every blob path
pub const DEFAULT_PREFIX: &str = "vault-files";

#[derive(Clone)]
pub struct Vault {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    keys: KeyProvider,
    policy: UploadPolicy,
    prefix: String,
}

impl Vault {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            blobs,
            metadata,
            keys: KeyProvider::default(),
            policy: UploadPolicy::default(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Build a vault whose KDF costs, limits, and prefix come from config.
    pub fn from_config(
        config: &VaultConfig,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self::new(blobs, metadata)
            .with_kdf_params(KdfParams::from(&config.crypto))
            .with_policy(UploadPolicy::new(config.limits.clone()))
            .with_prefix(&config.storage.prefix)
    }

    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.keys = KeyProvider::new(params);
        self
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_matches('/').to_string();
        self
    }

    /// Validate an upload without performing it.
    pub fn check_upload(
        &self,
        file_name: &str,
        content_type: &str,
        size: u64,
    ) -> VaultResult<Vec<UploadWarning>> {
        self.policy.check(file_name, content_type, size)
    }

    /// Encrypt `data` under a key derived from `secret` and store it for `owner_id`.
    ///
    /// Returns the inserted record; `file_size` is the plaintext size.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
        owner_id: &str,
        secret: &SecretString,
    ) -> VaultResult<FileRecord> {
        let file_size = data.len() as u64;
        for warning in self.check_upload(file_name, content_type, file_size)? {
            warn!(owner = %owner_id, file = %file_name, "{warning}");
        }

        let kdf = self.keys.new_descriptor();
        let payload = {
            let keys = self.keys;
            let descriptor = kdf.clone();
            let secret = clone_secret(secret);
            run_blocking(move || {
                let key = keys.derive_key(&secret, &descriptor)?;
                ovault_crypto::encrypt(&data, key.as_bytes())
            })
            .await?
        };

        let created_at = now_millis();
        let blob_path = fresh_blob_path(&self.prefix, owner_id, file_name, created_at);

        // No record exists yet, so a failed put leaves nothing behind
        self.blobs.put(&blob_path, payload).await?;

        let new_record = NewFileRecord {
            owner_id: owner_id.to_string(),
            file_name: file_name.to_string(),
            file_type: if content_type.is_empty() {
                DEFAULT_FILE_TYPE.to_string()
            } else {
                content_type.to_string()
            },
            file_size,
            blob_path: blob_path.clone(),
            created_at,
            kdf,
        };

        let record = match self.metadata.insert(new_record).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    owner = %owner_id,
                    blob_path = %blob_path,
                    error = %e,
                    "metadata insert failed after blob write; removing blob"
                );
                if let Err(cleanup) = self.blobs.delete(&blob_path).await {
                    warn!(
                        blob_path = %blob_path,
                        error = %cleanup,
                        "blob cleanup failed; orphaned blob left for sweep"
                    );
                }
                return Err(e);
            }
        };

        info!(
            owner = %owner_id,
            record_id = %record.id,
            blob_path = %record.blob_path,
            bytes = file_size,
            "uploaded"
        );
        Ok(record)
    }

    /// Fetch and decrypt one of `owner_id`'s files.
    pub async fn download(
        &self,
        record_id: &str,
        owner_id: &str,
        secret: &SecretString,
    ) -> VaultResult<(Vec<u8>, FileRecord)> {
        let record = self.metadata.get(owner_id, record_id).await?;

        let payload = match self.blobs.get(&record.blob_path).await {
            Ok(payload) => payload,
            Err(e) => {
                if e.is_not_found() {
                    warn!(
                        owner = %owner_id,
                        record_id = %record_id,
                        blob_path = %record.blob_path,
                        "record points at a missing blob"
                    );
                }
                return Err(e);
            }
        };

        let plaintext = {
            let keys = self.keys;
            let descriptor = record.kdf.clone();
            let secret = clone_secret(secret);
            run_blocking(move || {
                let key = keys.derive_key(&secret, &descriptor)?;
                ovault_crypto::decrypt(&payload, key.as_bytes())
            })
            .await?
        };

        info!(
            owner = %owner_id,
            record_id = %record_id,
            bytes = plaintext.len(),
            "downloaded"
        );
        Ok((plaintext, record))
    }

    /// Remove one of `owner_id`'s files.
    ///
    /// A blob-store failure is logged and does not stop the record from
    /// being removed.
    pub async fn delete(&self, record_id: &str, owner_id: &str) -> VaultResult<()> {
        let record = self.metadata.get(owner_id, record_id).await?;

        match self.blobs.delete(&record.blob_path).await {
            Ok(()) => debug!(blob_path = %record.blob_path, "blob removed"),
            Err(e) if e.is_not_found() => {
                warn!(blob_path = %record.blob_path, "blob already missing")
            }
            Err(e) => warn!(
                blob_path = %record.blob_path,
                error = %e,
                "blob delete failed; orphaned blob left for sweep"
            ),
        }

        self.metadata.delete(owner_id, record_id).await?;

        info!(owner = %owner_id, record_id = %record_id, "deleted");
        Ok(())
    }

    /// `owner_id`'s records, newest first.
    pub async fn list_files(&self, owner_id: &str) -> VaultResult<Vec<FileRecord>> {
        self.metadata.list_by_owner(owner_id).await
    }

    /// Record metadata without touching the blob store.
    pub async fn get_record(&self, record_id: &str, owner_id: &str) -> VaultResult<FileRecord> {
        self.metadata.get(owner_id, record_id).await
    }

    /// Total plaintext bytes and file count, recomputed from records.
    pub async fn storage_usage(&self, owner_id: &str) -> VaultResult<StorageUsage> {
        let records = self.metadata.list_by_owner(owner_id).await?;
        Ok(StorageUsage::from_records(&records))
    }

    /// Identifier of the blob backend, e.g. `s3` or `fs`.
    pub fn blob_backend(&self) -> &'static str {
        self.blobs.backend_name()
    }

    /// Check both backing stores.
    pub async fn health(&self) -> VaultResult<()> {
        self.blobs.health_check().await?;
        self.metadata.health_check().await
    }
}

fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

/// Run Argon2 + AEAD work off the async executor.
async fn run_blocking<T, F>(f: F) -> VaultResult<T>
where
    F: FnOnce() -> VaultResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Crypto(format!("crypto worker failed: {e}")))?
}
