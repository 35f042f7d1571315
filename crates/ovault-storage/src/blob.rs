//! Blob Store Client: opaque ciphertext objects addressed by path

use async_trait::async_trait;
use opendal::Operator;

use ovault_core::{VaultError, VaultResult};

/// Reference to a successfully written blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRef {
    pub path: String,
    pub size: u64,
}

/// Put/get/delete of opaque byte payloads against an object store.
///
/// Transport timeouts and retries are the implementation's concern and
/// surface as `StorageWrite` / `StorageRead`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` at `path`, replacing any existing object.
    async fn put(&self, path: &str, data: Vec<u8>) -> VaultResult<StoredRef>;

    /// Read the object at `path`. `NotFound` if absent.
    async fn get(&self, path: &str) -> VaultResult<Vec<u8>>;

    /// Remove the object at `path`. `NotFound` if absent.
    async fn delete(&self, path: &str) -> VaultResult<()>;

    async fn exists(&self, path: &str) -> VaultResult<bool>;

    async fn health_check(&self) -> VaultResult<()>;

    /// Short backend identifier for status output, e.g. `s3` or `fs`.
    fn backend_name(&self) -> &'static str;
}

/// [`BlobStore`] over any OpenDAL operator (S3, fs, memory).
#[derive(Clone)]
pub struct OpendalBlobStore {
    op: Operator,
}

impl OpendalBlobStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }
}

fn read_error(path: &str, e: opendal::Error) -> VaultError {
    if e.kind() == opendal::ErrorKind::NotFound {
        VaultError::NotFound(format!("blob {path}"))
    } else {
        VaultError::StorageRead(format!("reading blob {path}: {e}"))
    }
}

#[async_trait]
impl BlobStore for OpendalBlobStore {
    async fn put(&self, path: &str, data: Vec<u8>) -> VaultResult<StoredRef> {
        let size = data.len() as u64;
        self.op
            .write(path, data)
            .await
            .map_err(|e| VaultError::StorageWrite(format!("writing blob {path}: {e}")))?;
        tracing::debug!(blob_path = %path, bytes = size, "blob written");
        Ok(StoredRef {
            path: path.to_string(),
            size,
        })
    }

    async fn get(&self, path: &str) -> VaultResult<Vec<u8>> {
        let buf = self.op.read(path).await.map_err(|e| read_error(path, e))?;
        Ok(buf.to_vec())
    }

    async fn delete(&self, path: &str) -> VaultResult<()> {
        // OpenDAL deletes are idempotent; the contract reports absent blobs
        if !self.exists(path).await? {
            return Err(VaultError::NotFound(format!("blob {path}")));
        }
        self.op
            .delete(path)
            .await
            .map_err(|e| VaultError::StorageWrite(format!("deleting blob {path}: {e}")))?;
        tracing::debug!(blob_path = %path, "blob deleted");
        Ok(())
    }

    async fn exists(&self, path: &str) -> VaultResult<bool> {
        self.op
            .exists(path)
            .await
            .map_err(|e| read_error(path, e))
    }

    async fn health_check(&self) -> VaultResult<()> {
        crate::health::check_health(&self.op).await
    }

    fn backend_name(&self) -> &'static str {
        self.op.info().scheme().into()
    }
}
