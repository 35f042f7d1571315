//! Shared fixtures: in-memory stores and fault-injecting wrappers.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ovault_core::{FileRecord, NewFileRecord, VaultError, VaultResult};
use ovault_crypto::KdfParams;
use ovault_engine::Vault;
use ovault_storage::{
    BlobStore, MemoryMetadataStore, MetadataStore, OpendalBlobStore, StoredRef,
};

pub fn memory_operator() -> opendal::Operator {
    opendal::Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish()
}

/// Blob store over OpenDAL memory with switchable failures and call counters.
pub struct FaultyBlobStore {
    inner: OpendalBlobStore,
    pub fail_puts: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub delete_calls: AtomicUsize,
    put_paths: Mutex<Vec<String>>,
}

impl FaultyBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: OpendalBlobStore::new(memory_operator()),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            delete_calls: AtomicUsize::new(0),
            put_paths: Mutex::new(Vec::new()),
        })
    }

    /// Remove a blob behind the orchestrator's back.
    pub async fn remove_out_of_band(&self, path: &str) {
        self.inner.delete(path).await.expect("out-of-band delete");
    }

    /// Overwrite a blob behind the orchestrator's back.
    pub async fn overwrite_out_of_band(&self, path: &str, data: Vec<u8>) {
        self.inner.put(path, data).await.expect("out-of-band put");
    }

    pub async fn raw(&self, path: &str) -> VaultResult<Vec<u8>> {
        self.inner.get(path).await
    }

    /// Every path passed to `put`, successful or not.
    pub fn put_paths(&self) -> Vec<String> {
        self.put_paths.lock().expect("put_paths lock").clone()
    }
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    async fn put(&self, path: &str, data: Vec<u8>) -> VaultResult<StoredRef> {
        self.put_paths
            .lock()
            .expect("put_paths lock")
            .push(path.to_string());
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(VaultError::StorageWrite("injected put failure".into()));
        }
        self.inner.put(path, data).await
    }

    async fn get(&self, path: &str) -> VaultResult<Vec<u8>> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> VaultResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(VaultError::StorageWrite("injected delete failure".into()));
        }
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &str) -> VaultResult<bool> {
        self.inner.exists(path).await
    }

    async fn health_check(&self) -> VaultResult<()> {
        self.inner.health_check().await
    }

    fn backend_name(&self) -> &'static str {
        "faulty-memory"
    }
}

/// Metadata store over the in-memory store with switchable insert failures.
pub struct FaultyMetadataStore {
    inner: MemoryMetadataStore,
    pub fail_inserts: AtomicBool,
}

impl FaultyMetadataStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryMetadataStore::new(),
            fail_inserts: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl MetadataStore for FaultyMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> VaultResult<FileRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(VaultError::StorageWrite("injected insert failure".into()));
        }
        self.inner.insert(record).await
    }

    async fn get(&self, owner_id: &str, id: &str) -> VaultResult<FileRecord> {
        self.inner.get(owner_id, id).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> VaultResult<Vec<FileRecord>> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn delete(&self, owner_id: &str, id: &str) -> VaultResult<()> {
        self.inner.delete(owner_id, id).await
    }
}

pub struct Harness {
    pub vault: Vault,
    pub blobs: Arc<FaultyBlobStore>,
    pub metadata: Arc<FaultyMetadataStore>,
}

/// A vault over fault-injectable memory stores with cheap KDF costs.
pub fn harness() -> Harness {
    let blobs = FaultyBlobStore::new();
    let metadata = FaultyMetadataStore::new();
    let vault = Vault::new(blobs.clone(), metadata.clone()).with_kdf_params(KdfParams::minimal());
    Harness {
        vault,
        blobs,
        metadata,
    }
}

/// Deterministic pseudo-random bytes.
pub fn test_bytes(size: usize) -> Vec<u8> {
    (0u64..size as u64)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}
