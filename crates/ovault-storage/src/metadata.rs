//! Metadata Store Client: owner-scoped file records
//!
//! Every operation is scoped by owner. An id that exists but belongs to a
//! different owner is reported exactly like a missing id, so the store is
//! the authorization boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use ovault_core::{FileRecord, NewFileRecord, VaultError, VaultResult};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a row; the store assigns its id.
    async fn insert(&self, record: NewFileRecord) -> VaultResult<FileRecord>;

    /// Fetch one row. `NotFound` if absent or owned by someone else.
    async fn get(&self, owner_id: &str, id: &str) -> VaultResult<FileRecord>;

    /// All rows of `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> VaultResult<Vec<FileRecord>>;

    /// Remove one row. `NotFound` if absent or owned by someone else.
    async fn delete(&self, owner_id: &str, id: &str) -> VaultResult<()>;

    async fn health_check(&self) -> VaultResult<()> {
        Ok(())
    }
}

pub(crate) fn record_not_found(id: &str) -> VaultError {
    VaultError::NotFound(format!("file record {id}"))
}

/// Rows in insertion order; shared by the memory and JSON stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RecordTable {
    pub(crate) records: Vec<FileRecord>,
}

impl RecordTable {
    pub(crate) fn insert(&mut self, record: NewFileRecord) -> FileRecord {
        let row = record.with_id(uuid::Uuid::new_v4().to_string());
        self.records.push(row.clone());
        row
    }

    pub(crate) fn get(&self, owner_id: &str, id: &str) -> VaultResult<FileRecord> {
        self.records
            .iter()
            .find(|r| r.id == id && r.owner_id == owner_id)
            .cloned()
            .ok_or_else(|| record_not_found(id))
    }

    pub(crate) fn list_by_owner(&self, owner_id: &str) -> Vec<FileRecord> {
        // Reverse first so equal timestamps keep newest-inserted first
        let mut rows: Vec<FileRecord> = self
            .records
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    /// Remove and return the row so callers can roll back.
    pub(crate) fn remove(&mut self, owner_id: &str, id: &str) -> VaultResult<(usize, FileRecord)> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == id && r.owner_id == owner_id)
            .ok_or_else(|| record_not_found(id))?;
        Ok((idx, self.records.remove(idx)))
    }

    pub(crate) fn restore(&mut self, idx: usize, row: FileRecord) {
        let idx = idx.min(self.records.len());
        self.records.insert(idx, row);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

/// In-process metadata store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    table: RwLock<RecordTable>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows across all owners.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> VaultResult<FileRecord> {
        Ok(self.table.write().await.insert(record))
    }

    async fn get(&self, owner_id: &str, id: &str) -> VaultResult<FileRecord> {
        self.table.read().await.get(owner_id, id)
    }

    async fn list_by_owner(&self, owner_id: &str) -> VaultResult<Vec<FileRecord>> {
        Ok(self.table.read().await.list_by_owner(owner_id))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> VaultResult<()> {
        self.table.write().await.remove(owner_id, id).map(|_| ())
    }
}
