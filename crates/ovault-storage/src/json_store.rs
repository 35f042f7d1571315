//! JSON-file metadata store.
//!
//! The file is the source of truth and may be shared by several processes.
//! Every operation re-reads it; every mutation runs under an exclusive
//! advisory lock on a sibling `.lock` file and rewrites the table atomically
//! (temp file + rename). A mutation whose flush fails is rolled back in
//! memory and reported as `StorageWrite`.

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};

use ovault_core::{FileRecord, NewFileRecord, VaultError, VaultResult};

use crate::metadata::{MetadataStore, RecordTable};

pub struct JsonMetadataStore {
    path: PathBuf,
    table: Mutex<RecordTable>,
}

/// Held for the duration of a mutation; closing the file releases the lock.
struct FileLock {
    _file: std::fs::File,
}

async fn read_table(path: &Path) -> VaultResult<RecordTable> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content).map_err(|e| {
            VaultError::StorageRead(format!("parsing metadata file {}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RecordTable::default()),
        Err(e) => Err(VaultError::StorageRead(format!(
            "reading metadata file {}: {e}",
            path.display()
        ))),
    }
}

impl JsonMetadataStore {
    /// Load or create a store at the given path.
    /// If the file doesn't exist, starts empty.
    pub async fn open(path: &Path) -> VaultResult<Self> {
        let table = read_table(path).await?;

        tracing::debug!(path = %path.display(), rows = table.len(), "metadata store opened");

        Ok(Self {
            path: path.to_path_buf(),
            table: Mutex::new(table),
        })
    }

    fn write_err(&self, what: &str, e: std::io::Error) -> VaultError {
        VaultError::StorageWrite(format!("{what} {}: {e}", self.path.display()))
    }

    async fn ensure_parent(&self) -> VaultResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.write_err("creating metadata dir for", e))?;
            }
        }
        Ok(())
    }

    /// Take the cross-process lock, blocking off the executor until it is free.
    async fn lock_file(&self) -> VaultResult<FileLock> {
        self.ensure_parent().await?;
        let lock_path = self.path.with_extension("lock");
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| VaultError::StorageWrite(format!("metadata lock worker failed: {e}")))?
        .map_err(|e| self.write_err("locking metadata file", e))?;
        Ok(FileLock { _file: file })
    }

    /// In-memory table replaced by what is on disk now.
    async fn refreshed(&self) -> VaultResult<MutexGuard<'_, RecordTable>> {
        let mut table = self.table.lock().await;
        *table = read_table(&self.path).await?;
        Ok(table)
    }

    async fn flush(&self, table: &RecordTable) -> VaultResult<()> {
        self.ensure_parent().await?;

        let json = serde_json::to_string_pretty(table)
            .map_err(|e| VaultError::StorageWrite(format!("serializing metadata: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| self.write_err("writing metadata temp for", e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.write_err("renaming metadata file", e))?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> VaultResult<FileRecord> {
        let _lock = self.lock_file().await?;
        let mut table = self.refreshed().await?;
        let row = table.insert(record);
        if let Err(e) = self.flush(&table).await {
            table.records.pop();
            return Err(e);
        }
        Ok(row)
    }

    async fn get(&self, owner_id: &str, id: &str) -> VaultResult<FileRecord> {
        self.refreshed().await?.get(owner_id, id)
    }

    async fn list_by_owner(&self, owner_id: &str) -> VaultResult<Vec<FileRecord>> {
        Ok(self.refreshed().await?.list_by_owner(owner_id))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> VaultResult<()> {
        let _lock = self.lock_file().await?;
        let mut table = self.refreshed().await?;
        let (idx, row) = table.remove(owner_id, id)?;
        if let Err(e) = self.flush(&table).await {
            table.restore(idx, row);
            return Err(e);
        }
        Ok(())
    }

    /// The file parses and the lock can be taken. Never rewrites the table.
    async fn health_check(&self) -> VaultResult<()> {
        let _lock = self.lock_file().await?;
        self.refreshed().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::new_record;
    use ovault_core::ErrorKind;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonMetadataStore::open(&tmp.path().join("files.json"))
            .await
            .unwrap();
        assert!(store.list_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/files.json");

        let store = JsonMetadataStore::open(&path).await.unwrap();
        let kept = store.insert(new_record("u1", "keep", 2)).await.unwrap();
        let gone = store.insert(new_record("u1", "gone", 1)).await.unwrap();
        store.delete("u1", &gone.id).await.unwrap();
        drop(store);

        let reopened = JsonMetadataStore::open(&path).await.unwrap();
        let rows = reopened.list_by_owner("u1").await.unwrap();
        assert_eq!(rows, vec![kept]);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonMetadataStore::open(&path).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::StorageRead);
    }

    #[tokio::test]
    async fn test_flush_failure_rolls_back_insert() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.json");
        let store = JsonMetadataStore::open(&path).await.unwrap();
        // A directory where the temp file goes makes every flush fail
        std::fs::create_dir(path.with_extension("tmp")).unwrap();

        let err = store.insert(new_record("u1", "a", 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageWrite);
        assert!(store.list_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flush_failure_rolls_back_delete() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.json");
        let store = JsonMetadataStore::open(&path).await.unwrap();
        let row = store.insert(new_record("u1", "a", 1)).await.unwrap();

        std::fs::create_dir(path.with_extension("tmp")).unwrap();
        let err = store.delete("u1", &row.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageWrite);
        assert_eq!(store.get("u1", &row.id).await.unwrap(), row);
    }

    #[tokio::test]
    async fn test_two_handles_keep_both_inserts() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.json");
        let a = JsonMetadataStore::open(&path).await.unwrap();
        let b = JsonMetadataStore::open(&path).await.unwrap();

        let from_a = a.insert(new_record("u1", "from_a", 1)).await.unwrap();
        let from_b = b.insert(new_record("u1", "from_b", 2)).await.unwrap();

        let reopened = JsonMetadataStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.list_by_owner("u1").await.unwrap(),
            vec![from_b, from_a.clone()]
        );
        // Each handle sees the other's write
        assert_eq!(b.get("u1", &from_a.id).await.unwrap(), from_a);
    }

    #[tokio::test]
    async fn test_stale_handle_does_not_resurrect_deleted_row() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.json");
        let a = JsonMetadataStore::open(&path).await.unwrap();
        let row = a.insert(new_record("u1", "a", 1)).await.unwrap();

        let b = JsonMetadataStore::open(&path).await.unwrap();
        b.delete("u1", &row.id).await.unwrap();

        // a still has the row cached; its next write must not bring it back
        a.insert(new_record("u1", "b", 2)).await.unwrap();
        a.health_check().await.unwrap();

        let reopened = JsonMetadataStore::open(&path).await.unwrap();
        let names: Vec<_> = reopened
            .list_by_owner("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, vec!["b"]);
        assert_eq!(
            a.get("u1", &row.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_concurrent_handles_lose_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.json");
        let a = Arc::new(JsonMetadataStore::open(&path).await.unwrap());
        let b = Arc::new(JsonMetadataStore::open(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..10u64 {
            let store = if i % 2 == 0 { a.clone() } else { b.clone() };
            handles.push(tokio::spawn(async move {
                store.insert(new_record("u1", &format!("f{i}"), i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = JsonMetadataStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_by_owner("u1").await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_health_check_does_not_rewrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.json");
        let store = JsonMetadataStore::open(&path).await.unwrap();

        store.health_check().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let tmp = TempDir::new().unwrap();
        let store = JsonMetadataStore::open(&tmp.path().join("files.json"))
            .await
            .unwrap();
        let row = store.insert(new_record("u1", "a", 1)).await.unwrap();

        assert_eq!(
            store.get("u2", &row.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.delete("u2", &row.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(store.get("u1", &row.id).await.unwrap(), row);
    }
}
