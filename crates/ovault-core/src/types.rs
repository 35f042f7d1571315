use serde::{Deserialize, Serialize};

/// Content type recorded when the caller does not declare one.
pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// A metadata-store row describing one encrypted file.
///
/// Field names are stable for interop with other metadata backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Store-assigned identifier, unique per store
    pub id: String,
    pub owner_id: String,
    /// Original (unsanitized) file name
    pub file_name: String,
    /// Declared MIME type
    pub file_type: String,
    /// Plaintext size in bytes
    pub file_size: u64,
    /// Path of the ciphertext in the blob store
    pub blob_path: String,
    /// Unix timestamp in milliseconds
    pub created_at: u64,
    /// Parameters needed to re-derive the file key from the owner's secret
    pub kdf: KdfDescriptor,
}

/// A row as submitted for insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFileRecord {
    pub owner_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub blob_path: String,
    pub created_at: u64,
    pub kdf: KdfDescriptor,
}

impl NewFileRecord {
    pub fn with_id(self, id: String) -> FileRecord {
        FileRecord {
            id,
            owner_id: self.owner_id,
            file_name: self.file_name,
            file_type: self.file_type,
            file_size: self.file_size,
            blob_path: self.blob_path,
            created_at: self.created_at,
            kdf: self.kdf,
        }
    }
}

/// Argon2id salt and cost parameters stored alongside each record.
///
/// Not secret. Keeping the costs per record means raising the configured
/// costs never locks out older files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfDescriptor {
    /// Base64 (standard alphabet) encoded salt
    pub salt: String,
    pub mem_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

/// Per-owner storage accounting, always recomputed from records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub total_bytes: u64,
    pub file_count: u64,
}

impl StorageUsage {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        records
            .into_iter()
            .fold(StorageUsage::default(), |acc, r| StorageUsage {
                total_bytes: acc.total_bytes.saturating_add(r.file_size),
                file_count: acc.file_count + 1,
            })
    }
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Render a byte count in 1024-based units, e.g. `1.5 KB`, `100 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
