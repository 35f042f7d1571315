use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{VaultError, VaultResult};

const MIB: u64 = 1024 * 1024;

/// Top-level configuration (loaded from ovault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
    pub crypto: CryptoConfig,
    pub limits: LimitsConfig,
}

impl VaultConfig {
    /// Parse a config file. A missing file yields defaults.
    pub fn load(path: &Path) -> VaultResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| VaultError::Config(format!("parsing {}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Any S3-compatible endpoint
    S3,
    /// Local directory
    Fs,
    /// Process memory (tests and dry runs)
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Prefix of every blob path
    pub prefix: String,
    /// Enforce HTTPS for S3 connections (error on HTTP endpoints)
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// JSON file holding file records
    pub path: PathBuf,
}

/// Argon2id cost parameters for newly uploaded files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub argon2_time_cost: u32,
    /// Parallelism (default: 4)
    pub argon2_parallelism: u32,
}

/// Upload validation thresholds, in bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_file_size: u64,
    /// Files above this size upload with a warning
    pub large_file_warning: u64,
    /// `video/*` files above this size upload with a warning
    pub video_warning: u64,
    pub allow_empty: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            bucket: "vault-files".into(),
            root: PathBuf::from("~/.local/share/ovault/blobs"),
            prefix: "vault-files".into(),
            enforce_tls: false,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/ovault/files.json"),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * MIB,
            large_file_warning: 50 * MIB,
            video_warning: 10 * MIB,
            allow_empty: false,
        }
    }
}

/// Expand a leading `~/` to `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}
